//! Block parser: turns indented source text into the nested block IR.
//!
//! Statement lines stay opaque (`IrNode::Stmt`); only compound headers are
//! interpreted here. `elif` is rewritten into an `if` nested inside the
//! `else` branch.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::base::{indent_width, split_top_level, strip_comment};
use crate::syntax::types::{Block, IrNode, Loc};

static FOR_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^for\s+(\S+)\s+in\s+range\s*\((.*)\)\s*:$").expect("valid for-range regex")
});
static DEF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^def\s+([^\s(]+)\s*\((.*)\)\s*:$").expect("valid def regex"));

/// Compound statements outside the subset; their bodies are skipped.
const UNSUPPORTED_HEADERS: &[&str] = &[
    "try", "except", "finally", "with", "class", "match", "case", "async",
];

/// Simple statements outside the subset; kept so the validator reports them.
const UNSUPPORTED_SIMPLE: &[&str] = &[
    "import", "from", "break", "continue", "global", "nonlocal", "lambda", "del", "raise",
    "assert", "yield",
];

/// Successful block parse: the IR plus advisory warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockParse {
    pub ir: Block,
    pub warnings: Vec<String>,
}

/// Unrecoverable structural error (bad indentation, header without body …).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", errors.join("; "))]
pub struct BlockParseError {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
struct Line {
    number: usize,
    indent: usize,
    text: String,
}

fn first_word(text: &str) -> &str {
    let end = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    &text[..end]
}

struct BlockParser {
    lines: Vec<Line>,
    idx: usize,
    warnings: Vec<String>,
}

type Step<T> = Result<T, String>;

impl BlockParser {
    fn new(src: &str) -> Self {
        let lines = src
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let code = strip_comment(raw).trim_end();
                if code.trim().is_empty() {
                    return None;
                }
                Some(Line {
                    number: i + 1,
                    indent: indent_width(code),
                    text: code.trim().to_string(),
                })
            })
            .collect();
        Self {
            lines,
            idx: 0,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, line: usize, message: impl AsRef<str>) {
        self.warnings.push(format!("第{}行: {}", line, message.as_ref()));
    }

    fn parse_block(&mut self, indent: usize) -> Step<Block> {
        let mut block = Block::new();
        while let Some(line) = self.lines.get(self.idx).cloned() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(format!("第{}行: 意外的缩进", line.number));
            }
            let node = self.parse_line(&line)?;
            if let Some(node) = node {
                block.push(node);
            }
        }
        Ok(block)
    }

    /// Parse the indented body that follows a header line.
    fn parse_body(&mut self, header: &Line) -> Step<Block> {
        match self.lines.get(self.idx) {
            Some(next) if next.indent > header.indent => {
                let body_indent = next.indent;
                self.parse_block(body_indent)
            }
            _ => Err(format!("第{}行: 代码块缺少缩进的语句体", header.number)),
        }
    }

    /// Skip every line indented deeper than `header`.
    fn skip_body(&mut self, header: &Line) {
        while self
            .lines
            .get(self.idx)
            .is_some_and(|l| l.indent > header.indent)
        {
            self.idx += 1;
        }
    }

    fn parse_line(&mut self, line: &Line) -> Step<Option<IrNode>> {
        self.idx += 1;
        let text = line.text.as_str();
        let keyword = first_word(text);
        let loc = Loc::new(line.number);

        match keyword {
            "if" => return self.parse_if(line, "if").map(Some),
            "elif" | "else" => {
                return Err(format!("第{}行: {} 缺少对应的 if", line.number, keyword));
            }
            "while" => {
                let cond = header_condition(line, "while")?;
                let body = self.parse_body(line)?;
                return Ok(Some(IrNode::While { cond, body, loc }));
            }
            "for" => {
                if let Some(caps) = FOR_RANGE_RE.captures(text) {
                    let var = caps[1].to_string();
                    let args = split_top_level(&caps[2], ',');
                    let (start, end, step) = match args.as_slice() {
                        [end] => ("0".to_string(), end.clone(), None),
                        [start, end] => (start.clone(), end.clone(), None),
                        [start, end, step] => (start.clone(), end.clone(), Some(step.clone())),
                        _ => {
                            return Err(format!(
                                "第{}行: range() 需要 1 到 3 个参数",
                                line.number
                            ));
                        }
                    };
                    if args.iter().any(String::is_empty) {
                        return Err(format!("第{}行: range() 参数为空", line.number));
                    }
                    let body = self.parse_body(line)?;
                    return Ok(Some(IrNode::ForRange {
                        var,
                        start,
                        end,
                        step,
                        body,
                        loc,
                    }));
                }
                if text.ends_with(':') {
                    self.warn(line.number, "for 循环仅支持 range(...) 形式");
                    self.skip_body(line);
                    return Ok(Some(IrNode::Stmt {
                        text: text.to_string(),
                        loc,
                    }));
                }
                return Err(format!("第{}行: 语句头缺少结尾的冒号", line.number));
            }
            "def" => {
                let Some(caps) = DEF_RE.captures(text) else {
                    if !text.ends_with(':') {
                        return Err(format!("第{}行: 语句头缺少结尾的冒号", line.number));
                    }
                    return Err(format!("第{}行: 函数定义格式错误", line.number));
                };
                let name = caps[1].to_string();
                let params = split_top_level(&caps[2], ',');
                let body = self.parse_body(line)?;
                return Ok(Some(IrNode::Def {
                    name,
                    params,
                    body,
                    loc,
                }));
            }
            _ => {}
        }

        if UNSUPPORTED_HEADERS.contains(&keyword) && text.ends_with(':') {
            self.warn(line.number, format!("不支持的结构 `{keyword}`，已忽略其代码块"));
            self.skip_body(line);
            return Ok(Some(IrNode::Stmt {
                text: text.to_string(),
                loc,
            }));
        }
        if UNSUPPORTED_SIMPLE.contains(&keyword) {
            self.warn(line.number, format!("不支持的语句 `{keyword}`"));
        }
        if text == "pass" {
            return Ok(None);
        }
        Ok(Some(IrNode::Stmt {
            text: text.to_string(),
            loc,
        }))
    }

    /// `if`/`elif` header at `line` (already consumed), plus its else chain.
    fn parse_if(&mut self, line: &Line, keyword: &str) -> Step<IrNode> {
        let cond = header_condition(line, keyword)?;
        let then = self.parse_body(line)?;
        let loc = Loc::new(line.number);

        let next = self
            .lines
            .get(self.idx)
            .filter(|l| l.indent == line.indent)
            .cloned();
        let else_ = match next {
            Some(next) if first_word(&next.text) == "elif" => {
                self.idx += 1;
                Some(vec![self.parse_if(&next, "elif")?])
            }
            Some(next) if first_word(&next.text) == "else" => {
                if next.text.trim_start_matches("else").trim() != ":" {
                    return Err(format!("第{}行: else 语句格式错误", next.number));
                }
                self.idx += 1;
                Some(self.parse_body(&next)?)
            }
            _ => None,
        };
        Ok(IrNode::If {
            cond,
            then,
            else_,
            loc,
        })
    }
}

/// Extract `<cond>` from `<keyword> <cond>:`.
fn header_condition(line: &Line, keyword: &str) -> Step<String> {
    let rest = line.text[keyword.len()..].trim();
    let Some(cond) = rest.strip_suffix(':') else {
        return Err(format!("第{}行: 语句头缺少结尾的冒号", line.number));
    };
    let cond = cond.trim();
    if cond.is_empty() {
        return Err(format!("第{}行: {} 缺少条件", line.number, keyword));
    }
    Ok(cond.to_string())
}

/// Parse full source text into the block IR.
pub fn parse_program(src: &str) -> Result<BlockParse, BlockParseError> {
    let mut parser = BlockParser::new(src);
    let base_indent = parser.lines.first().map(|l| l.indent).unwrap_or(0);
    let result = parser.parse_block(base_indent).and_then(|block| {
        match parser.lines.get(parser.idx) {
            // A dedent below the first line's level.
            Some(line) => Err(format!("第{}行: 缩进不一致", line.number)),
            None => Ok(block),
        }
    });
    match result {
        Ok(ir) => Ok(BlockParse {
            ir,
            warnings: parser.warnings,
        }),
        Err(error) => Err(BlockParseError {
            errors: vec![error],
            warnings: parser.warnings,
        }),
    }
}

#[cfg(test)]
#[path = "../../tests/rust/test_parsers_block.rs"]
mod tests;
