//! IR → Python source printer.
//!
//! Used by the flow → code direction. `elif` is never emitted: an `else`
//! branch holding a single `if` is printed as a nested block, which the block
//! parser reads back into the same IR.

use super::types::{Block, IrNode};

pub const INDENT: &str = "    ";

/// Print a block as Python source (trailing newline included when non-empty).
pub fn ir_to_python(block: &Block) -> String {
    let mut out = String::new();
    print_block(block, 0, &mut out);
    out
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn print_body(block: &Block, depth: usize, out: &mut String) {
    if block.is_empty() {
        push_line(out, depth, "pass");
    } else {
        print_block(block, depth, out);
    }
}

fn print_block(block: &Block, depth: usize, out: &mut String) {
    for node in block {
        match node {
            IrNode::Stmt { text, .. } => push_line(out, depth, text.trim()),
            IrNode::If {
                cond, then, else_, ..
            } => {
                push_line(out, depth, &format!("if {}:", cond.trim()));
                print_body(then, depth + 1, out);
                if let Some(else_block) = else_ {
                    push_line(out, depth, "else:");
                    print_body(else_block, depth + 1, out);
                }
            }
            IrNode::While { cond, body, .. } => {
                push_line(out, depth, &format!("while {}:", cond.trim()));
                print_body(body, depth + 1, out);
            }
            IrNode::ForRange {
                var,
                start,
                end,
                step,
                body,
                ..
            } => {
                let range = match (step, start.trim()) {
                    (Some(step), _) => format!("range({}, {}, {})", start.trim(), end.trim(), step.trim()),
                    (None, "0") => format!("range({})", end.trim()),
                    (None, _) => format!("range({}, {})", start.trim(), end.trim()),
                };
                push_line(out, depth, &format!("for {var} in {range}:"));
                print_body(body, depth + 1, out);
            }
            IrNode::Def {
                name, params, body, ..
            } => {
                push_line(out, depth, &format!("def {}({}):", name, params.join(", ")));
                print_body(body, depth + 1, out);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/rust/test_syntax_printer.rs"]
mod tests;
