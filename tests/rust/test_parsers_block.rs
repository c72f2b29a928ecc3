use super::*;
use pretty_assertions::assert_eq;

fn ir(src: &str) -> Block {
    parse_program(src).unwrap().ir
}

fn first_error(src: &str) -> String {
    parse_program(src).unwrap_err().errors[0].clone()
}

// ── Structure ────────────────────────────────────────────────────────────

#[test]
fn test_flat_statements_keep_line_numbers() {
    let block = ir("a = 1\n\n# comment\nb = a + 1  # trailing\n");
    assert_eq!(
        block,
        vec![IrNode::stmt("a = 1", 1), IrNode::stmt("b = a + 1", 4)]
    );
}

#[test]
fn test_if_else() {
    let block = ir("if x > 0:\n    y = 1\nelse:\n    y = 2\nprint(y)\n");
    assert_eq!(block.len(), 2);
    match &block[0] {
        IrNode::If {
            cond, then, else_, ..
        } => {
            assert_eq!(cond, "x > 0");
            assert_eq!(then, &vec![IrNode::stmt("y = 1", 2)]);
            assert_eq!(else_.as_ref(), Some(&vec![IrNode::stmt("y = 2", 4)]));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_elif_nests_into_else() {
    let src = "if s >= 90:\n  g = 'A'\nelif s >= 60:\n  g = 'B'\nelse:\n  g = 'C'\n";
    let block = ir(src);
    assert_eq!(block.len(), 1);
    let IrNode::If { else_: Some(else_block), .. } = &block[0] else {
        panic!("expected if with else");
    };
    assert_eq!(else_block.len(), 1);
    match &else_block[0] {
        IrNode::If {
            cond, else_, loc, ..
        } => {
            assert_eq!(cond, "s >= 60");
            assert_eq!(loc.line, 3);
            assert_eq!(else_.as_ref().map(Vec::len), Some(1));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_for_range_arguments() {
    let block = ir("for i in range(1, n, 2):\n    print(i)\nfor j in range(5):\n    print(j)\n");
    match &block[0] {
        IrNode::ForRange {
            var,
            start,
            end,
            step,
            ..
        } => {
            assert_eq!(var, "i");
            assert_eq!(start, "1");
            assert_eq!(end, "n");
            assert_eq!(step.as_deref(), Some("2"));
        }
        other => panic!("unexpected {other:?}"),
    }
    match &block[1] {
        IrNode::ForRange { start, end, step, .. } => {
            assert_eq!((start.as_str(), end.as_str(), step), ("0", "5", &None));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_def_with_params() {
    let block = ir("def add(a, b):\n    return a + b\n");
    match &block[0] {
        IrNode::Def {
            name, params, body, ..
        } => {
            assert_eq!(name, "add");
            assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
            assert_eq!(body, &vec![IrNode::stmt("return a + b", 2)]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_pass_is_dropped() {
    let block = ir("while x:\n    pass\n");
    match &block[0] {
        IrNode::While { body, .. } => assert!(body.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_tabs_count_as_four_spaces() {
    let block = ir("if a:\n\tb = 1\n    c = 2\n");
    let IrNode::If { then, .. } = &block[0] else {
        panic!("expected if");
    };
    assert_eq!(then.len(), 2);
}

// ── Warnings ─────────────────────────────────────────────────────────────

#[test]
fn test_unsupported_header_body_skipped_with_warning() {
    let parsed = parse_program("try:\n    x = 1\nexcept:\n    x = 2\ny = 3\n").unwrap();
    assert_eq!(parsed.ir.len(), 3);
    assert_eq!(parsed.ir[2], IrNode::stmt("y = 3", 5));
    assert_eq!(parsed.warnings.len(), 2);
    assert!(parsed.warnings[0].starts_with("第1行"));
}

#[test]
fn test_for_over_iterable_warns() {
    let parsed = parse_program("for c in name:\n    print(c)\n").unwrap();
    assert_eq!(parsed.ir, vec![IrNode::stmt("for c in name:", 1)]);
    assert!(parsed.warnings[0].contains("range"));
}

#[test]
fn test_import_warns_but_is_kept() {
    let parsed = parse_program("import math\n").unwrap();
    assert_eq!(parsed.ir, vec![IrNode::stmt("import math", 1)]);
    assert_eq!(parsed.warnings.len(), 1);
}

// ── Errors ───────────────────────────────────────────────────────────────

#[test]
fn test_unexpected_indent() {
    assert_eq!(first_error("a = 1\n    b = 2\n"), "第2行: 意外的缩进");
}

#[test]
fn test_header_without_body() {
    assert_eq!(first_error("while x > 0:\ny = 1\n"), "第1行: 代码块缺少缩进的语句体");
}

#[test]
fn test_missing_colon() {
    assert_eq!(first_error("if x > 0\n    y = 1\n"), "第1行: 语句头缺少结尾的冒号");
}

#[test]
fn test_orphan_else() {
    assert_eq!(first_error("else:\n    y = 1\n"), "第1行: else 缺少对应的 if");
}

#[test]
fn test_dedent_below_first_line() {
    assert_eq!(first_error("    a = 1\nb = 2\n"), "第2行: 缩进不一致");
}

#[test]
fn test_range_argument_count() {
    assert_eq!(
        first_error("for i in range(1, 2, 3, 4):\n    pass\n"),
        "第1行: range() 需要 1 到 3 个参数"
    );
}

#[test]
fn test_empty_source() {
    assert_eq!(ir(""), Vec::new());
}
