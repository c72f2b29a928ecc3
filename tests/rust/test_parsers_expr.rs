use super::*;
use pretty_assertions::assert_eq;

fn render(src: &str) -> String {
    parse_expression(src).unwrap().to_string()
}

fn err(src: &str) -> String {
    parse_statement(src).unwrap_err().message
}

// ── Expressions ──────────────────────────────────────────────────────────

#[test]
fn test_precedence_mul_over_add() {
    let e = parse_expression("a + b * c").unwrap();
    match e {
        Expr::Bin { op: BinOp::Add, rhs, .. } => {
            assert!(matches!(*rhs, Expr::Bin { op: BinOp::Mul, .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_or_binds_loosest() {
    let e = parse_expression("a < 1 or b and not c").unwrap();
    assert!(matches!(e, Expr::Bin { op: BinOp::Or, .. }));
    assert_eq!(e.to_string(), "a < 1 or b and not c");
}

#[test]
fn test_parentheses_preserved_when_needed() {
    assert_eq!(render("(a + b) * c"), "(a + b) * c");
    assert_eq!(render("((x))"), "x");
    assert_eq!(render("n // 2 % 3"), "n // 2 % 3");
}

#[test]
fn test_call_with_nested_args() {
    let e = parse_expression("f(g(1), 'a, b', x + 1)").unwrap();
    match e {
        Expr::Call { name, args } => {
            assert_eq!(name, "f");
            assert_eq!(args.len(), 3);
            assert_eq!(args[1], Expr::Str("a, b".to_string()));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_top_level_tuple() {
    assert_eq!(
        parse_expression("b, a").unwrap(),
        Expr::Tuple(vec![Expr::Var("b".to_string()), Expr::Var("a".to_string())])
    );
}

#[test]
fn test_literals() {
    assert_eq!(parse_expression("True").unwrap(), Expr::Bool(true));
    assert_eq!(parse_expression("None").unwrap(), Expr::None);
    assert_eq!(parse_expression("-3").unwrap().const_int(), Some(-3));
}

#[test]
fn test_trailing_tokens_rejected() {
    let e = parse_expression("a b").unwrap_err();
    assert!(e.message.contains("表达式存在多余内容"), "{}", e.message);
    assert_eq!(e.fragment.as_deref(), Some("b"));
}

#[test]
fn test_incomplete_expression() {
    let e = parse_expression("a +").unwrap_err();
    assert!(e.message.contains("表达式不完整"), "{}", e.message);
}

#[test]
fn test_missing_rparen() {
    let e = parse_expression("f(1, 2").unwrap_err();
    assert!(e.message.contains("缺少右括号"), "{}", e.message);
}

#[test]
fn test_keyword_not_an_expression() {
    let e = parse_expression("x + lambda").unwrap_err();
    assert!(e.message.contains("关键字不能用作表达式"), "{}", e.message);
}

#[test]
fn test_empty_expression() {
    assert!(parse_expression("   ").is_err());
    assert!(parse_expression("()").is_err());
}

// ── Statements ───────────────────────────────────────────────────────────

#[test]
fn test_pass_and_empty() {
    assert_eq!(parse_statement("pass").unwrap(), Stmt::Pass);
    assert_eq!(parse_statement("  ").unwrap(), Stmt::Pass);
}

#[test]
fn test_return_forms() {
    assert_eq!(parse_statement("return").unwrap(), Stmt::Return(None));
    match parse_statement("return a + 1").unwrap() {
        Stmt::Return(Some(e)) => assert_eq!(e.to_string(), "a + 1"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_print_statement() {
    match parse_statement("print('sum', a + b)").unwrap() {
        Stmt::Print(args) => assert_eq!(args.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_input_rejected() {
    assert!(err("x = input()").contains("不支持 input()"));
    assert!(err("n = int(input())").contains("不支持 input()"));
}

#[test]
fn test_aug_assign() {
    match parse_statement("total += i * 2").unwrap() {
        Stmt::AugAssign { target, op, value } => {
            assert_eq!(target, "total");
            assert_eq!(op, AugOp::Add);
            assert_eq!(value.to_string(), "i * 2");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err("a, b += 1").contains("增量赋值的目标必须是单个变量"));
}

#[test]
fn test_tuple_unpacking_assign() {
    match parse_statement("a, b = b, a + b").unwrap() {
        Stmt::Assign { targets, value } => {
            assert_eq!(targets, vec!["a", "b"]);
            assert!(matches!(value, Expr::Tuple(ref items) if items.len() == 2));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err("a, b = 1, 2, 3").contains("解包数量不匹配"));
}

#[test]
fn test_assignment_target_must_be_names() {
    assert!(err("1 = x").contains("赋值目标无效"));
    assert!(err("a, = 1").contains("赋值目标无效"));
}

#[test]
fn test_call_with_default_looking_arg_is_not_assignment() {
    match parse_statement("greet(name)").unwrap() {
        Stmt::ExprStmt(Expr::Call { name, .. }) => assert_eq!(name, "greet"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_bare_expression_unsupported() {
    assert!(err("x == 1").contains("不支持的语句"));
    assert!(err("a + b").contains("不支持的语句"));
}

#[test]
fn test_is_keyword() {
    assert!(is_keyword("while"));
    assert!(is_keyword("None"));
    assert!(!is_keyword("print"));
}
