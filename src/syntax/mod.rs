//! Python-subset syntax: expression/statement AST, block IR and printer.

pub mod printer;
pub mod types;

pub use printer::ir_to_python;
pub use types::{BinOp, Block, Expr, IrNode, Loc, Stmt, UnaryOp};
