//! Parsers for the Python subset: line tokenizer, expression/statement
//! parser and the indentation-driven block parser.

pub mod base;
pub mod block;
pub mod expr;

pub use base::SyntaxError;
pub use block::{BlockParse, BlockParseError, parse_program};
pub use expr::{is_keyword, parse_expression, parse_statement};
