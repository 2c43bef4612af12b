//! Assembler for Leben-80 source: lexer, statement parser, and the two-pass
//! assembler proper.

pub mod assembler;
pub mod error;
pub mod lexer;
pub mod parser;

pub use assembler::{Image, SymbolTable, assemble};
pub use error::{AsmError, AsmResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{LineBody, Operand, OperandKind, SourceLine, parse_source};
