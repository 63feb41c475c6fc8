//! Assembler error kinds (§7). Every one is fatal and aborts the whole
//! assembly, reporting the offending token or line.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{line}:{column}: unrecognized lexeme \"{lexeme}\"")]
pub struct LexError {
    pub lexeme: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{line}:{column}: unexpected token \"{found}\"")]
pub struct ParseError {
    pub found: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{line}:{column}: literal {value:#x} exceeds {width}-bit range")]
pub struct RangeError {
    pub value: u32,
    pub width: u32,
    pub line: u32,
    pub column: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("{line}: duplicate definition of \"{name}\"")]
    Duplicate { name: String, line: u32 },
    #[error("undefined symbol \"{name}\"")]
    Undefined { name: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("instruction at pc {pc:#06x} does not start on an even address")]
pub struct AlignmentError {
    pub pc: u16,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
}
