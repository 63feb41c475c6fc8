//! Assembler for the octo16 instruction set: lexer, recursive-descent
//! parser, and a layout/emit pass that resolves labels against a
//! symbol table (§4.2–§4.4).
//!
//! ```
//! let (bytes, symbols, _map) = asm::assemble("add r1, r2\n").unwrap();
//! assert_eq!(bytes, vec![0x20, 0x12]);
//! assert_eq!(symbols.iter().count(), 0);
//! ```

mod ast;
pub mod emit;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod source_map;
pub mod symbols;

pub use ast::{Instruction, Operand, Statement, StatementKind};
pub use emit::Laid;
pub use error::AssembleError;
pub use source_map::{SourceMap, SourceMapItem};
pub use symbols::SymbolTable;

/// Assembles a complete program, returning the byte stream, the resolved
/// symbol table, and a source map from assembled instruction to source
/// line.
pub fn assemble(source: &str) -> Result<(Vec<u8>, SymbolTable, SourceMap), AssembleError> {
    let tokens = lexer::lex(source).map_err(AssembleError::Lex)?;
    let statements = parser::parse(&tokens).map_err(|e| match e {
        parser::ParseErr::Parse(e) => AssembleError::Parse(e),
        parser::ParseErr::Range(e) => AssembleError::Range(e),
    })?;
    let (laid, symbols, source_map) = emit::layout(statements)?;
    let mut bytes = Vec::new();
    for item in &laid {
        bytes.extend(emit::emit_instruction(&item.instruction, &symbols)?);
    }
    Ok((bytes, symbols, source_map))
}

/// Assembles a program and also returns the per-instruction layout, used
/// by the CLI to render the §6 stdout listing.
pub fn assemble_with_layout(
    source: &str,
) -> Result<(Vec<Laid>, SymbolTable, SourceMap), AssembleError> {
    let tokens = lexer::lex(source).map_err(AssembleError::Lex)?;
    let statements = parser::parse(&tokens).map_err(|e| match e {
        parser::ParseErr::Parse(e) => AssembleError::Parse(e),
        parser::ParseErr::Range(e) => AssembleError::Range(e),
    })?;
    emit::layout(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_a_small_program() {
        let (bytes, symbols, source_map) =
            assemble("loop: add r1, r2\nbra loop\n").unwrap();
        assert_eq!(bytes.len(), 6);
        assert_eq!(symbols.resolve("loop").unwrap(), 0);
        assert_eq!(source_map.len(), 2);
    }

    #[test]
    fn byte_length_matches_sum_of_instruction_sizes() {
        let (bytes, _, _) = assemble("add r1, r2\nldw r3, 0x1234\ndefb 1, 2, 3\n").unwrap();
        assert_eq!(bytes.len(), 2 + 4 + 3);
    }
}
