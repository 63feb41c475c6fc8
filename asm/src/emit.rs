//! The layout and emit passes (§4.4), fused with the parser's statement
//! stream into a single forward walk plus a fix-up lookup at emit time.

use octo16::{encode_word, Mnemonic, Shape};

use crate::ast::{Instruction, Operand, Statement, StatementKind};
use crate::error::{AlignmentError, AssembleError};
use crate::source_map::{SourceMap, SourceMapItem};
use crate::symbols::SymbolTable;

/// One laid-out instruction: its starting address, the instruction itself,
/// and the source line it came from (for the stdout listing).
pub struct Laid {
    pub address: u16,
    pub instruction: Instruction,
    pub line: u32,
}

/// Layout pass: binds labels/equs as they're encountered and advances `pc`
/// by each instruction's size, without resolving any label value (§4.4.1).
pub fn layout(
    statements: Vec<Statement>,
) -> Result<(Vec<Laid>, SymbolTable, SourceMap), AssembleError> {
    let mut pc: u16 = 0;
    let mut symbols = SymbolTable::new();
    let mut laid = Vec::new();
    let mut source_map = SourceMap::new();

    for statement in statements {
        match statement.kind {
            StatementKind::Label(name) => {
                symbols
                    .define(&name, pc, statement.line)
                    .map_err(AssembleError::Symbol)?;
            }
            StatementKind::Equ(name, value) => {
                symbols
                    .define(&name, value, statement.line)
                    .map_err(AssembleError::Symbol)?;
            }
            StatementKind::Instruction(mnemonic, operands) => {
                if pc % 2 != 0 {
                    return Err(AssembleError::Alignment(AlignmentError { pc }));
                }
                let instruction = Instruction::OpCode { mnemonic, operands };
                pc += instruction.size();
                source_map.push(SourceMapItem {
                    start_line: statement.line,
                    line_count: 1,
                });
                laid.push(Laid {
                    address: pc - instruction.size(),
                    instruction,
                    line: statement.line,
                });
            }
            StatementKind::DefB(bytes) => {
                let instruction = Instruction::DefB(bytes);
                pc += instruction.size();
                source_map.push(SourceMapItem {
                    start_line: statement.line,
                    line_count: 1,
                });
                laid.push(Laid {
                    address: pc - instruction.size(),
                    instruction,
                    line: statement.line,
                });
            }
            StatementKind::DefN(value, count) => {
                let instruction = Instruction::DefN { value, count };
                pc += instruction.size();
                source_map.push(SourceMapItem {
                    start_line: statement.line,
                    line_count: 1,
                });
                laid.push(Laid {
                    address: pc - instruction.size(),
                    instruction,
                    line: statement.line,
                });
            }
        }
    }

    Ok((laid, symbols, source_map))
}

/// Emit pass: resolves every `Identifier` operand and produces the final
/// byte stream for one instruction (§4.4.2).
pub fn emit_instruction(
    instruction: &Instruction,
    symbols: &SymbolTable,
) -> Result<Vec<u8>, AssembleError> {
    match instruction {
        Instruction::DefB(bytes) => Ok(bytes.clone()),
        Instruction::DefN { value, count } => Ok(vec![*value; *count as usize]),
        Instruction::OpCode { mnemonic, operands } => emit_opcode(*mnemonic, operands, symbols),
    }
}

fn resolve(operand: &Operand, symbols: &SymbolTable) -> Result<(bool, u8, u16), AssembleError> {
    // Returns (is_register, register_index_if_any, immediate_value_if_any).
    match operand {
        Operand::Register(idx) | Operand::IndirectRegister(idx) => Ok((true, *idx, 0)),
        Operand::Word(value) => Ok((false, 0, *value)),
        Operand::Identifier(name) => {
            let value = symbols.resolve(name).map_err(AssembleError::Symbol)?;
            Ok((false, 0, value))
        }
    }
}

fn emit_opcode(
    mnemonic: Mnemonic,
    operands: &[Operand],
    symbols: &SymbolTable,
) -> Result<Vec<u8>, AssembleError> {
    let group = mnemonic.group();
    let func = mnemonic.func();

    let (immediate, rn, rm, imm_value) = match mnemonic.shape() {
        Shape::None => {
            // RET is encoded as though RM=15 (the link register); NOP
            // leaves both fields zero.
            let rm = if mnemonic == Mnemonic::RET {
                octo16::constants::LINK_REGISTER
            } else {
                0
            };
            (false, 0u8, rm, 0u16)
        }
        Shape::AluBinary | Shape::Move => {
            let (_, rn, _) = resolve(&operands[0], symbols)?;
            let (is_reg, rm, imm) = resolve(&operands[1], symbols)?;
            (!is_reg, rn, if is_reg { rm } else { 0 }, imm)
        }
        Shape::AluUnary => {
            let (_, rn, _) = resolve(&operands[0], symbols)?;
            (false, rn, 0, 0)
        }
        Shape::Load => {
            let (_, rn, _) = resolve(&operands[0], symbols)?;
            let (is_reg, rm, imm) = resolve(&operands[1], symbols)?;
            (!is_reg, rn, if is_reg { rm } else { 0 }, imm)
        }
        Shape::Store => {
            let (is_reg, rn, imm) = resolve(&operands[0], symbols)?;
            let (_, rm, _) = resolve(&operands[1], symbols)?;
            (!is_reg, rn, rm, imm)
        }
        Shape::BranchTarget => {
            let (is_reg, rm, imm) = resolve(&operands[0], symbols)?;
            (!is_reg, 0, rm, imm)
        }
        Shape::CallTarget => {
            let (is_reg, rm, imm) = resolve(&operands[0], symbols)?;
            (!is_reg, octo16::constants::LINK_REGISTER, rm, imm)
        }
    };

    let word = encode_word(group, func, immediate, rn, rm);
    let mut bytes = vec![(word >> 8) as u8, (word & 0xFF) as u8];
    if immediate {
        bytes.push((imm_value >> 8) as u8);
        bytes.push((imm_value & 0xFF) as u8);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn assemble(src: &str) -> Vec<u8> {
        let (laid, symbols, _) = layout(parse(&lex(src).unwrap()).unwrap()).unwrap();
        laid.iter()
            .flat_map(|l| emit_instruction(&l.instruction, &symbols).unwrap())
            .collect()
    }

    #[test]
    fn encodes_add_r1_r2() {
        assert_eq!(assemble("add r1, r2\n"), vec![0x20, 0x12]);
    }

    #[test]
    fn encodes_ldw_immediate() {
        assert_eq!(assemble("ldw r3, 0x1234\n"), vec![0x61, 0x30, 0x12, 0x34]);
    }

    #[test]
    fn resolves_forward_label_reference() {
        let src = "bra end\ndefb 0x00\nend:\n";
        assert_eq!(assemble(src), vec![0x41, 0x00, 0x00, 0x05, 0x00]);
    }

    #[test]
    fn resolves_equ_then_use() {
        let src = "foo equ 0x00AA\nmov r0, foo\n";
        assert_eq!(assemble(src), vec![0x63, 0x00, 0x00, 0xAA]);
    }

    #[test]
    fn step_over_call_scenario_encodes_exactly() {
        let src = "call sub\nmov r0, 1\nsub: ret\n";
        assert_eq!(
            assemble(src),
            vec![0x5D, 0xF0, 0x00, 0x08, 0x63, 0x00, 0x00, 0x01, 0x5E, 0x0F]
        );
    }

    #[test]
    fn rejects_unresolved_identifier() {
        let (laid, symbols, _) = layout(parse(&lex("bra nowhere\n").unwrap()).unwrap()).unwrap();
        assert!(emit_instruction(&laid[0].instruction, &symbols).is_err());
    }
}
