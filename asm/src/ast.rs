//! AST nodes the parser builds and the emitter consumes (§3, §4.3/§4.4).

use octo16::Mnemonic;

/// One operand as the parser produced it — labels are not yet resolved.
#[derive(Clone, PartialEq, Debug)]
pub enum Operand {
    Register(u8),
    IndirectRegister(u8),
    Word(u16),
    Identifier(String),
}

impl Operand {
    /// An operand forces the `I` bit and a trailing immediate word (§3: an
    /// OpCode is 4 bytes if any operand is a `Word` or `Identifier`).
    pub fn is_immediate_form(&self) -> bool {
        matches!(self, Operand::Word(_) | Operand::Identifier(_))
    }
}

/// A statement as parsed, still carrying its source line for diagnostics
/// and the source map.
#[derive(Clone, PartialEq, Debug)]
pub struct Statement {
    pub kind: StatementKind,
    pub line: u32,
}

#[derive(Clone, PartialEq, Debug)]
pub enum StatementKind {
    Label(String),
    Equ(String, u16),
    Instruction(Mnemonic, Vec<Operand>),
    DefB(Vec<u8>),
    DefN(u8, u16),
}

/// A statement with its label/equ bindings already consumed: either an
/// opcode or a data directive, the two things that actually occupy space.
#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
    OpCode {
        mnemonic: Mnemonic,
        operands: Vec<Operand>,
    },
    DefB(Vec<u8>),
    DefN {
        value: u8,
        count: u16,
    },
}

impl Instruction {
    /// Size in bytes without resolving any label (§3).
    pub fn size(&self) -> u16 {
        match self {
            Instruction::OpCode { operands, .. } => {
                if operands.iter().any(Operand::is_immediate_form) {
                    4
                } else {
                    2
                }
            }
            Instruction::DefB(bytes) => bytes.len() as u16,
            Instruction::DefN { count, .. } => *count,
        }
    }
}
