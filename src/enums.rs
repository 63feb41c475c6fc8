//! Authoritative opcode↔mnemonic↔bitfield mapping (§4.1). Both the `asm`
//! and `emu` crates link against this table instead of keeping their own
//! copies, so encoder and decoder can never silently disagree.

use num_derive::{FromPrimitive, ToPrimitive};
use util::EnumFromStr;
use util_derive::EnumFromStr;

/// Top-level instruction group, `GRP` in the word layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum Group {
    Nop = 0b000,
    Alu = 0b001,
    Control = 0b010,
    LoadStoreMove = 0b011,
}

/// Function codes within [`Group::Alu`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum AluFunc {
    Add = 0b0000,
    Sub = 0b0001,
    And = 0b0010,
    Or = 0b0011,
    Xor = 0b0100,
    Not = 0b0101,
    Shr = 0b0110,
    Shl = 0b0111,
    Cp = 0b1000,
    Test = 0b1001,
}

impl AluFunc {
    /// CP and TEST compute flags only; the destination register keeps its
    /// prior value (§4.5, §4.8).
    pub fn writes_back(self) -> bool {
        !matches!(self, AluFunc::Cp | AluFunc::Test)
    }
}

/// Function codes within [`Group::Control`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum ControlFunc {
    Bra = 0b0000,
    Bz = 0b0001,
    Bnz = 0b0010,
    Bc = 0b0011,
    Bnc = 0b0100,
    Call = 0b1110,
    Ret = 0b1111,
}

/// Function codes within [`Group::LoadStoreMove`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum LoadStoreFunc {
    Ldw = 0b0000,
    Mov = 0b0001,
    Stw = 0b0010,
    Ldb = 0b1000,
    Stb = 0b1010,
}

/// Operand grammar shape a mnemonic takes (§4.3). Shared by the assembler's
/// parser (which token sequence to expect) and the emulator's disassembler
/// (how to render operands back out).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Shape {
    /// No operand at all (`ret`).
    None,
    /// `reg ',' (reg|word|ident)` — dest register, then register-or-immediate
    /// source. Used by the binary ALU ops, including CP/TEST.
    AluBinary,
    /// `reg` — single register, used as both D and the write-back target;
    /// the source operand is ignored (`not`).
    AluUnary,
    /// `reg ',' (word|ident|indirect)` — dest register, then a memory
    /// address (`ldw`, `ldb`).
    Load,
    /// `(word|ident|indirect) ',' reg` — a memory address, then the
    /// register whose value is stored there (`stw`, `stb`).
    Store,
    /// `reg ',' (reg|word|ident)` — dest register, then register-or-
    /// immediate source, written unconditionally (`mov`).
    Move,
    /// `(word|ident|indirect)` — a branch target; `RN` is fixed at 0.
    BranchTarget,
    /// `(word|ident|indirect)` — a call target; `RN` is fixed at 15.
    CallTarget,
}

/// Every mnemonic the ISA defines, with its group/func encoding and operand
/// shape. The single source of truth the emitter and disassembler both read.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumFromStr)]
pub enum Mnemonic {
    NOP,
    ADD,
    SUB,
    AND,
    OR,
    XOR,
    NOT,
    SHR,
    SHL,
    CP,
    TEST,
    BRA,
    BZ,
    BNZ,
    BC,
    BNC,
    CALL,
    RET,
    LDW,
    LDB,
    MOV,
    STW,
    STB,
}

impl Mnemonic {
    pub const ALL: &'static [Mnemonic] = &[
        Mnemonic::NOP,
        Mnemonic::ADD,
        Mnemonic::SUB,
        Mnemonic::AND,
        Mnemonic::OR,
        Mnemonic::XOR,
        Mnemonic::NOT,
        Mnemonic::SHR,
        Mnemonic::SHL,
        Mnemonic::CP,
        Mnemonic::TEST,
        Mnemonic::BRA,
        Mnemonic::BZ,
        Mnemonic::BNZ,
        Mnemonic::BC,
        Mnemonic::BNC,
        Mnemonic::CALL,
        Mnemonic::RET,
        Mnemonic::LDW,
        Mnemonic::LDB,
        Mnemonic::MOV,
        Mnemonic::STW,
        Mnemonic::STB,
    ];

    pub fn shape(self) -> Shape {
        use Mnemonic::*;
        match self {
            NOP | RET => Shape::None,
            ADD | SUB | AND | OR | XOR | SHR | SHL | CP | TEST => Shape::AluBinary,
            NOT => Shape::AluUnary,
            LDW | LDB => Shape::Load,
            STW | STB => Shape::Store,
            MOV => Shape::Move,
            BRA | BZ | BNZ | BC | BNC => Shape::BranchTarget,
            CALL => Shape::CallTarget,
        }
    }

    pub fn group(self) -> Group {
        use Mnemonic::*;
        match self {
            NOP => Group::Nop,
            ADD | SUB | AND | OR | XOR | NOT | SHR | SHL | CP | TEST => Group::Alu,
            BRA | BZ | BNZ | BC | BNC | CALL | RET => Group::Control,
            LDW | LDB | MOV | STW | STB => Group::LoadStoreMove,
        }
    }

    /// The 4-bit `FUNC` value this mnemonic encodes to, within its group.
    pub fn func(self) -> u8 {
        use Mnemonic::*;
        match self {
            NOP => 0,
            ADD => AluFunc::Add as u8,
            SUB => AluFunc::Sub as u8,
            AND => AluFunc::And as u8,
            OR => AluFunc::Or as u8,
            XOR => AluFunc::Xor as u8,
            NOT => AluFunc::Not as u8,
            SHR => AluFunc::Shr as u8,
            SHL => AluFunc::Shl as u8,
            CP => AluFunc::Cp as u8,
            TEST => AluFunc::Test as u8,
            BRA => ControlFunc::Bra as u8,
            BZ => ControlFunc::Bz as u8,
            BNZ => ControlFunc::Bnz as u8,
            BC => ControlFunc::Bc as u8,
            BNC => ControlFunc::Bnc as u8,
            CALL => ControlFunc::Call as u8,
            RET => ControlFunc::Ret as u8,
            LDW => LoadStoreFunc::Ldw as u8,
            LDB => LoadStoreFunc::Ldb as u8,
            MOV => LoadStoreFunc::Mov as u8,
            STW => LoadStoreFunc::Stw as u8,
            STB => LoadStoreFunc::Stb as u8,
        }
    }

    /// Inverse of [`Mnemonic::group`]/[`Mnemonic::func`]; `None` for an
    /// unassigned GRP/FUNC pairing (§7 `DecodeError`).
    pub fn from_bits(group: Group, func: u8) -> Option<Mnemonic> {
        Mnemonic::ALL
            .iter()
            .copied()
            .find(|m| m.group() == group && m.func() == func)
    }

    /// The source-text keyword for this mnemonic (lowercase, §6). The
    /// lexer's keyword table instead goes through [`EnumFromStr`], matching
    /// the uppercased token text against the variant identifiers directly.
    pub fn keyword(self) -> String {
        format!("{:?}", self).to_lowercase()
    }

    /// Looks up a mnemonic by its lowercase source keyword.
    pub fn from_keyword(s: &str) -> Option<Mnemonic> {
        <Mnemonic as EnumFromStr>::from_str(&s.to_uppercase()).ok()
    }
}

impl std::fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_every_mnemonic_through_group_and_func() {
        for &m in Mnemonic::ALL {
            assert_eq!(Mnemonic::from_bits(m.group(), m.func()), Some(m), "{:?}", m);
        }
    }

    #[test]
    fn roundtrips_every_mnemonic_through_its_keyword() {
        for &m in Mnemonic::ALL {
            assert_eq!(Mnemonic::from_keyword(&m.keyword()), Some(m));
        }
    }

    #[test]
    fn rejects_unassigned_bits() {
        assert_eq!(Mnemonic::from_bits(Group::Alu, 0b1111), None);
        assert_eq!(Mnemonic::from_bits(Group::Control, 0b0101), None);
    }
}
