//! Error kinds owned by the core crate (§7): the bus, the devices, and the
//! CPU cycle. The assembler's own lex/parse/emit errors live in the `asm`
//! crate, built the same way.

use thiserror::Error;

/// Two mapped regions would overlap (§4.6).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("region {new_start:#06x}..={new_end:#06x} overlaps existing region {existing_start:#06x}..={existing_end:#06x}")]
pub struct MapError {
    pub new_start: u16,
    pub new_end: u16,
    pub existing_start: u16,
    pub existing_end: u16,
}

/// A word-granularity bus access landed on an odd device-local offset
/// (§4.6 Alignment).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("misaligned word access at address {address:#06x}")]
pub struct AlignmentError {
    pub address: u16,
}

/// An instruction word's `GRP`/`FUNC` pairing is unassigned (§4.1).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("undecodable instruction word {word:#06x} at pc {pc:#06x}")]
pub struct DecodeError {
    pub word: u16,
    pub pc: u16,
}

/// Errors a running [`crate::cpu::Cpu`] can raise during `step` (§7: both
/// are fatal to the current run and return control to the debugger REPL).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
}
