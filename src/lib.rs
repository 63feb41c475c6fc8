//! Core instruction encoding, ALU, memory bus and CPU for the octo16 ISA
//! (§4.1, §4.5–§4.8). Linked by both the `asm` assembler and the `emu`
//! emulator so the two halves can never disagree on the wire format.

pub mod alu;
pub mod bus;
pub mod constants;
pub mod cpu;
pub mod devices;
pub mod enums;
pub mod error;

pub use cpu::{decode_word, encode_word, mnemonic_of, Cpu, Decoded};
pub use enums::{AluFunc, ControlFunc, Group, LoadStoreFunc, Mnemonic, Shape};
