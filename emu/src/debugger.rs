//! Interactive debugger (§4.9): single-step, step-over-call, run-to-
//! breakpoint, and inspection commands layered over a [`Cpu`].

use std::collections::BTreeSet;

use octo16::bus::Bus;
use octo16::cpu::Cpu;
use octo16::error::CpuError;
use octo16::{decode_word, mnemonic_of, Mnemonic};

use crate::disasm::disassemble_one;

/// What stopped a `next` or `run` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Breakpoint(u16),
}

/// One row of a `memory` dump: the row's starting address and its bytes.
pub type MemoryRow = (u16, Vec<u8>);

pub struct Debugger {
    pub cpu: Cpu,
    breakpoints: BTreeSet<u16>,
}

impl Debugger {
    pub fn new(cpu: Cpu) -> Self {
        Debugger {
            cpu,
            breakpoints: BTreeSet::new(),
        }
    }

    fn peek_mnemonic(&self) -> Option<Mnemonic> {
        let word = self.cpu.bus().read16(self.cpu.pc).ok()?;
        mnemonic_of(&decode_word(word).ok()?)
    }

    fn check_breakpoint(&self) -> Option<StepOutcome> {
        self.breakpoints
            .contains(&self.cpu.pc)
            .then_some(StepOutcome::Breakpoint(self.cpu.pc))
    }

    /// Executes exactly one instruction (§4.9 `step`).
    pub fn step(&mut self) -> Result<(), CpuError> {
        self.cpu.step()
    }

    /// Executes one instruction, treating a `CALL` as a single unit rather
    /// than descending into the callee (§4.9 `next`).
    pub fn next(&mut self) -> Result<StepOutcome, CpuError> {
        let is_call = self.peek_mnemonic() == Some(Mnemonic::CALL);
        self.cpu.step()?;
        if !is_call {
            return Ok(self.check_breakpoint().unwrap_or(StepOutcome::Completed));
        }

        let mut depth = 1i32;
        loop {
            if let Some(outcome) = self.check_breakpoint() {
                return Ok(outcome);
            }
            let entering_call = self.peek_mnemonic() == Some(Mnemonic::CALL);
            let entering_ret = self.peek_mnemonic() == Some(Mnemonic::RET);
            self.cpu.step()?;
            if entering_call {
                depth += 1;
            }
            if entering_ret {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
        }
        Ok(StepOutcome::Completed)
    }

    /// Steps until `pc` lands on a breakpoint (§4.9 `run`).
    pub fn run(&mut self) -> Result<StepOutcome, CpuError> {
        loop {
            self.cpu.step()?;
            if let Some(outcome) = self.check_breakpoint() {
                return Ok(outcome);
            }
        }
    }

    /// Resets the CPU, then resumes running. The confirmation prompt is the
    /// REPL's responsibility, not the debugger's (§4.9 `reset`).
    pub fn reset(&mut self) -> Result<StepOutcome, CpuError> {
        self.cpu.reset();
        self.run()
    }

    pub fn break_set(&mut self, address: u16) {
        self.breakpoints.insert(address);
    }

    pub fn break_delete(&mut self, address: u16) {
        self.breakpoints.remove(&address);
    }

    pub fn break_list(&self) -> Vec<u16> {
        self.breakpoints.iter().copied().collect()
    }

    /// Disassembles `count` instructions starting at `start` (§4.9 `list`).
    pub fn list(&self, start: u16, count: u16) -> Vec<(u16, String)> {
        let mut address = start;
        let mut lines = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (text, size) = disassemble_one(self.cpu.bus(), address);
            lines.push((address, text));
            address = address.wrapping_add(size);
        }
        lines
    }

    /// Hex dump of `[start, end)`, 16 bytes per row (§4.9 `memory`).
    pub fn memory(&self, start: u16, end: u16) -> Vec<MemoryRow> {
        let mut rows = Vec::new();
        let mut address = start;
        while address < end {
            let row_len = 16.min(end - address);
            let bytes = (0..row_len).map(|i| self.cpu.bus().read8(address + i)).collect();
            rows.push((address, bytes));
            address += 16;
        }
        rows
    }

    /// `pc`, `status`, the register file, and a disassembly of the
    /// instruction at `pc` (§4.9 `registers`).
    pub fn registers(&self) -> (u16, u8, [u16; 16], String) {
        let (text, _) = disassemble_one(self.cpu.bus(), self.cpu.pc);
        (self.cpu.pc, self.cpu.status, self.cpu.registers, text)
    }

    pub fn bus(&self) -> &Bus {
        self.cpu.bus()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octo16::bus::Device;
    use octo16::devices::Ram;
    use octo16::{encode_word, AluFunc, ControlFunc, Group};

    fn debugger_with(words: &[u16]) -> Debugger {
        let mut ram = Ram::new(0x1000);
        let mut offset = 0u16;
        for &w in words {
            ram.write8(offset, (w >> 8) as u8);
            ram.write8(offset + 1, (w & 0xFF) as u8);
            offset += 2;
        }
        let mut bus = Bus::new();
        bus.map(0x0000, 0x0FFF, Box::new(ram)).unwrap();
        Debugger::new(Cpu::new(bus))
    }

    #[test]
    fn next_steps_over_a_call_as_one_unit() {
        let mut debugger = debugger_with(&[
            encode_word(Group::Control, ControlFunc::Call as u8, true, 15, 0),
            0x0006,
            encode_word(Group::Alu, AluFunc::Add as u8, false, 0, 0),
            encode_word(Group::Control, ControlFunc::Ret as u8, false, 0, 15),
        ]);
        let outcome = debugger.next().unwrap();
        assert_eq!(outcome, StepOutcome::Completed);
        assert_eq!(debugger.cpu.pc, 0x0004);
    }

    #[test]
    fn run_stops_at_a_breakpoint() {
        let mut debugger = debugger_with(&[
            encode_word(Group::Alu, AluFunc::Add as u8, false, 0, 0),
            encode_word(Group::Alu, AluFunc::Add as u8, false, 0, 0),
            encode_word(Group::Alu, AluFunc::Add as u8, false, 0, 0),
        ]);
        debugger.break_set(0x0004);
        let outcome = debugger.run().unwrap();
        assert_eq!(outcome, StepOutcome::Breakpoint(0x0004));
        assert_eq!(debugger.cpu.pc, 0x0004);
    }

    #[test]
    fn list_advances_by_four_across_an_immediate_instruction() {
        let debugger = debugger_with(&[
            encode_word(Group::Control, ControlFunc::Bra as u8, true, 0, 0),
            0x0010,
            encode_word(Group::Alu, AluFunc::Add as u8, false, 1, 2),
        ]);
        let lines = debugger.list(0, 2);
        assert_eq!(lines[0].0, 0);
        assert_eq!(lines[1].0, 4);
    }

    #[test]
    fn memory_rows_are_sixteen_bytes() {
        let debugger = debugger_with(&[0; 16]);
        let rows = debugger.memory(0, 32);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1.len(), 16);
    }
}
