//! Fetch-decode-execute cycle (§4.8).

use log::trace;
use num_traits::FromPrimitive;

use crate::alu;
use crate::bus::Bus;
use crate::constants::{
    FUNC_MASK, FUNC_OFFSET, GRP_MASK, GRP_OFFSET, I_MASK, I_OFFSET, LINK_REGISTER, REGISTER_COUNT,
    RM_MASK, RM_OFFSET, RN_MASK, RN_OFFSET,
};
use crate::enums::{AluFunc, ControlFunc, Group, LoadStoreFunc, Mnemonic};
use crate::error::{CpuError, DecodeError};

/// One decoded instruction word, split per §4.1.
#[derive(Clone, Copy, Debug)]
pub struct Decoded {
    pub group: Group,
    pub func: u8,
    pub immediate: bool,
    pub rn: u8,
    pub rm: u8,
}

pub fn decode_word(word: u16) -> Result<Decoded, u8> {
    let grp_bits = ((word & GRP_MASK) >> GRP_OFFSET) as u8;
    let group = Group::from_u8(grp_bits).ok_or(grp_bits)?;
    Ok(Decoded {
        group,
        func: ((word & FUNC_MASK) >> FUNC_OFFSET) as u8,
        immediate: word & I_MASK != 0,
        rn: ((word & RN_MASK) >> RN_OFFSET) as u8,
        rm: ((word & RM_MASK) >> RM_OFFSET) as u8,
    })
}

/// Encodes a `(group, func, immediate, rn, rm)` tuple into one opcode word.
/// The inverse of [`decode_word`]; shared with the assembler's emitter so
/// both halves of the encoding agree bit-for-bit.
pub fn encode_word(group: Group, func: u8, immediate: bool, rn: u8, rm: u8) -> u16 {
    ((group as u16) << GRP_OFFSET)
        | ((func as u16) << FUNC_OFFSET)
        | ((immediate as u16) << I_OFFSET)
        | ((rn as u16) << RN_OFFSET)
        | (rm as u16)
}

/// Full register/PC/status state plus the bus it executes against (§3).
pub struct Cpu {
    pub registers: [u16; REGISTER_COUNT],
    pub pc: u16,
    pub status: u8,
    pub immediate_latch: u16,
    bus: Bus,
}

impl Cpu {
    pub fn new(bus: Bus) -> Self {
        Cpu {
            registers: [0; REGISTER_COUNT],
            pc: 0,
            status: 0,
            immediate_latch: 0,
            bus,
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Zeroes registers, `pc`, status and the immediate latch (§4.8 Reset).
    /// Devices are untouched: the bus isn't reconstructed.
    pub fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.pc = 0;
        self.status = 0;
        self.immediate_latch = 0;
    }

    fn carry_in(&self) -> bool {
        self.status & alu::CARRY != 0
    }

    fn write_register(&mut self, index: u8, value: u16) {
        self.registers[index as usize] = value;
    }

    fn register(&self, index: u8) -> u16 {
        self.registers[index as usize]
    }

    /// `S` in §4.8: the immediate latch if `I=1`, else `R[RM]`.
    fn source(&self, decoded: &Decoded) -> u16 {
        if decoded.immediate {
            self.immediate_latch
        } else {
            self.register(decoded.rm)
        }
    }

    /// The branch/CALL target: the immediate latch if `I=1`, else `R[RM]`.
    fn branch_target(&self, decoded: &Decoded) -> u16 {
        self.source(decoded)
    }

    /// The store target: the immediate latch if `I=1`, else `R[RN]`
    /// (§4.8 STW/STB — note this reads `RN`, not `RM`).
    fn store_target(&self, decoded: &Decoded) -> u16 {
        if decoded.immediate {
            self.immediate_latch
        } else {
            self.register(decoded.rn)
        }
    }

    /// Executes a single fetch-decode-execute cycle, per §4.8. Runs to
    /// completion uninterruptibly: callers queue cancellation and observe
    /// it only between calls to `step` (§5).
    pub fn step(&mut self) -> Result<(), CpuError> {
        let pc_of_instruction = self.pc;
        let word = self.bus.read16(self.pc).map_err(CpuError::Alignment)?;
        self.pc = self.pc.wrapping_add(2);

        let decoded = decode_word(word).map_err(|_| {
            CpuError::Decode(DecodeError {
                word,
                pc: pc_of_instruction,
            })
        })?;

        if decoded.immediate {
            self.immediate_latch = self.bus.read16(self.pc).map_err(CpuError::Alignment)?;
            self.pc = self.pc.wrapping_add(2);
        }

        self.execute(decoded, word, pc_of_instruction)
    }

    fn execute(&mut self, decoded: Decoded, word: u16, pc: u16) -> Result<(), CpuError> {
        match decoded.group {
            Group::Nop => {
                trace!("{:#06x}: nop", pc);
            }
            Group::Alu => self.execute_alu(decoded, word, pc)?,
            Group::Control => self.execute_control(decoded, word, pc)?,
            Group::LoadStoreMove => self.execute_load_store_move(decoded, word, pc)?,
        }
        Ok(())
    }

    fn execute_alu(&mut self, decoded: Decoded, word: u16, pc: u16) -> Result<(), CpuError> {
        let func = AluFunc::from_u8(decoded.func).ok_or(CpuError::Decode(DecodeError { word, pc }))?;
        let d = self.register(decoded.rn);
        let s = self.source(&decoded);
        let (result, flags) = alu::evaluate(func, d, s, self.carry_in());
        self.status = flags.0;
        if func.writes_back() {
            self.write_register(decoded.rn, result);
        }
        trace!(
            "{:#06x}: {:?} r{}, {:#06x} -> {:#06x} (status={:#03x})",
            pc, func, decoded.rn, s, result, self.status
        );
        Ok(())
    }

    fn execute_control(&mut self, decoded: Decoded, word: u16, pc: u16) -> Result<(), CpuError> {
        let func =
            ControlFunc::from_u8(decoded.func).ok_or(CpuError::Decode(DecodeError { word, pc }))?;
        let target = self.branch_target(&decoded);
        let taken = match func {
            ControlFunc::Bra => true,
            ControlFunc::Bz => self.status & alu::ZERO != 0,
            ControlFunc::Bnz => self.status & alu::ZERO == 0,
            ControlFunc::Bc => self.status & alu::CARRY != 0,
            ControlFunc::Bnc => self.status & alu::CARRY == 0,
            ControlFunc::Call => {
                self.write_register(LINK_REGISTER, self.pc);
                true
            }
            ControlFunc::Ret => {
                self.pc = self.register(LINK_REGISTER);
                false
            }
        };
        if taken && func != ControlFunc::Ret {
            trace!("{:#06x}: {:?} -> {:#06x}", pc, func, target);
            self.pc = target;
        }
        Ok(())
    }

    fn execute_load_store_move(
        &mut self,
        decoded: Decoded,
        word: u16,
        pc: u16,
    ) -> Result<(), CpuError> {
        let func = LoadStoreFunc::from_u8(decoded.func)
            .ok_or(CpuError::Decode(DecodeError { word, pc }))?;
        match func {
            LoadStoreFunc::Ldw => {
                let address = self.source(&decoded);
                let value = self.bus.read16(address).map_err(CpuError::Alignment)?;
                self.write_register(decoded.rn, value);
            }
            LoadStoreFunc::Ldb => {
                let address = self.source(&decoded);
                let value = self.bus.read8(address);
                self.write_register(decoded.rn, value as u16);
            }
            LoadStoreFunc::Mov => {
                let value = self.source(&decoded);
                self.write_register(decoded.rn, value);
            }
            LoadStoreFunc::Stw => {
                let target = self.store_target(&decoded);
                let value = self.register(decoded.rm);
                self.bus.write16(target, value).map_err(CpuError::Alignment)?;
            }
            LoadStoreFunc::Stb => {
                let target = self.store_target(&decoded);
                let value = self.register(decoded.rm);
                self.bus.write8(target, (value & 0xFF) as u8);
            }
        }
        trace!("{:#06x}: {:?}", pc, func);
        Ok(())
    }
}

/// Inverse of [`Cpu::from_bits`]-style lookups, used by the disassembler:
/// resolves a decoded word's group/func back to its mnemonic.
pub fn mnemonic_of(decoded: &Decoded) -> Option<Mnemonic> {
    Mnemonic::from_bits(decoded.group, decoded.func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Device;
    use crate::devices::Ram;

    fn cpu_with_program(words: &[u16]) -> Cpu {
        let mut bytes = Vec::new();
        for &w in words {
            bytes.push((w >> 8) as u8);
            bytes.push((w & 0xFF) as u8);
        }
        let mut ram = Ram::new(0x1000);
        for (i, b) in bytes.iter().enumerate() {
            ram.write8(i as u16, *b);
        }
        let mut bus = Bus::new();
        bus.map(0x0000, 0x0FFF, Box::new(ram)).unwrap();
        Cpu::new(bus)
    }

    #[test]
    fn add_writes_destination_and_flags() {
        let mut cpu = cpu_with_program(&[encode_word(Group::Alu, AluFunc::Add as u8, false, 1, 2)]);
        cpu.registers[1] = 5;
        cpu.registers[2] = 3;
        cpu.step().unwrap();
        assert_eq!(cpu.registers[1], 8);
    }

    #[test]
    fn cp_does_not_write_back() {
        let mut cpu = cpu_with_program(&[encode_word(Group::Alu, AluFunc::Cp as u8, false, 1, 2)]);
        cpu.registers[1] = 5;
        cpu.registers[2] = 5;
        cpu.step().unwrap();
        assert_eq!(cpu.registers[1], 5);
        assert!(cpu.status & alu::ZERO != 0);
    }

    #[test]
    fn call_then_ret_round_trips_pc() {
        let mut cpu = cpu_with_program(&[
            encode_word(Group::Control, ControlFunc::Call as u8, true, 15, 0),
            0x0008, // target: the ret instruction, past the skipped mov
            encode_word(Group::LoadStoreMove, LoadStoreFunc::Mov as u8, true, 0, 0),
            0x0001,
            encode_word(Group::Control, ControlFunc::Ret as u8, false, 0, 15),
        ]);
        cpu.step().unwrap(); // CALL
        assert_eq!(cpu.pc, 0x0008);
        assert_eq!(cpu.registers[15], 0x0004);
        cpu.step().unwrap(); // RET
        assert_eq!(cpu.pc, 0x0004);
    }

    #[test]
    fn decode_error_on_unassigned_func() {
        let mut cpu = cpu_with_program(&[encode_word(Group::Control, 0b0101, false, 0, 0)]);
        assert!(cpu.step().is_err());
    }

    #[test]
    fn reset_clears_registers_pc_and_status() {
        let mut cpu = cpu_with_program(&[encode_word(Group::Nop, 0, false, 0, 0)]);
        cpu.registers[3] = 42;
        cpu.status = 0b1111;
        cpu.pc = 10;
        cpu.reset();
        assert_eq!(cpu.registers[3], 0);
        assert_eq!(cpu.status, 0);
        assert_eq!(cpu.pc, 0);
    }
}
