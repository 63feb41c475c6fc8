//! Interactive emulator and debugger for the octo16 instruction set
//! (§4.9–§4.10): loads a flat ROM image, wires it and a RAM/serial bus
//! into a [`Cpu`], and exposes a [`Debugger`] for stepping through it.

pub mod debugger;
pub mod disasm;

pub use debugger::{Debugger, StepOutcome};

use octo16::bus::Bus;
use octo16::constants::{RAM_SIZE, RAM_START, ROM_SIZE, ROM_START, SERIAL_START};
use octo16::cpu::Cpu;
use octo16::devices::{Ram, Rom, Serial, SerialEndpoint, StdioEndpoint};

/// Builds the default memory map (§4.6, §4.7): ROM at the bottom, RAM in
/// the middle, the serial port at the top two bytes.
pub fn default_bus(rom_bytes: Vec<u8>) -> Bus {
    build_bus(rom_bytes, StdioEndpoint::new())
}

/// Builds the memory map with a caller-supplied serial endpoint, so tests
/// and alternate front-ends can swap stdio for something else.
pub fn build_bus<E: SerialEndpoint + 'static>(rom_bytes: Vec<u8>, endpoint: E) -> Bus {
    let mut bus = Bus::new();
    bus.map(ROM_START, ROM_START + ROM_SIZE as u16 - 1, Box::new(Rom::new(ROM_SIZE, rom_bytes)))
        .expect("rom region does not overlap");
    bus.map(RAM_START, RAM_START + RAM_SIZE as u16 - 1, Box::new(Ram::new(RAM_SIZE)))
        .expect("ram region does not overlap");
    bus.map(SERIAL_START, SERIAL_START + 1, Box::new(Serial::new(endpoint)))
        .expect("serial region does not overlap");
    bus
}

/// Loads a ROM image and returns a fully wired [`Debugger`].
pub fn load(rom_bytes: Vec<u8>) -> Debugger {
    Debugger::new(Cpu::new(default_bus(rom_bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct QueueEndpoint(VecDeque<u8>);

    impl SerialEndpoint for QueueEndpoint {
        fn ready(&mut self) -> bool {
            !self.0.is_empty()
        }

        fn recv(&mut self) -> u8 {
            self.0.pop_front().unwrap_or(0)
        }

        fn send(&mut self, _byte: u8) {}
    }

    #[test]
    fn default_bus_maps_rom_ram_and_serial_without_overlap() {
        let bus = build_bus(vec![0xAA, 0xBB], QueueEndpoint::default());
        assert_eq!(bus.read8(ROM_START), 0xAA);
        assert_eq!(bus.read8(RAM_START), 0x00);
        assert_eq!(bus.read8(SERIAL_START), 0x00);
    }
}
