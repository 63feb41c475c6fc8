//! Disassembler (§4.9): the inverse of §4.1's encoding plus textual operand
//! formatting. An undecodable word falls back to `DEFW 0x<hex>` rather than
//! stopping — disassembly must never be fatal.

use octo16::bus::Bus;
use octo16::{decode_word, mnemonic_of, Mnemonic, Shape};

/// Disassembles the instruction starting at `address`, returning its
/// rendered text and the number of bytes it occupies (2 or 4).
pub fn disassemble_one(bus: &Bus, address: u16) -> (String, u16) {
    let word = match bus.read16(address) {
        Ok(word) => word,
        Err(_) => return (format!("DEFW {:#06x}", bus.read8(address)), 2),
    };

    let decoded = match decode_word(word) {
        Ok(decoded) => decoded,
        Err(_) => return (format!("DEFW {:#06x}", word), 2),
    };

    let mnemonic = match mnemonic_of(&decoded) {
        Some(m) => m,
        None => return (format!("DEFW {:#06x}", word), 2),
    };

    if !decoded.immediate {
        return (render(mnemonic, decoded.rn, decoded.rm, None), 2);
    }

    let immediate = bus.read16(address.wrapping_add(2)).unwrap_or(0xFFFF);
    (render(mnemonic, decoded.rn, decoded.rm, Some(immediate)), 4)
}

fn render(mnemonic: Mnemonic, rn: u8, rm: u8, immediate: Option<u16>) -> String {
    let name = format!("{:?}", mnemonic);
    match mnemonic.shape() {
        Shape::None => name,
        Shape::AluUnary => format!("{} R{}", name, rn),
        Shape::AluBinary | Shape::Move => {
            format!("{} R{}, {}", name, rn, source_text(rm, immediate))
        }
        Shape::Load => format!("{} R{}, {}", name, rn, address_text(rm, immediate)),
        Shape::Store => format!("{} {}, R{}", name, address_text(rn, immediate), rm),
        Shape::BranchTarget | Shape::CallTarget => format!("{} {}", name, address_text(rm, immediate)),
    }
}

fn source_text(rm: u8, immediate: Option<u16>) -> String {
    match immediate {
        Some(value) => format!("{:#06x}", value),
        None => format!("R{}", rm),
    }
}

fn address_text(reg: u8, immediate: Option<u16>) -> String {
    match immediate {
        Some(value) => format!("{:#06x}", value),
        None => format!("@R{}", reg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octo16::bus::Device;
    use octo16::devices::Ram;
    use octo16::{encode_word, AluFunc, ControlFunc, Group};

    fn bus_with(words: &[u16]) -> Bus {
        let mut ram = Ram::new(0x100);
        let mut offset = 0u16;
        for &w in words {
            ram.write8(offset, (w >> 8) as u8);
            ram.write8(offset + 1, (w & 0xFF) as u8);
            offset += 2;
        }
        let mut bus = Bus::new();
        bus.map(0x0000, 0x00FF, Box::new(ram)).unwrap();
        bus
    }

    #[test]
    fn disassembles_register_form_alu() {
        let bus = bus_with(&[encode_word(Group::Alu, AluFunc::Add as u8, false, 1, 2)]);
        let (text, size) = disassemble_one(&bus, 0);
        assert_eq!(text, "ADD R1, R2");
        assert_eq!(size, 2);
    }

    #[test]
    fn disassembles_immediate_branch() {
        let bus = bus_with(&[
            encode_word(Group::Control, ControlFunc::Bra as u8, true, 0, 0),
            0x0010,
        ]);
        let (text, size) = disassemble_one(&bus, 0);
        assert_eq!(text, "BRA 0x0010");
        assert_eq!(size, 4);
    }

    #[test]
    fn falls_back_to_defw_on_unassigned_func() {
        let bus = bus_with(&[encode_word(Group::Alu, 0b1111, false, 0, 0)]);
        let (text, _) = disassemble_one(&bus, 0);
        assert!(text.starts_with("DEFW"));
    }
}
