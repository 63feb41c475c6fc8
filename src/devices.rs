//! Bus devices (§4.7): ROM, RAM, and the two-register serial port.

use std::cell::RefCell;

use byteorder::{BigEndian, ByteOrder};

use crate::bus::Device;

/// Read-only memory, loaded once at construction from a byte source and
/// padded with zero bytes out to `size`.
pub struct Rom {
    data: Vec<u8>,
}

impl Rom {
    pub fn new(size: usize, source: impl Into<Vec<u8>>) -> Self {
        let mut data = source.into();
        data.resize(size, 0);
        Rom { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Device for Rom {
    fn read8(&self, offset: u16) -> Option<u8> {
        self.data.get(offset as usize).copied()
    }

    fn read16(&self, offset: u16) -> Option<u16> {
        let offset = offset as usize;
        let bytes = self.data.get(offset..offset + 2)?;
        Some(BigEndian::read_u16(bytes))
    }
}

/// Zero-initialized read/write memory.
pub struct Ram {
    data: Vec<u8>,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Ram {
            data: vec![0; size],
        }
    }
}

impl Device for Ram {
    fn read8(&self, offset: u16) -> Option<u8> {
        self.data.get(offset as usize).copied()
    }

    fn read16(&self, offset: u16) -> Option<u16> {
        let offset = offset as usize;
        let bytes = self.data.get(offset..offset + 2)?;
        Some(BigEndian::read_u16(bytes))
    }

    fn write8(&mut self, offset: u16, value: u8) {
        if let Some(slot) = self.data.get_mut(offset as usize) {
            *slot = value;
        }
    }

    fn write16(&mut self, offset: u16, value: u16) {
        let offset = offset as usize;
        if let Some(bytes) = self.data.get_mut(offset..offset + 2) {
            BigEndian::write_u16(bytes, value);
        }
    }
}

/// The host-terminal binding a [`Serial`] device forwards bytes through.
/// The pseudo-terminal plumbing itself is an external-interface concern
/// (§1); this trait is the abstraction boundary implementers are free to
/// back with a real terminal, a pipe, or (as in the tests below) a queue.
pub trait SerialEndpoint {
    /// Non-blocking: is a byte available to read right now?
    fn ready(&mut self) -> bool;
    /// Blocks for at most one byte.
    fn recv(&mut self) -> u8;
    /// Sends one byte to the host endpoint.
    fn send(&mut self, byte: u8);
}

/// Serial port: offset 0 is the non-blocking status register, offset 1 is
/// the data register (§4.7). `Device::read8` only hands out `&self`, but
/// polling or receiving from the host endpoint is inherently mutating, so
/// the endpoint lives behind a `RefCell`.
pub struct Serial<E: SerialEndpoint> {
    endpoint: RefCell<E>,
}

impl<E: SerialEndpoint> Serial<E> {
    pub fn new(endpoint: E) -> Self {
        Serial {
            endpoint: RefCell::new(endpoint),
        }
    }
}

impl<E: SerialEndpoint> Device for Serial<E> {
    fn read8(&self, offset: u16) -> Option<u8> {
        match offset {
            0 => Some(self.endpoint.borrow_mut().ready() as u8),
            1 => Some(self.endpoint.borrow_mut().recv()),
            _ => None,
        }
    }

    fn write8(&mut self, offset: u16, value: u8) {
        if offset == 1 {
            self.endpoint.get_mut().send(value);
        }
    }
}

/// A [`SerialEndpoint`] backed by a background reader thread and an
/// `mpsc` channel, so polling stdin for readiness never blocks the CPU
/// loop. Bytes written go straight to stdout.
pub struct StdioEndpoint {
    incoming: std::sync::mpsc::Receiver<u8>,
    peeked: Option<u8>,
}

impl StdioEndpoint {
    pub fn new() -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            use std::io::Read;
            let mut byte = [0u8; 1];
            let mut stdin = std::io::stdin();
            while stdin.read_exact(&mut byte).is_ok() {
                if tx.send(byte[0]).is_err() {
                    break;
                }
            }
        });
        StdioEndpoint {
            incoming: rx,
            peeked: None,
        }
    }
}

impl Default for StdioEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialEndpoint for StdioEndpoint {
    fn ready(&mut self) -> bool {
        if self.peeked.is_some() {
            return true;
        }
        if let Ok(byte) = self.incoming.try_recv() {
            self.peeked = Some(byte);
        }
        self.peeked.is_some()
    }

    fn recv(&mut self) -> u8 {
        if let Some(byte) = self.peeked.take() {
            return byte;
        }
        self.incoming.recv().unwrap_or(0)
    }

    fn send(&mut self, byte: u8) {
        use std::io::Write;
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(&[byte]);
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct QueueEndpoint {
        inbox: VecDeque<u8>,
        outbox: Vec<u8>,
    }

    impl SerialEndpoint for QueueEndpoint {
        fn ready(&mut self) -> bool {
            !self.inbox.is_empty()
        }

        fn recv(&mut self) -> u8 {
            self.inbox.pop_front().unwrap_or(0)
        }

        fn send(&mut self, byte: u8) {
            self.outbox.push(byte);
        }
    }

    #[test]
    fn rom_reads_big_endian_words() {
        let rom = Rom::new(4, vec![0x12, 0x34, 0x56, 0x78]);
        assert_eq!(rom.read16(0), Some(0x1234));
        assert_eq!(rom.read8(2), Some(0x56));
    }

    #[test]
    fn rom_ignores_writes() {
        let mut rom = Rom::new(2, vec![0xAA, 0xBB]);
        rom.write8(0, 0x00);
        assert_eq!(rom.read8(0), Some(0xAA));
    }

    #[test]
    fn ram_round_trips_bytes_and_words() {
        let mut ram = Ram::new(4);
        ram.write16(0, 0xBEEF);
        assert_eq!(ram.read16(0), Some(0xBEEF));
        ram.write8(2, 0x42);
        assert_eq!(ram.read8(2), Some(0x42));
    }

    #[test]
    fn serial_status_reflects_endpoint_readiness() {
        let mut endpoint = QueueEndpoint::default();
        endpoint.inbox.push_back(0x41);
        let serial = Serial::new(endpoint);
        assert_eq!(serial.read8(0), Some(1));
        assert_eq!(serial.read8(1), Some(0x41));
        assert_eq!(serial.read8(0), Some(0));
    }

    #[test]
    fn serial_write_forwards_to_endpoint() {
        let mut serial = Serial::new(QueueEndpoint::default());
        serial.write8(1, b'x');
        assert_eq!(serial.endpoint.get_mut().outbox, vec![b'x']);
    }
}
