//! The serial-port device: a single-byte terminal connection mapped
//! onto one bus address.

use std::io::{self, Read, Write};

use log::debug;

use crate::bus::{Bus, BusMode};
use crate::device::Device;

/// A terminal-backed device mapped to one address. Reads block for one
/// input byte; writes place one byte on stdout and flush immediately.
pub struct SerialPort {
    address: u16,
}

impl SerialPort {
    pub fn new(address: u16) -> SerialPort {
        SerialPort { address }
    }
}

impl Device for SerialPort {
    fn simulate(&mut self, bus: &mut Bus) {
        if bus.address() != self.address {
            return;
        }

        match bus.mode() {
            BusMode::Read => {
                let mut byte = [0u8; 1];
                io::stdin()
                    .read_exact(&mut byte)
                    .expect("serial read failed");
                bus.set_data(byte[0] as u16);
                debug!("serial[{:#06x}] read {:#04x}", self.address, byte[0]);
            }
            BusMode::Write => {
                let byte = bus.data() as u8;
                let mut stdout = io::stdout();
                stdout.write_all(&[byte]).expect("serial write failed");
                stdout.flush().expect("serial flush failed");
                debug!("serial[{:#06x}] write {:#04x}", self.address, byte);
            }
            BusMode::Off => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_addresses_other_than_its_own() {
        let mut port = SerialPort::new(0xFFFF);
        let mut bus = Bus::default();
        bus.set_address(0);
        bus.set_mode(BusMode::Write);
        bus.set_data(b'x' as u16);
        // Should not attempt any terminal I/O since the address doesn't match.
        port.simulate(&mut bus);
    }
}
