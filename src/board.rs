//! A board: the CPU plus a fixed-order collection of peripheral devices,
//! all sharing one bus.

use log::debug;

use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::device::Device;

/// Owns the [`Bus`], the [`Cpu`], and every peripheral [`Device`] wired to
/// it, and drives the clock.
///
/// Each tick simulates the CPU first, then every peripheral in the order it
/// was added, so a read or write the CPU issues this cycle is visible to the
/// responding peripheral later in the same tick.
pub struct Board {
    bus: Bus,
    cpu: Cpu,
    peripherals: Vec<Box<dyn Device>>,
}

impl Board {
    pub fn new(cpu: Cpu) -> Board {
        Board {
            bus: Bus::default(),
            cpu,
            peripherals: Vec::new(),
        }
    }

    pub fn add_peripheral(&mut self, device: Box<dyn Device>) {
        self.peripherals.push(device);
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Runs each device's `init` once, CPU first.
    pub fn init(&mut self) {
        self.cpu.init(&mut self.bus);
        for device in &mut self.peripherals {
            device.init(&mut self.bus);
        }
    }

    /// Ticks the CPU, then every peripheral once, in addition order.
    pub fn tick(&mut self) {
        self.cpu.simulate(&mut self.bus);
        for device in &mut self.peripherals {
            device.simulate(&mut self.bus);
        }
    }

    /// Runs the board until the CPU halts.
    pub fn run_until_halt(&mut self) {
        self.init();
        while !self.cpu.is_halted() {
            self.tick();
        }
        debug!("halted at ip={:#06x}", self.cpu.ip());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use crate::registers::RegisterId;

    #[test]
    fn runs_a_tiny_program_to_halt() {
        // limm -1; jmp/halt
        let program = vec![0x00, 0xFF, 0xFF, 0x1F];
        let mut board = Board::new(Cpu::new());
        board.add_peripheral(Box::new(Memory::new(0, program)));

        board.run_until_halt();

        assert!(board.cpu().is_halted());
        assert_eq!(board.cpu().register(RegisterId::tmp), -1);
    }
}
