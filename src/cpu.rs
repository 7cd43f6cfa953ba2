//! The CPU: a single bus device that drives the instruction cycle as
//! an explicit micro-phase state machine.

use log::trace;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use crate::bus::{Bus, BusMode};
use crate::constants::CPU_ID;
use crate::device::Device;
use crate::registers::{RegisterFile, RegisterId};

/// One entry in the CPU's microcycle state machine. Each phase
/// consumes exactly one clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Fetch0,
    Fetch1,
    Decode,
    GetData0,
    GetData1,
    GetData2,
    GetData3,
    Prepare,
    Load0,
    Load1,
    Execute,
    Store0,
    Store1,
    Halted,
}

/// The opcode occupying the low nibble of the first instruction byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum Opcode {
    LoadImmediate = 0x0,
    LoadDirect = 0x1,
    StoreDirect = 0x2,
    LoadIndexed = 0x3,
    StoreIndexed = 0x4,
    Transfer = 0x5,
    Push0 = 0x6,
    Push1 = 0x7,
    Pop0 = 0x8,
    Pop1 = 0x9,
    Add = 0xA,
    Sub = 0xB,
    Mul = 0xC,
    DivMod = 0xD,
    /// Shares its low nibble with the unimplemented Or/And/Invert/Shift/Rotate
    /// family (`0x1E`-`0x7E`); the CPU decodes strictly on the low nibble and
    /// always executes Nand for any of those bytes.
    Nand = 0xE,
    Extended = 0xF,
}

impl Opcode {
    fn from_low_nibble(byte: u8) -> Opcode {
        FromPrimitive::from_u8(byte & 0x0F).expect("low nibble is always in range 0..16")
    }
}

/// The CPU: register file plus pipeline latches, cycling through [`Phase`].
pub struct Cpu {
    registers: RegisterFile,
    phase: Phase,
    ip: u16,
    opcode_byte: u8,
    opcode: Opcode,
    r0: u8,
    r1: u8,
    address: u16,
    value: u16,
    /// Backup of `tmp` prior to the most recent write, restored by `rtm`.
    tmp_backup: i16,
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu {
            registers: RegisterFile::default(),
            phase: Phase::Init,
            ip: 0,
            opcode_byte: 0,
            opcode: Opcode::LoadImmediate,
            r0: 0,
            r1: 0,
            address: 0,
            value: 0,
            tmp_backup: 0,
        }
    }
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ip(&self) -> u16 {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.phase == Phase::Halted
    }

    pub fn register(&self, id: RegisterId) -> i16 {
        self.registers.get(id)
    }

    fn write_tmp(&mut self, value: i16) {
        self.tmp_backup = self.registers.get(RegisterId::tmp);
        self.registers.set(RegisterId::tmp, value);
    }

    fn store_source_register(&self) -> RegisterId {
        RegisterId::from_nibble(self.r0)
    }

    fn indexed_address(&self) -> u16 {
        let base = self.registers.get(RegisterId::bse) as u16;
        let idx = self.registers.get(RegisterId::idx) as u16;
        base.wrapping_add(idx)
    }

    fn fetch_byte(&mut self, bus: &mut Bus) {
        bus.acquire(CPU_ID);
        bus.set_mode(BusMode::Read);
        bus.set_address(self.ip);
        self.ip = self.ip.wrapping_add(1);
    }
}

impl Device for Cpu {
    fn simulate(&mut self, bus: &mut Bus) {
        trace!("cpu phase={:?} ip={:#06x}", self.phase, self.ip);

        match self.phase {
            Phase::Init => {
                self.ip = 0;
                self.phase = Phase::Fetch0;
            }

            Phase::Fetch0 => {
                self.fetch_byte(bus);
                self.phase = Phase::Fetch1;
            }

            Phase::Fetch1 => {
                self.opcode_byte = bus.data() as u8;
                bus.release();
                self.phase = Phase::Decode;
            }

            Phase::Decode => {
                self.opcode = Opcode::from_low_nibble(self.opcode_byte);
                self.r0 = (self.opcode_byte >> 4) & 0x0F;

                self.phase = match self.opcode {
                    Opcode::LoadImmediate | Opcode::LoadDirect | Opcode::StoreDirect => {
                        Phase::GetData0
                    }
                    Opcode::Transfer => Phase::GetData2,
                    _ => Phase::Prepare,
                };
            }

            Phase::GetData0 => {
                self.fetch_byte(bus);
                self.phase = Phase::GetData1;
            }

            Phase::GetData1 => {
                self.r0 = bus.data() as u8;
                bus.set_mode(BusMode::Off);
                self.phase = Phase::GetData2;
            }

            Phase::GetData2 => {
                self.fetch_byte(bus);
                self.phase = Phase::GetData3;
            }

            Phase::GetData3 => {
                self.r1 = bus.data() as u8;
                bus.release();
                self.phase = Phase::Prepare;
            }

            Phase::Prepare => {
                self.address = ((self.r0 as u16) << 8) | (self.r1 as u16);
                self.value = self.address;
                self.r0 &= 0x0F;
                self.r1 &= 0x0F;

                self.phase = match self.opcode {
                    Opcode::LoadDirect | Opcode::LoadIndexed | Opcode::Pop0 | Opcode::Pop1 => {
                        Phase::Load0
                    }
                    _ => Phase::Execute,
                };
            }

            Phase::Load0 => {
                bus.acquire(CPU_ID);
                bus.set_mode(BusMode::Read);
                let address = match self.opcode {
                    Opcode::LoadDirect => self.address,
                    Opcode::LoadIndexed => self.indexed_address(),
                    Opcode::Pop0 => self.registers.get(RegisterId::sp0) as u16,
                    Opcode::Pop1 => self.registers.get(RegisterId::sp1) as u16,
                    _ => unreachable!("only load/pop opcodes reach Load0"),
                };
                bus.set_address(address);
                self.phase = Phase::Load1;
            }

            Phase::Load1 => {
                self.value = bus.data();
                bus.set_mode(BusMode::Off);
                bus.release();
                self.phase = Phase::Execute;
            }

            Phase::Execute => {
                self.execute();
            }

            Phase::Store0 => {
                bus.acquire(CPU_ID);
                bus.set_mode(BusMode::Write);
                let address = match self.opcode {
                    Opcode::StoreDirect => self.address,
                    Opcode::StoreIndexed => self.indexed_address(),
                    Opcode::Push0 => self.registers.get(RegisterId::sp0) as u16,
                    Opcode::Push1 => self.registers.get(RegisterId::sp1) as u16,
                    _ => unreachable!("only store/push opcodes reach Store0"),
                };
                bus.set_address(address);
                bus.set_data(self.registers.get(self.store_source_register()) as u16);
                self.phase = Phase::Store1;
            }

            Phase::Store1 => {
                bus.set_mode(BusMode::Off);
                bus.release();
                self.phase = Phase::Fetch0;
            }

            Phase::Halted => {}
        }
    }
}

impl Cpu {
    fn execute(&mut self) {
        match self.opcode {
            Opcode::LoadImmediate => {
                self.write_tmp(self.value as i16);
                self.r0 = RegisterId::tmp.as_nibble();
                self.phase = Phase::Fetch0;
            }

            Opcode::LoadDirect | Opcode::LoadIndexed | Opcode::Pop0 | Opcode::Pop1 => {
                self.write_tmp(self.value as i16);
                self.phase = Phase::Fetch0;
            }

            Opcode::StoreDirect | Opcode::Push0 | Opcode::Push1 => {
                self.r0 = RegisterId::tmp.as_nibble();
                self.phase = Phase::Store0;
            }

            Opcode::StoreIndexed => {
                self.phase = Phase::Store0;
            }

            Opcode::Transfer => {
                let src = RegisterId::from_nibble(self.r0);
                let tgt = RegisterId::from_nibble(self.r1);
                if tgt == RegisterId::tmp {
                    self.tmp_backup = self.registers.get(RegisterId::tmp);
                }
                let value = self.registers.get(src);
                self.registers.set(tgt, value);
                self.phase = Phase::Fetch0;
            }

            Opcode::Add => {
                let result = self.registers.get(RegisterId::sc0) + self.registers.get(RegisterId::sc1);
                self.registers.set(RegisterId::dst, result);
                self.phase = Phase::Fetch0;
            }

            Opcode::Sub => {
                let result = self.registers.get(RegisterId::sc0) - self.registers.get(RegisterId::sc1);
                self.registers.set(RegisterId::dst, result);
                self.phase = Phase::Fetch0;
            }

            Opcode::Mul => {
                let result = self.registers.get(RegisterId::sc0).wrapping_mul(self.registers.get(RegisterId::sc1));
                self.registers.set(RegisterId::dst, result);
                self.phase = Phase::Fetch0;
            }

            Opcode::DivMod => {
                let sc0 = self.registers.get(RegisterId::sc0);
                let sc1 = self.registers.get(RegisterId::sc1);
                self.registers.set(RegisterId::dst, sc0.wrapping_div(sc1));
                self.write_tmp(sc0.wrapping_rem(sc1));
                self.phase = Phase::Fetch0;
            }

            Opcode::Nand => {
                let result = !(self.registers.get(RegisterId::sc0) & self.registers.get(RegisterId::sc1));
                self.registers.set(RegisterId::dst, result);
                self.phase = Phase::Fetch0;
            }

            Opcode::Extended => {
                match self.r0 {
                    0x0 => {
                        if self.registers.get(RegisterId::cnt) <= 0 {
                            self.registers.set(RegisterId::lnk, self.ip as i16);
                            self.ip = self.registers.get(RegisterId::tmp) as u16;
                        }
                    }
                    0x1 => {
                        if self.registers.get(RegisterId::tmp) == -1 {
                            self.phase = Phase::Halted;
                            return;
                        }
                        self.registers.set(RegisterId::lnk, self.ip as i16);
                        self.ip = self.registers.get(RegisterId::tmp) as u16;
                    }
                    0x2 => {
                        let tmp = self.registers.get(RegisterId::tmp);
                        self.registers.set(RegisterId::tmp, self.tmp_backup);
                        self.tmp_backup = tmp;
                    }
                    _ => {}
                }
                self.phase = Phase::Fetch0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    fn run_to_halt(program: &[u8]) -> (Cpu, Memory) {
        let mut cpu = Cpu::new();
        let mut memory = Memory::zeroed(0, program.len().max(1));
        memory.load(0, program);
        let mut bus = Bus::default();

        for _ in 0..10_000 {
            if cpu.is_halted() {
                break;
            }
            cpu.simulate(&mut bus);
            memory.simulate(&mut bus);
        }

        (cpu, memory)
    }

    #[test]
    fn load_immediate_sets_tmp_and_advances_ip_by_three() {
        // limm 0x0005; tmp = value
        let program = [0x00, 0x00, 0x05];
        let mut cpu = Cpu::new();
        let mut memory = Memory::zeroed(0, program.len());
        memory.load(0, &program);
        let mut bus = Bus::default();

        // Drive exactly one instruction cycle (Init..Execute->Fetch0).
        for _ in 0..8 {
            cpu.simulate(&mut bus);
            memory.simulate(&mut bus);
            if cpu.phase() == Phase::Fetch0 && cpu.ip() == 3 {
                break;
            }
        }

        assert_eq!(cpu.register(RegisterId::tmp), 5);
        assert_eq!(cpu.ip(), 3);
    }

    #[test]
    fn halt_sentinel_stops_the_cpu() {
        // limm -1 (0xFFFF); jmp (extended, r0=1)
        let program = [0x00, 0xFF, 0xFF, 0x1F];
        let (cpu, _memory) = run_to_halt(&program);
        assert!(cpu.is_halted());
    }

    #[test]
    fn add_writes_dst_from_sc0_and_sc1() {
        // limm 3 -> tmp; tr tmp, sc0 (move tmp into sc0)
        // limm 4 -> tmp; tr tmp, sc1
        // add
        // halt via jmp with tmp=-1
        let program = [
            0x00, 0x00, 0x03, // limm 3
            0x05 | (4 << 4), 1, // tr tmp(4), sc0(1)
            0x00, 0x00, 0x04, // limm 4
            0x05 | (4 << 4), 2, // tr tmp(4), sc1(2)
            0x0A, // add
            0x00, 0xFF, 0xFF, // limm -1
            0x1F, // jmp/halt
        ];
        let (cpu, _memory) = run_to_halt(&program);
        assert_eq!(cpu.register(RegisterId::dst), 7);
    }
}
