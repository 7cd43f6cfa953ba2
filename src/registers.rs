//! The 16-slot register file plus the CPU's internal pipeline latches.

use cs8_util::EnumFromStr;
use cs8_util_derive::EnumFromStr;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};

/// One of the 16 named, 16-bit signed registers a program can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive, EnumFromStr)]
#[allow(non_camel_case_types)]
pub enum RegisterId {
    /// ALU destination.
    dst = 0,
    /// ALU source 0.
    sc0 = 1,
    /// ALU source 1.
    sc1 = 2,
    /// Indexed-addressing offset.
    idx = 3,
    /// Jump target / scratch.
    tmp = 4,
    /// Stack-0 pointer.
    sp0 = 5,
    /// Stack-1 pointer.
    sp1 = 6,
    dt0 = 7,
    dt1 = 8,
    dt2 = 9,
    dt3 = 10,
    dt4 = 11,
    dt5 = 12,
    /// Link (return address).
    lnk = 13,
    /// Loop counter, controls conditional jump (`jle`).
    cnt = 14,
    /// Base, used for indexed loads.
    bse = 15,
}

impl RegisterId {
    /// Decodes a 4-bit nibble into a register id. Every value in `0..16` is valid.
    pub fn from_nibble(nibble: u8) -> RegisterId {
        FromPrimitive::from_u8(nibble & 0x0F).expect("nibble is always in range 0..16")
    }

    pub fn as_nibble(self) -> u8 {
        ToPrimitive::to_u8(&self).expect("RegisterId always fits in a nibble")
    }
}

/// A single 16-bit signed register slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Register(pub i16);

impl Register {
    pub fn get(self) -> i16 {
        self.0
    }

    pub fn set(&mut self, value: i16) {
        self.0 = value;
    }
}

/// The register file plus the CPU's internal latches that are not
/// addressable by name from assembly, but are part of the machine's state.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    slots: [Register; super::constants::REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> RegisterFile {
        RegisterFile {
            slots: [Register::default(); super::constants::REGISTER_COUNT],
        }
    }
}

impl RegisterFile {
    pub fn get(&self, id: RegisterId) -> i16 {
        self.slots[id.as_nibble() as usize].get()
    }

    pub fn set(&mut self, id: RegisterId, value: i16) {
        self.slots[id.as_nibble() as usize].set(value);
    }

    pub fn reset(&mut self) {
        self.slots = [Register::default(); super::constants::REGISTER_COUNT];
    }
}
