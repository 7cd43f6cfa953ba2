//! Bus-driven CPU, memory and serial-port emulation for the cs8 machine.

pub mod board;
pub mod bus;
pub mod constants;
pub mod cpu;
pub mod device;
pub mod memory;
pub mod registers;
pub mod serial;

pub use board::Board;
pub use bus::{Bus, BusMode};
pub use cpu::{Cpu, Opcode, Phase};
pub use device::Device;
pub use memory::Memory;
pub use registers::{Register, RegisterFile, RegisterId};
pub use serial::SerialPort;
