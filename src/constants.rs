//! Shared numeric constants for the cs8 machine.

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 16;

/// Bus-owner id meaning "nobody holds the bus".
pub const BUS_UNOWNED: u8 = 0;

/// Bus-owner id claimed by the CPU while it drives a read or write.
pub const CPU_ID: u8 = 1;

/// Bus-owner id reserved for the first memory device in the default board layout.
pub const MEMORY_ID: u8 = 2;

/// Bus-owner id reserved for the serial port in the default board layout.
pub const SERIAL_ID: u8 = 3;
