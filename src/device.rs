//! The device contract every bus participant implements.

use crate::bus::Bus;

/// A single participant on the [`Bus`]. Devices are ticked once per clock
/// cycle, in a fixed order chosen by whoever owns the [`Board`](crate::board::Board).
///
/// `simulate` may read the bus freely; it may only write to it while it
/// holds ownership (acquired via [`Bus::acquire`]), except for the
/// responding devices (memory, serial) which set `data` on a read without
/// taking ownership.
pub trait Device {
    /// Called once before the first tick. The default implementation does
    /// nothing.
    fn init(&mut self, _bus: &mut Bus) {}

    /// Called once per clock tick.
    fn simulate(&mut self, bus: &mut Bus);
}
