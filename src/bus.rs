//! The shared bus: a single latched record of address, data, mode and
//! owner, mutated by whichever device ticks next within a clock cycle.

use crate::constants::BUS_UNOWNED;

/// The direction a device has requested the bus to operate in, or `Off` when
/// nothing is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    Read,
    Write,
    Off,
}

/// The rendezvous every [`Device`](crate::device::Device) observes and, while
/// it owns the bus, mutates.
///
/// There is no queueing and no synchronization: devices run one at a time
/// within a [tick](crate::board::Board::tick), so a device that sets bus
/// state on tick `T` is visible to every device invoked later on the same
/// tick.
#[derive(Debug, Clone, Copy)]
pub struct Bus {
    data: u16,
    address: u16,
    mode: BusMode,
    owner: u8,
}

impl Default for Bus {
    fn default() -> Bus {
        Bus {
            data: 0,
            address: 0,
            mode: BusMode::Off,
            owner: BUS_UNOWNED,
        }
    }
}

impl Bus {
    pub fn data(&self) -> u16 {
        self.data
    }

    pub fn set_data(&mut self, value: u16) {
        self.data = value;
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn set_address(&mut self, value: u16) {
        self.address = value;
    }

    pub fn mode(&self) -> BusMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: BusMode) {
        self.mode = mode;
    }

    pub fn owner(&self) -> u8 {
        self.owner
    }

    /// Claims the bus for `owner`. Only the device that owns the bus is
    /// permitted to mutate it further until it releases ownership.
    pub fn acquire(&mut self, owner: u8) {
        self.owner = owner;
    }

    /// Releases ownership, resetting it to [`BUS_UNOWNED`].
    pub fn release(&mut self) {
        self.owner = BUS_UNOWNED;
        self.mode = BusMode::Off;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unowned_and_off() {
        let bus = Bus::default();
        assert_eq!(bus.owner(), BUS_UNOWNED);
        assert_eq!(bus.mode(), BusMode::Off);
    }

    #[test]
    fn acquire_then_release_resets_owner_and_mode() {
        let mut bus = Bus::default();
        bus.acquire(7);
        bus.set_mode(BusMode::Read);
        assert_eq!(bus.owner(), 7);

        bus.release();
        assert_eq!(bus.owner(), BUS_UNOWNED);
        assert_eq!(bus.mode(), BusMode::Off);
    }

    #[test]
    fn write_then_read_round_trips_through_the_latch() {
        let mut bus = Bus::default();
        bus.set_address(42);
        bus.set_data(0xBEEF);
        assert_eq!(bus.address(), 42);
        assert_eq!(bus.data(), 0xBEEF);
    }
}
