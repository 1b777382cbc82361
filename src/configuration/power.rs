//! Bus/self power and maximum current.

const FLAG_REMOTE_WAKEUP: u8 = 0x20;
const FLAG_SELF_POWERED: u8 = 0x40;

/// Power configuration contained in the configuration descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerConfig {
    flags: u8,
    max_power: u16,
}

impl PowerConfig {
    pub(crate) fn new(flags: u8, max_power: u16) -> Self {
        Self { flags, max_power }
    }

    pub(crate) fn into_raw(self) -> (u8, u16) {
        (self.flags, self.max_power)
    }

    /// Check if the device is bus-powered.
    #[must_use]
    pub fn bus_powered(&self) -> bool {
        !self.self_powered()
    }

    /// Check if the device is self-powered.
    #[must_use]
    pub fn self_powered(&self) -> bool {
        self.flags & FLAG_SELF_POWERED != 0
    }

    /// Mark the device as self-powered or bus-powered.
    pub fn set_self_powered(&mut self, self_powered: bool) {
        self.set_flag(FLAG_SELF_POWERED, self_powered);
    }

    /// Check if the device supports remote wakeup.
    ///
    /// Remote wakeup is a feature of some USB devices that allows them to
    /// "wake up" while suspended (in power-saving mode) when an external event
    /// occurs. Examples of such devices include keyboards and mice.
    #[must_use]
    pub fn remote_wakeup(&self) -> bool {
        self.flags & FLAG_REMOTE_WAKEUP != 0
    }

    /// Enable or disable remote wakeup.
    pub fn set_remote_wakeup(&mut self, enabled: bool) {
        self.set_flag(FLAG_REMOTE_WAKEUP, enabled);
    }

    /// Get the maximum power consumption in milliamps.
    #[must_use]
    pub fn max_power(&self) -> u32 {
        u32::from(self.max_power) * 2 // 2mA units
    }

    /// Set the maximum power consumption in milliamps, rounded down to 2 mA.
    ///
    /// Values above what the field can hold saturate.
    pub fn set_max_power(&mut self, milliamps: u32) {
        self.max_power = u16::try_from(milliamps / 2).unwrap_or(u16::MAX);
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_flags() {
        let power = PowerConfig::new(0xE0, 0x60);
        assert!(power.self_powered());
        assert!(power.remote_wakeup());
        assert_eq!(power.max_power(), 192);
    }

    #[test]
    fn edits_keep_unrelated_bits() {
        let mut power = PowerConfig::new(0x80, 0);
        power.set_self_powered(true);
        power.set_max_power(500);
        assert_eq!(power.into_raw(), (0xC0, 250));
        power.set_self_powered(false);
        assert!(power.bus_powered());
        assert_eq!(power.into_raw().0, 0x80);
    }
}
