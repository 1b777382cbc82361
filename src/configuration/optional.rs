//! Optional feature flags and battery charging.

use num_enum::{IntoPrimitive, TryFromPrimitive};

const FLAG_BATTERY_CHARGING: u16 = 0b0000_0001;
const FLAG_DISABLE_CANCEL_SESSION_UNDERRUN: u16 = 0b0000_0010;
const NOTIFICATION_SHIFT: u16 = 2;
const UNDERRUN_SHIFT: u16 = 6;

/// One of the four FIFO channels.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Channel {
    /// Channel 1.
    One,
    /// Channel 2.
    Two,
    /// Channel 3.
    Three,
    /// Channel 4.
    Four,
}

impl Channel {
    fn bit(self, shift: u16) -> u16 {
        1 << (shift + u16::from(u8::from(self)))
    }
}

/// Optional features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalFeatures {
    flags: u16,
    battery_flags: u8,
}

impl OptionalFeatures {
    pub(crate) fn new(flags: u16, battery_flags: u8) -> Self {
        Self {
            flags,
            battery_flags,
        }
    }

    pub(crate) fn into_raw(self) -> (u16, u8) {
        (self.flags, self.battery_flags)
    }

    /// Check if all optional features are disabled.
    #[must_use]
    pub fn all_disabled(&self) -> bool {
        self.flags == 0
    }

    /// Check if all optional features are enabled.
    #[must_use]
    pub fn all_enabled(&self) -> bool {
        self.flags == 0xFFFF
    }

    /// Get the battery charging configuration.
    ///
    /// If battery charging is not enabled, this will return `None`.
    #[must_use]
    pub fn battery_charging(&self) -> Option<BatteryChargingModes> {
        (self.flags & FLAG_BATTERY_CHARGING != 0)
            .then_some(BatteryChargingModes(self.battery_flags))
    }

    /// Enable battery charging detection with the given GPIO modes, or disable it.
    pub fn set_battery_charging(&mut self, modes: Option<BatteryChargingModes>) {
        match modes {
            Some(modes) => {
                self.flags |= FLAG_BATTERY_CHARGING;
                self.battery_flags = modes.0;
            }
            None => self.flags &= !FLAG_BATTERY_CHARGING,
        }
    }

    #[must_use]
    pub fn cancel_session_on_underrun_disabled(&self) -> bool {
        self.flags & FLAG_DISABLE_CANCEL_SESSION_UNDERRUN != 0
    }

    #[must_use]
    pub fn notification_enabled(&self, channel: Channel) -> bool {
        self.flags & channel.bit(NOTIFICATION_SHIFT) != 0
    }

    /// Enable or disable the data notification message for an IN channel.
    pub fn set_notification_enabled(&mut self, channel: Channel, enabled: bool) {
        self.set_flag(channel.bit(NOTIFICATION_SHIFT), enabled);
    }

    #[must_use]
    pub fn underrun_disabled(&self, channel: Channel) -> bool {
        self.flags & channel.bit(UNDERRUN_SHIFT) != 0
    }

    /// Disable or re-enable underrun handling for an IN channel.
    pub fn set_underrun_disabled(&mut self, channel: Channel, disabled: bool) {
        self.set_flag(channel.bit(UNDERRUN_SHIFT), disabled);
    }

    fn set_flag(&mut self, flag: u16, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }
}

/// Battery charging configuration.
///
/// Each two-bit field is the GPIO level pair driven when the given charger
/// type is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryChargingModes(pub u8);

impl BatteryChargingModes {
    /// Dedicated charging port.
    #[must_use]
    pub fn dcp(&self) -> u8 {
        (self.0 & 0xC0) >> 6
    }

    /// Charging downstream port.
    #[must_use]
    pub fn cdp(&self) -> u8 {
        (self.0 & 0x30) >> 4
    }

    /// Standard downstream port.
    #[must_use]
    pub fn sdp(&self) -> u8 {
        (self.0 & 0x0C) >> 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_charging_requires_flag() {
        assert_eq!(OptionalFeatures::new(0, 0xE4).battery_charging(), None);
        let modes = OptionalFeatures::new(1, 0xE4).battery_charging().unwrap();
        assert_eq!((modes.dcp(), modes.cdp(), modes.sdp()), (3, 2, 1));
    }

    #[test]
    fn per_channel_bits() {
        let mut features = OptionalFeatures::new(0, 0);
        features.set_notification_enabled(Channel::Two, true);
        features.set_underrun_disabled(Channel::Four, true);
        assert!(features.notification_enabled(Channel::Two));
        assert!(!features.notification_enabled(Channel::One));
        assert!(features.underrun_disabled(Channel::Four));
        assert_eq!(features.into_raw().0, 0b10_0000_1000);
    }

    #[test]
    fn disabling_battery_keeps_modes() {
        let mut features = OptionalFeatures::new(0x0003, 0xE4);
        features.set_battery_charging(None);
        assert_eq!(features.into_raw(), (0x0002, 0xE4));
        assert!(features.cancel_session_on_underrun_disabled());
    }
}
