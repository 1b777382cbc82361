//! FIFO clock, FIFO mode and channel layout.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{D3xxError, Result};

/// Configuration regarding data transfer.
///
/// This configuration contains:
/// - FIFO clock speed
/// - FIFO mode
/// - Channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTransferConfig {
    fifo_clock: FifoClock,
    fifo_mode: FifoMode,
    channel_config: ChannelConfiguration,
}

impl DataTransferConfig {
    pub(crate) fn new(fifo_clock: u8, fifo_mode: u8, channel_config: u8) -> Result<Self> {
        Ok(Self {
            fifo_clock: FifoClock::try_from(fifo_clock)
                .or(Err(invalid("FIFOClock", fifo_clock)))?,
            fifo_mode: FifoMode::try_from(fifo_mode).or(Err(invalid("FIFOMode", fifo_mode)))?,
            channel_config: ChannelConfiguration::try_from(channel_config)
                .or(Err(invalid("ChannelConfig", channel_config)))?,
        })
    }

    pub(crate) fn into_raw(self) -> (u8, u8, u8) {
        (
            self.fifo_clock.into(),
            self.fifo_mode.into(),
            self.channel_config.into(),
        )
    }

    /// Get the FIFO clock speed.
    #[must_use]
    pub fn fifo_clock(&self) -> FifoClock {
        self.fifo_clock
    }

    /// Set the FIFO clock speed.
    pub fn set_fifo_clock(&mut self, clock: FifoClock) {
        self.fifo_clock = clock;
    }

    /// Get the FIFO mode.
    #[must_use]
    pub fn fifo_mode(&self) -> FifoMode {
        self.fifo_mode
    }

    /// Set the FIFO mode.
    pub fn set_fifo_mode(&mut self, mode: FifoMode) {
        self.fifo_mode = mode;
    }

    /// Get the channel configuration.
    #[must_use]
    pub fn channel_config(&self) -> ChannelConfiguration {
        self.channel_config
    }

    /// Set the channel configuration.
    pub fn set_channel_config(&mut self, config: ChannelConfiguration) {
        self.channel_config = config;
    }
}

fn invalid(field: &'static str, value: u8) -> D3xxError {
    D3xxError::InvalidField {
        field,
        value: value.into(),
    }
}

/// FIFO mode.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FifoMode {
    /// 245 FIFO mode.
    Mode245,
    /// 600 FIFO mode (default).
    Mode600,
}

/// FIFO clock speed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FifoClock {
    /// 100 MHz clock speed.
    Clock100Mhz,
    /// 66 MHz clock speed.
    Clock66Mhz,
    /// 50 MHz clock speed.
    Clock50Mhz,
    /// 40 MHz clock speed.
    Clock40Mhz,
}

impl FifoClock {
    /// Clock frequency in MHz.
    #[must_use]
    pub fn mhz(self) -> u32 {
        match self {
            FifoClock::Clock100Mhz => 100,
            FifoClock::Clock66Mhz => 66,
            FifoClock::Clock50Mhz => 50,
            FifoClock::Clock40Mhz => 40,
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ChannelConfiguration {
    /// Four OUT and four IN pipes.
    Four,
    /// Two OUT and two IN pipes.
    Two,
    /// One OUT and one IN pipe.
    One,
    /// One OUT pipe only.
    OneOutPipe,
    /// One IN pipe only.
    OneInPipe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode() {
        let config = DataTransferConfig::new(1, 1, 2).unwrap();
        assert_eq!(config.fifo_clock(), FifoClock::Clock66Mhz);
        assert_eq!(config.fifo_clock().mhz(), 66);
        assert_eq!(config.fifo_mode(), FifoMode::Mode600);
        assert_eq!(config.channel_config(), ChannelConfiguration::One);
    }

    #[test]
    fn undecodable_values_name_the_field() {
        let err = DataTransferConfig::new(0, 0, 9).unwrap_err();
        assert_eq!(
            err,
            D3xxError::InvalidField {
                field: "ChannelConfig",
                value: 9
            }
        );
        let err = DataTransferConfig::new(7, 0, 0).unwrap_err();
        assert!(matches!(err, D3xxError::InvalidField { field: "FIFOClock", .. }));
    }

    #[test]
    fn edit_and_encode() {
        let mut config = DataTransferConfig::new(0, 0, 0).unwrap();
        config.set_fifo_clock(FifoClock::Clock40Mhz);
        config.set_fifo_mode(FifoMode::Mode600);
        config.set_channel_config(ChannelConfiguration::OneInPipe);
        assert_eq!(config.into_raw(), (3, 1, 4));
    }
}
