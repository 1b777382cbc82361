//! Output drive strength of the FIFO and GPIO pins.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{D3xxError, Result};

const DRIVE_MASK: u32 = 0b11;
const FIFO_DATA_SHIFT: u32 = 0;
const FIFO_CLOCK_SHIFT: u32 = 4;
const GPIO0_SHIFT: u32 = 8;
const GPIO1_SHIFT: u32 = 10;

/// Output impedance of a pin group.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DriveStrength {
    /// 50 ohm.
    Ohm50,
    /// 35 ohm.
    Ohm35,
    /// 25 ohm.
    Ohm25,
    /// 18 ohm.
    Ohm18,
}

/// Drive strengths held in the MSIO and GPIO control words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinDriveStrengths {
    /// FIFO data bus.
    pub fifo_data: DriveStrength,
    /// FIFO clock.
    pub fifo_clock: DriveStrength,
    /// GPIO 0.
    pub gpio0: DriveStrength,
    /// GPIO 1.
    pub gpio1: DriveStrength,
}

impl PinDriveStrengths {
    pub(crate) fn new(msio: u32, gpio: u32) -> Result<Self> {
        Ok(Self {
            fifo_data: extract("MSIO_Control", msio, FIFO_DATA_SHIFT)?,
            fifo_clock: extract("MSIO_Control", msio, FIFO_CLOCK_SHIFT)?,
            gpio0: extract("GPIO_Control", gpio, GPIO0_SHIFT)?,
            gpio1: extract("GPIO_Control", gpio, GPIO1_SHIFT)?,
        })
    }

    /// Write the drive bits into existing control words and return the new words.
    pub(crate) fn apply(&self, msio: u32, gpio: u32) -> (u32, u32) {
        let msio = insert(msio, FIFO_DATA_SHIFT, self.fifo_data);
        let msio = insert(msio, FIFO_CLOCK_SHIFT, self.fifo_clock);
        let gpio = insert(gpio, GPIO0_SHIFT, self.gpio0);
        let gpio = insert(gpio, GPIO1_SHIFT, self.gpio1);
        (msio, gpio)
    }
}

fn extract(field: &'static str, word: u32, shift: u32) -> Result<DriveStrength> {
    // two bits always decode, the error path only guards the enum width
    #[allow(clippy::cast_possible_truncation)]
    let bits = ((word >> shift) & DRIVE_MASK) as u8;
    DriveStrength::try_from(bits).or(Err(D3xxError::InvalidField { field, value: word }))
}

fn insert(word: u32, shift: u32, strength: DriveStrength) -> u32 {
    (word & !(DRIVE_MASK << shift)) | (u32::from(u8::from(strength)) << shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode() {
        let strengths = PinDriveStrengths::new(0x0000_0031, 0x0000_0E00).unwrap();
        assert_eq!(strengths.fifo_data, DriveStrength::Ohm35);
        assert_eq!(strengths.fifo_clock, DriveStrength::Ohm18);
        assert_eq!(strengths.gpio0, DriveStrength::Ohm25);
        assert_eq!(strengths.gpio1, DriveStrength::Ohm18);
    }

    #[test]
    fn apply_keeps_other_bits() {
        let strengths = PinDriveStrengths {
            fifo_data: DriveStrength::Ohm18,
            fifo_clock: DriveStrength::Ohm50,
            gpio0: DriveStrength::Ohm50,
            gpio1: DriveStrength::Ohm35,
        };
        let (msio, gpio) = strengths.apply(0xFFFF_FFFF, 0x8000_0000);
        assert_eq!(msio, 0xFFFF_FFCF);
        assert_eq!(gpio, 0x8000_0400);
        assert_eq!(PinDriveStrengths::new(msio, gpio).unwrap(), strengths);
    }
}
