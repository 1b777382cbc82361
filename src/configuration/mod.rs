//! `FT60x` chip configuration.
//!
//! [`ChipConfiguration`] mirrors the persistent EEPROM record of the chip
//! field for field. It is a plain value: reading it from a device produces an
//! independent snapshot, and nothing is written back unless
//! [`Session::set_chip_configuration`](crate::Session::set_chip_configuration)
//! is called explicitly.
//!
//! The raw fields are public so a record read from a device can be written
//! back byte for byte, including fields this crate attaches no meaning to.
//! The submodules provide decoded views over groups of fields.

pub mod data_transfer;
pub mod optional;
pub mod pin_drive;
pub mod power;
pub mod string_descriptor;

use crate::{D3xxError, Result};

use self::{
    data_transfer::DataTransferConfig, optional::OptionalFeatures, pin_drive::PinDriveStrengths,
    power::PowerConfig, string_descriptor::StringDescriptor,
};

/// Size of the string descriptor block in bytes.
pub const STRING_DESCRIPTORS_LEN: usize = 128;

/// Size of each control word array in bytes.
pub const CONTROL_LEN: usize = 4;

/// Size of the encoded record in bytes.
pub const CONFIGURATION_LEN: usize = 152;

/// Canonical field names in layout order.
pub const FIELD_NAMES: [&str; 15] = [
    "VendorID",
    "ProductID",
    "StringDescriptors",
    "bInterval",
    "PowerAttributes",
    "PowerConsumption",
    "Reserved2",
    "FIFOClock",
    "FIFOMode",
    "ChannelConfig",
    "OptionalFeatureSupport",
    "BatteryChargingGPIOConfig",
    "FlashEEPROMDetection",
    "MSIO_Control",
    "GPIO_Control",
];

/// `FT60x` chip configuration record.
///
/// `Default` yields an all-zero record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChipConfiguration {
    /// USB vendor ID.
    pub vendor_id: u16,
    /// USB product ID.
    pub product_id: u16,
    /// Manufacturer, product and serial number descriptors, back to back.
    pub string_descriptors: [u8; STRING_DESCRIPTORS_LEN],
    /// Interrupt endpoint polling interval.
    pub interval: u8,
    /// Configuration descriptor `bmAttributes`.
    pub power_attributes: u8,
    /// Maximum power in 2 mA units.
    pub power_consumption: u16,
    /// Reserved. Carried verbatim.
    pub reserved2: u8,
    /// FIFO clock selection.
    pub fifo_clock: u8,
    /// FIFO bus mode.
    pub fifo_mode: u8,
    /// Channel layout.
    pub channel_config: u8,
    /// Optional feature flags.
    pub optional_feature_support: u16,
    /// Battery charging GPIO assignment.
    pub battery_charging_gpio_config: u8,
    /// Flash/EEPROM detection result (read-only on the chip).
    pub flash_eeprom_detection: u8,
    /// Little-endian image of the MSIO control word.
    pub msio_control: [u8; CONTROL_LEN],
    /// Little-endian image of the GPIO control word.
    pub gpio_control: [u8; CONTROL_LEN],
}

impl Default for ChipConfiguration {
    fn default() -> Self {
        Self {
            vendor_id: 0,
            product_id: 0,
            string_descriptors: [0; STRING_DESCRIPTORS_LEN],
            interval: 0,
            power_attributes: 0,
            power_consumption: 0,
            reserved2: 0,
            fifo_clock: 0,
            fifo_mode: 0,
            channel_config: 0,
            optional_feature_support: 0,
            battery_charging_gpio_config: 0,
            flash_eeprom_detection: 0,
            msio_control: [0; CONTROL_LEN],
            gpio_control: [0; CONTROL_LEN],
        }
    }
}

/// Value of one configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Scalar field, widened to `u32`.
    Scalar(u32),
    /// Fixed-length array field.
    Array(&'a [u8]),
}

impl FieldValue<'_> {
    /// Whether the field is zero (every element, for arrays).
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Scalar(value) => *value == 0,
            FieldValue::Array(values) => values.iter().all(|&b| b == 0),
        }
    }
}

impl ChipConfiguration {
    /// Decode a record from its 152-byte little-endian image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CONFIGURATION_LEN {
            return Err(D3xxError::InvalidArgument {
                what: "configuration image",
                reason: format!("expected {CONFIGURATION_LEN} bytes, got {}", bytes.len()),
            });
        }
        let u16_at = |offset: usize| u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        let mut string_descriptors = [0u8; STRING_DESCRIPTORS_LEN];
        string_descriptors.copy_from_slice(&bytes[4..132]);
        let mut msio_control = [0u8; CONTROL_LEN];
        msio_control.copy_from_slice(&bytes[144..148]);
        let mut gpio_control = [0u8; CONTROL_LEN];
        gpio_control.copy_from_slice(&bytes[148..152]);
        Ok(Self {
            vendor_id: u16_at(0),
            product_id: u16_at(2),
            string_descriptors,
            interval: bytes[132],
            power_attributes: bytes[133],
            power_consumption: u16_at(134),
            reserved2: bytes[136],
            fifo_clock: bytes[137],
            fifo_mode: bytes[138],
            channel_config: bytes[139],
            optional_feature_support: u16_at(140),
            battery_charging_gpio_config: bytes[142],
            flash_eeprom_detection: bytes[143],
            msio_control,
            gpio_control,
        })
    }

    /// Encode the record into its 152-byte little-endian image.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; CONFIGURATION_LEN] {
        let mut bytes = [0u8; CONFIGURATION_LEN];
        bytes[0..2].copy_from_slice(&self.vendor_id.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.product_id.to_le_bytes());
        bytes[4..132].copy_from_slice(&self.string_descriptors);
        bytes[132] = self.interval;
        bytes[133] = self.power_attributes;
        bytes[134..136].copy_from_slice(&self.power_consumption.to_le_bytes());
        bytes[136] = self.reserved2;
        bytes[137] = self.fifo_clock;
        bytes[138] = self.fifo_mode;
        bytes[139] = self.channel_config;
        bytes[140..142].copy_from_slice(&self.optional_feature_support.to_le_bytes());
        bytes[142] = self.battery_charging_gpio_config;
        bytes[143] = self.flash_eeprom_detection;
        bytes[144..148].copy_from_slice(&self.msio_control);
        bytes[148..152].copy_from_slice(&self.gpio_control);
        bytes
    }

    /// All fields with their canonical names, in layout order.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, FieldValue<'_>); 15] {
        use FieldValue::{Array, Scalar};
        let values = [
            Scalar(self.vendor_id.into()),
            Scalar(self.product_id.into()),
            Array(&self.string_descriptors),
            Scalar(self.interval.into()),
            Scalar(self.power_attributes.into()),
            Scalar(self.power_consumption.into()),
            Scalar(self.reserved2.into()),
            Scalar(self.fifo_clock.into()),
            Scalar(self.fifo_mode.into()),
            Scalar(self.channel_config.into()),
            Scalar(self.optional_feature_support.into()),
            Scalar(self.battery_charging_gpio_config.into()),
            Scalar(self.flash_eeprom_detection.into()),
            Array(&self.msio_control),
            Array(&self.gpio_control),
        ];
        let mut names = FIELD_NAMES.into_iter();
        values.map(|value| (names.next().unwrap_or_default(), value))
    }

    /// Names of the fields whose values differ between `self` and `other`.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .zip(other.fields())
            .filter(|((_, a), (_, b))| a != b)
            .map(|((name, _), _)| name)
            .collect()
    }

    /// The MSIO control word.
    #[must_use]
    pub fn msio_control_word(&self) -> u32 {
        u32::from_le_bytes(self.msio_control)
    }

    /// The GPIO control word.
    #[must_use]
    pub fn gpio_control_word(&self) -> u32 {
        u32::from_le_bytes(self.gpio_control)
    }

    /// Decoded string descriptors.
    #[must_use]
    pub fn string_descriptor(&self) -> StringDescriptor {
        StringDescriptor::new(&self.string_descriptors)
    }

    /// Replace the string descriptor block.
    pub fn set_string_descriptor(&mut self, descriptor: &StringDescriptor) {
        self.string_descriptors = descriptor.as_ffi_descriptor();
    }

    /// Power attributes and consumption.
    #[must_use]
    pub fn power_config(&self) -> PowerConfig {
        PowerConfig::new(self.power_attributes, self.power_consumption)
    }

    /// Replace the power attributes and consumption.
    pub fn set_power_config(&mut self, power: PowerConfig) {
        (self.power_attributes, self.power_consumption) = power.into_raw();
    }

    /// FIFO clock, FIFO mode and channel layout.
    pub fn data_transfer(&self) -> Result<DataTransferConfig> {
        DataTransferConfig::new(self.fifo_clock, self.fifo_mode, self.channel_config)
    }

    /// Replace the FIFO clock, FIFO mode and channel layout.
    pub fn set_data_transfer(&mut self, config: DataTransferConfig) {
        (self.fifo_clock, self.fifo_mode, self.channel_config) = config.into_raw();
    }

    /// Optional feature flags and battery charging modes.
    #[must_use]
    pub fn optional_features(&self) -> OptionalFeatures {
        OptionalFeatures::new(
            self.optional_feature_support,
            self.battery_charging_gpio_config,
        )
    }

    /// Replace the optional feature flags and battery charging modes.
    pub fn set_optional_features(&mut self, features: OptionalFeatures) {
        (
            self.optional_feature_support,
            self.battery_charging_gpio_config,
        ) = features.into_raw();
    }

    /// Pin drive strengths decoded from the MSIO and GPIO control words.
    pub fn pin_drive_strengths(&self) -> Result<PinDriveStrengths> {
        PinDriveStrengths::new(self.msio_control_word(), self.gpio_control_word())
    }

    /// Update the drive strength bits of the control words. Other bits are kept.
    pub fn set_pin_drive_strengths(&mut self, strengths: &PinDriveStrengths) {
        let (msio, gpio) =
            strengths.apply(self.msio_control_word(), self.gpio_control_word());
        self.msio_control = msio.to_le_bytes();
        self.gpio_control = gpio.to_le_bytes();
    }
}
