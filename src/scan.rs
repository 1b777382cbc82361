use std::time::Instant;

use num_enum::{FromPrimitive, IntoPrimitive};

use crate::driver::RawDeviceInfo;

const FLAG_OPENED: u32 = 0x1;
const FLAG_HISPEED: u32 = 0x2;
const FLAG_SUPERSPEED: u32 = 0x4;

/// Chip type reported in the device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum DeviceType {
    /// Unknown or unsupported chip.
    #[num_enum(default)]
    Unknown = 3,
    /// `FT600`, 16-bit FIFO bus.
    Ft600 = 600,
    /// `FT601`, 32-bit FIFO bus.
    Ft601 = 601,
}

/// One device from an enumeration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    index: usize,
    flags: u32,
    device_type: DeviceType,
    id: u32,
    location_id: u32,
    serial_number: String,
    description: String,
}

impl DeviceInfo {
    pub(crate) fn new(index: usize, raw: RawDeviceInfo) -> Self {
        Self {
            index,
            flags: raw.flags,
            device_type: DeviceType::from(raw.device_type),
            id: raw.id,
            location_id: raw.location_id,
            serial_number: raw.serial_number,
            description: raw.description,
        }
    }

    /// Position in the snapshot this entry came from.
    ///
    /// Only meaningful while the snapshot is current.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the device was open in some session when the snapshot was taken.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.flags & FLAG_OPENED != 0
    }

    /// Whether the device is attached at USB 2.0 high speed.
    #[must_use]
    pub fn is_hispeed(&self) -> bool {
        self.flags & FLAG_HISPEED != 0
    }

    /// Whether the device is attached at USB 3.0 super speed.
    #[must_use]
    pub fn is_superspeed(&self) -> bool {
        self.flags & FLAG_SUPERSPEED != 0
    }

    /// Raw `FT_FLAGS` bits.
    #[must_use]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Chip type.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// USB vendor ID.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn vendor_id(&self) -> u16 {
        (self.id >> 16) as u16
    }

    /// USB product ID.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn product_id(&self) -> u16 {
        self.id as u16
    }

    /// Physical location on the bus.
    #[must_use]
    pub fn location_id(&self) -> u32 {
        self.location_id
    }

    /// Serial number. Stable across re-enumeration.
    #[must_use]
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// USB product description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// An immutable enumeration snapshot.
///
/// Every rescan, and every port cycle, starts a new generation. A list from an
/// older generation still holds valid identity data (serial numbers,
/// descriptions) but its indices must not be used to open devices.
#[derive(Debug, Clone)]
pub struct DeviceList {
    generation: u64,
    captured_at: Instant,
    devices: Vec<DeviceInfo>,
}

impl DeviceList {
    pub(crate) fn new(generation: u64, raw: Vec<RawDeviceInfo>) -> Self {
        Self {
            generation,
            captured_at: Instant::now(),
            devices: raw
                .into_iter()
                .enumerate()
                .map(|(index, info)| DeviceInfo::new(index, info))
                .collect(),
        }
    }

    /// Generation of the directory this snapshot was taken in.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the snapshot was taken.
    #[must_use]
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Number of devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no device was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DeviceInfo> {
        self.devices.get(index)
    }

    /// Look up a device by serial number.
    #[must_use]
    pub fn by_serial_number(&self, serial_number: &str) -> Option<&DeviceInfo> {
        self.devices
            .iter()
            .find(|device| device.serial_number == serial_number)
    }

    /// Look up a device by description.
    #[must_use]
    pub fn by_description(&self, description: &str) -> Option<&DeviceInfo> {
        self.devices
            .iter()
            .find(|device| device.description == description)
    }

    /// Iterate over the devices in enumeration order.
    pub fn iter(&self) -> std::slice::Iter<'_, DeviceInfo> {
        self.devices.iter()
    }
}

impl std::ops::Index<usize> for DeviceList {
    type Output = DeviceInfo;

    fn index(&self, index: usize) -> &Self::Output {
        &self.devices[index]
    }
}

impl IntoIterator for DeviceList {
    type Item = DeviceInfo;
    type IntoIter = std::vec::IntoIter<DeviceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_iter()
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a DeviceInfo;
    type IntoIter = std::slice::Iter<'a, DeviceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
