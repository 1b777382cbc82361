//! The boundary between this crate and the D3XX driver.
//!
//! Everything above this module speaks in sessions, snapshots and typed
//! errors. Everything below it is a status-coded call into a driver. Two
//! drivers are provided:
//!
//! - [`NativeDriver`] calls FTDI's `libftd3xx` through the `libftd3xx-ffi`
//!   bindings.
//! - [`SimulatedDriver`] emulates a bus of `FT60x` chips in memory. It is used
//!   by this crate's tests and is available to applications that need to run
//!   without hardware.

mod native;
mod simulated;

use std::fmt::Debug;

pub use native::NativeDriver;
pub use simulated::{Call, SimHandle, SimulatedDevice, SimulatedDriver};

use crate::{ChipConfiguration, DeviceDirectory, Result};

/// How a device is identified when it is opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Position in the most recent enumeration.
    Index(usize),
    /// USB serial number.
    SerialNumber(String),
    /// USB product description.
    Description(String),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Index(index) => write!(f, "at index {index}"),
            Target::SerialNumber(serial) => write!(f, "with serial number {serial:?}"),
            Target::Description(description) => write!(f, "with description {description:?}"),
        }
    }
}

/// One entry of the driver's device table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDeviceInfo {
    /// `FT_FLAGS` bits.
    pub flags: u32,
    /// `FT_DEVICES` value.
    pub device_type: u32,
    /// Vendor ID in the upper 16 bits, product ID in the lower 16 bits.
    pub id: u32,
    /// Physical location on the bus.
    pub location_id: u32,
    /// USB serial number.
    pub serial_number: String,
    /// USB product description.
    pub description: String,
}

/// A D3XX driver.
///
/// Each method corresponds to one driver call and reports the driver's status
/// as a [`D3xxError`](crate::D3xxError). Implementations perform no
/// validation or recovery of their own.
///
/// The driver is not assumed to be thread-safe: the crate never issues two
/// calls against the same handle concurrently, and enumeration is serialized
/// by [`with_global_lock`](crate::ffi::with_global_lock).
pub trait Driver {
    /// Opaque handle to an open device.
    type Handle: Copy + Debug;

    /// The directory describing this driver's device table.
    ///
    /// Every [`D3xx`](crate::D3xx) over this driver shares it.
    fn directory(&self) -> &DeviceDirectory;

    /// `FT_GetLibraryVersion`
    fn library_version(&self) -> Result<u32>;

    /// `FT_CreateDeviceInfoList`: rescan the bus and return the device count.
    fn create_device_info_list(&self) -> Result<usize>;

    /// `FT_GetDeviceInfoList`: fetch the table built by the last rescan,
    /// which is expected to hold `count` entries. Returns the entries the
    /// driver actually filled in.
    fn device_info_list(&self, count: usize) -> Result<Vec<RawDeviceInfo>>;

    /// `FT_Create`
    fn create(&self, target: &Target) -> Result<Self::Handle>;

    /// `FT_Close`
    fn close(&self, handle: Self::Handle) -> Result<()>;

    /// `FT_GetChipConfiguration`
    fn chip_configuration(&self, handle: Self::Handle) -> Result<ChipConfiguration>;

    /// `FT_SetChipConfiguration`. `None` restores the factory defaults.
    fn set_chip_configuration(
        &self,
        handle: Self::Handle,
        config: Option<&ChipConfiguration>,
    ) -> Result<()>;

    /// `FT_GetDriverVersion`
    fn driver_version(&self, handle: Self::Handle) -> Result<u32>;

    /// `FT_ResetDevicePort`
    fn reset_device_port(&self, handle: Self::Handle) -> Result<()>;

    /// `FT_CycleDevicePort`. The handle is unusable afterwards.
    fn cycle_device_port(&self, handle: Self::Handle) -> Result<()>;
}

impl<D: Driver + ?Sized> Driver for &D {
    type Handle = D::Handle;

    fn directory(&self) -> &DeviceDirectory {
        (**self).directory()
    }

    fn library_version(&self) -> Result<u32> {
        (**self).library_version()
    }

    fn create_device_info_list(&self) -> Result<usize> {
        (**self).create_device_info_list()
    }

    fn device_info_list(&self, count: usize) -> Result<Vec<RawDeviceInfo>> {
        (**self).device_info_list(count)
    }

    fn create(&self, target: &Target) -> Result<Self::Handle> {
        (**self).create(target)
    }

    fn close(&self, handle: Self::Handle) -> Result<()> {
        (**self).close(handle)
    }

    fn chip_configuration(&self, handle: Self::Handle) -> Result<ChipConfiguration> {
        (**self).chip_configuration(handle)
    }

    fn set_chip_configuration(
        &self,
        handle: Self::Handle,
        config: Option<&ChipConfiguration>,
    ) -> Result<()> {
        (**self).set_chip_configuration(handle, config)
    }

    fn driver_version(&self, handle: Self::Handle) -> Result<u32> {
        (**self).driver_version(handle)
    }

    fn reset_device_port(&self, handle: Self::Handle) -> Result<()> {
        (**self).reset_device_port(handle)
    }

    fn cycle_device_port(&self, handle: Self::Handle) -> Result<()> {
        (**self).cycle_device_port(handle)
    }
}
