use std::{
    ffi::{c_void, CStr, CString},
    ptr::addr_of_mut,
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::trace;

use super::{Driver, RawDeviceInfo, Target};
use crate::{ffi, try_d3xx, ChipConfiguration, D3xxError, DeviceDirectory, Result};

/// The driver keeps one device table per process.
static DIRECTORY: DeviceDirectory = DeviceDirectory::new();

/// Length of the driver's device table as of the last rescan.
///
/// Held across both enumeration calls, so the table cannot grow between
/// sizing the buffer and the driver filling it in.
static TABLE_LEN: Mutex<usize> = Mutex::new(0);

fn table_len() -> MutexGuard<'static, usize> {
    TABLE_LEN.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The D3XX driver installed on this machine, reached through `libftd3xx`.
///
/// The [D3XX driver](https://ftdichip.com/drivers/d3xx-drivers/) must be
/// installed for any call other than [`Driver::library_version`] to find
/// devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDriver;

#[allow(clippy::unnecessary_cast, clippy::cast_possible_truncation)]
impl Driver for NativeDriver {
    type Handle = ffi::FT_HANDLE;

    fn directory(&self) -> &DeviceDirectory {
        &DIRECTORY
    }

    fn library_version(&self) -> Result<u32> {
        let mut version = 0;
        trace!("FT_GetLibraryVersion");
        try_d3xx!(unsafe { ffi::FT_GetLibraryVersion(addr_of_mut!(version)) })?;
        Ok(version as u32)
    }

    fn create_device_info_list(&self) -> Result<usize> {
        let mut table_len = table_len();
        // the count's width differs between platforms
        let mut num_devices = 0;
        trace!("FT_CreateDeviceInfoList");
        try_d3xx!(unsafe { ffi::FT_CreateDeviceInfoList(addr_of_mut!(num_devices)) })?;
        *table_len = num_devices as usize;
        Ok(*table_len)
    }

    fn device_info_list(&self, count: usize) -> Result<Vec<RawDeviceInfo>> {
        let table_len = table_len();
        // FT_GetDeviceInfoList takes no capacity and writes the whole table
        let mut nodes = vec![ffi::FT_DEVICE_LIST_INFO_NODE::default(); count.max(*table_len)];
        let mut num_devices = 0;
        trace!("FT_GetDeviceInfoList({count}, table of {})", *table_len);
        try_d3xx!(unsafe {
            ffi::FT_GetDeviceInfoList(nodes.as_mut_ptr(), addr_of_mut!(num_devices))
        })?;
        nodes.truncate((num_devices as usize).min(nodes.len()));
        Ok(nodes.into_iter().map(RawDeviceInfo::from).collect())
    }

    fn create(&self, target: &Target) -> Result<Self::Handle> {
        let mut handle: ffi::FT_HANDLE = std::ptr::null_mut();
        trace!("FT_Create({target})");
        match target {
            Target::Index(index) => {
                // the index itself is passed in place of the pointer argument
                try_d3xx!(unsafe {
                    ffi::FT_Create(*index as *mut c_void, ffi::FT_OPEN_BY_INDEX, &mut handle)
                })?;
            }
            Target::SerialNumber(serial) => {
                let serial = to_cstring("serial number", serial)?;
                try_d3xx!(unsafe {
                    ffi::FT_Create(
                        serial.as_ptr() as *mut c_void,
                        ffi::FT_OPEN_BY_SERIAL_NUMBER,
                        &mut handle,
                    )
                })?;
            }
            Target::Description(description) => {
                let description = to_cstring("description", description)?;
                try_d3xx!(unsafe {
                    ffi::FT_Create(
                        description.as_ptr() as *mut c_void,
                        ffi::FT_OPEN_BY_DESCRIPTION,
                        &mut handle,
                    )
                })?;
            }
        }
        if handle.is_null() {
            Err(D3xxError::from(crate::Status::DeviceNotFound))
        } else {
            Ok(handle)
        }
    }

    fn close(&self, handle: Self::Handle) -> Result<()> {
        trace!("FT_Close({handle:?})");
        try_d3xx!(unsafe { ffi::FT_Close(handle) })
    }

    fn chip_configuration(&self, handle: Self::Handle) -> Result<ChipConfiguration> {
        let mut config = ffi::FT_60XCONFIGURATION::default();
        trace!("FT_GetChipConfiguration({handle:?})");
        try_d3xx!(unsafe { ffi::FT_GetChipConfiguration(handle, addr_of_mut!(config).cast()) })?;
        Ok(ChipConfiguration::from(config))
    }

    fn set_chip_configuration(
        &self,
        handle: Self::Handle,
        config: Option<&ChipConfiguration>,
    ) -> Result<()> {
        trace!("FT_SetChipConfiguration({handle:?}, default: {})", config.is_none());
        match config {
            Some(config) => {
                let mut raw = ffi::FT_60XCONFIGURATION::from(*config);
                try_d3xx!(unsafe {
                    ffi::FT_SetChipConfiguration(handle, addr_of_mut!(raw).cast())
                })
            }
            None => try_d3xx!(unsafe {
                ffi::FT_SetChipConfiguration(handle, std::ptr::null_mut())
            }),
        }
    }

    fn driver_version(&self, handle: Self::Handle) -> Result<u32> {
        let mut version = 0;
        trace!("FT_GetDriverVersion({handle:?})");
        try_d3xx!(unsafe { ffi::FT_GetDriverVersion(handle, addr_of_mut!(version)) })?;
        Ok(version as u32)
    }

    fn reset_device_port(&self, handle: Self::Handle) -> Result<()> {
        trace!("FT_ResetDevicePort({handle:?})");
        try_d3xx!(unsafe { ffi::FT_ResetDevicePort(handle) })
    }

    fn cycle_device_port(&self, handle: Self::Handle) -> Result<()> {
        trace!("FT_CycleDevicePort({handle:?})");
        try_d3xx!(unsafe { ffi::FT_CycleDevicePort(handle) })
    }
}

fn to_cstring(what: &'static str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| D3xxError::InvalidArgument {
        what,
        reason: "contains a NUL byte".to_owned(),
    })
}

#[allow(clippy::unnecessary_cast)]
impl From<ffi::FT_DEVICE_LIST_INFO_NODE> for RawDeviceInfo {
    fn from(info: ffi::FT_DEVICE_LIST_INFO_NODE) -> Self {
        // SAFETY: the strings are guaranteed to be non-null and null-terminated
        let serial_number = unsafe { CStr::from_ptr(info.SerialNumber.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        let description = unsafe { CStr::from_ptr(info.Description.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        Self {
            flags: info.Flags as u32,
            device_type: info.Type as u32,
            id: info.ID as u32,
            location_id: info.LocId as u32,
            serial_number,
            description,
        }
    }
}

#[allow(clippy::unnecessary_cast, clippy::cast_possible_truncation)]
impl From<ffi::FT_60XCONFIGURATION> for ChipConfiguration {
    fn from(config: ffi::FT_60XCONFIGURATION) -> Self {
        Self {
            vendor_id: config.VendorID,
            product_id: config.ProductID,
            string_descriptors: config.StringDescriptors,
            interval: config.bInterval,
            power_attributes: config.PowerAttributes,
            power_consumption: config.PowerConsumption,
            reserved2: config.Reserved2,
            fifo_clock: config.FIFOClock,
            fifo_mode: config.FIFOMode,
            channel_config: config.ChannelConfig,
            optional_feature_support: config.OptionalFeatureSupport,
            battery_charging_gpio_config: config.BatteryChargingGPIOConfig,
            flash_eeprom_detection: config.FlashEEPROMDetection,
            msio_control: (config.MSIO_Control as u32).to_le_bytes(),
            gpio_control: (config.GPIO_Control as u32).to_le_bytes(),
        }
    }
}

impl From<ChipConfiguration> for ffi::FT_60XCONFIGURATION {
    fn from(config: ChipConfiguration) -> Self {
        Self {
            VendorID: config.vendor_id,
            ProductID: config.product_id,
            StringDescriptors: config.string_descriptors,
            bInterval: config.interval,
            PowerAttributes: config.power_attributes,
            PowerConsumption: config.power_consumption,
            Reserved2: config.reserved2,
            FIFOClock: config.fifo_clock,
            FIFOMode: config.fifo_mode,
            ChannelConfig: config.channel_config,
            OptionalFeatureSupport: config.optional_feature_support,
            BatteryChargingGPIOConfig: config.battery_charging_gpio_config,
            FlashEEPROMDetection: config.flash_eeprom_detection,
            MSIO_Control: ffi::ULONG::from(config.msio_control_word()),
            GPIO_Control: ffi::ULONG::from(config.gpio_control_word()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffi_configuration_conversion_is_lossless() {
        let mut config = ChipConfiguration::default();
        config.vendor_id = 0x0403;
        config.product_id = 0x601F;
        config.string_descriptors[17] = 0x42;
        config.reserved2 = 0x5A;
        config.msio_control = [1, 2, 3, 4];
        config.gpio_control = [0, 0, 0, 0x80];
        let raw = ffi::FT_60XCONFIGURATION::from(config);
        assert_eq!(raw.Reserved2, 0x5A);
        assert_eq!(ChipConfiguration::from(raw), config);
    }

    #[test]
    #[cfg_attr(not(feature = "hardware-tests"), ignore)]
    fn library_version_needs_no_device() {
        // the library is linked statically or dynamically; either way the
        // version query does not touch the bus
        let version = NativeDriver.library_version();
        assert!(version.is_ok(), "{version:?}");
    }
}
