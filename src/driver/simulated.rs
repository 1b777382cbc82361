use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::{debug, trace};

use super::{Driver, RawDeviceInfo, Target};
use crate::{
    configuration::CONFIGURATION_LEN, scan::DeviceType, ChipConfiguration, D3xxError,
    DeviceDirectory, Result, Status,
};

const LIBRARY_VERSION: u32 = 0x0100_0016;
const DRIVER_VERSION: u32 = 0x0103_0004;

const FLAG_OPENED: u32 = 0x1;
const FLAG_SUPERSPEED: u32 = 0x4;

/// Driver calls that can be made to fail with [`SimulatedDriver::fail_next`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    LibraryVersion,
    CreateDeviceInfoList,
    DeviceInfoList,
    Create,
    Close,
    ChipConfiguration,
    SetChipConfiguration,
    DriverVersion,
    ResetDevicePort,
    CycleDevicePort,
}

/// Handle issued by the [`SimulatedDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimHandle(u32);

/// A chip attached to the simulated bus.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    serial_number: String,
    description: String,
    vendor_id: u16,
    product_id: u16,
    device_type: DeviceType,
    location_id: u32,
    driver_version: u32,
    factory: [u8; CONFIGURATION_LEN],
}

impl SimulatedDevice {
    /// An `FT601` with the given serial number and an unprogrammed (all-zero)
    /// configuration.
    #[must_use]
    pub fn new(serial_number: &str) -> Self {
        Self {
            serial_number: serial_number.to_owned(),
            description: "FTDI SuperSpeed-FIFO Bridge".to_owned(),
            vendor_id: 0x0403,
            product_id: 0x601F,
            device_type: DeviceType::Ft601,
            location_id: 0,
            driver_version: DRIVER_VERSION,
            factory: [0; CONFIGURATION_LEN],
        }
    }

    /// Set the product description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set the chip type and USB product ID.
    #[must_use]
    pub fn with_type(mut self, device_type: DeviceType, product_id: u16) -> Self {
        self.device_type = device_type;
        self.product_id = product_id;
        self
    }

    /// Set the configuration the chip starts with and restores on reset to defaults.
    #[must_use]
    pub fn with_configuration(mut self, config: &ChipConfiguration) -> Self {
        self.factory = config.to_bytes();
        self
    }

    /// Set the reported driver version.
    #[must_use]
    pub fn with_driver_version(mut self, version: u32) -> Self {
        self.driver_version = version;
        self
    }
}

#[derive(Debug)]
struct Slot {
    device: SimulatedDevice,
    eeprom: [u8; CONFIGURATION_LEN],
    open: Option<u32>,
    /// Rescans left before the device shows up again after a port cycle.
    hidden_for: u32,
}

#[derive(Debug, Default)]
struct State {
    slots: Vec<Slot>,
    /// Slot indices captured by the last rescan, in enumeration order.
    table: Vec<usize>,
    handles: HashMap<u32, usize>,
    next_handle: u32,
    calls: usize,
    faults: VecDeque<(Call, u32)>,
    reenumeration_rescans: u32,
}

impl State {
    fn enter(&mut self, call: Call) -> Result<()> {
        self.calls += 1;
        if let Some(pos) = self.faults.iter().position(|(c, _)| *c == call) {
            if let Some((_, code)) = self.faults.remove(pos) {
                debug!("simulated {call:?} fails with status {code}");
                return Err(D3xxError::from_status(code));
            }
        }
        Ok(())
    }

    fn slot_for(&self, handle: SimHandle) -> Result<usize> {
        self.handles
            .get(&handle.0)
            .copied()
            .ok_or(D3xxError::from(Status::InvalidHandle))
    }

    fn find_visible(&self, matches: impl Fn(&SimulatedDevice) -> bool) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.hidden_for == 0 && matches(&slot.device))
    }
}

/// An in-memory bus of `FT60x` chips.
///
/// The simulation follows the driver's observable contract: a device can be
/// open in one session at a time, opening by index uses the table captured by
/// the last rescan, and a port cycle drops the handle and hides the device
/// for a number of rescans while it re-enumerates.
///
/// ```
/// use ftd3xx_control::{D3xx, SimulatedDevice, SimulatedDriver};
///
/// let driver = SimulatedDriver::new();
/// driver.attach(SimulatedDevice::new("SIM001"));
/// let d3xx = D3xx::with_driver(driver);
/// assert_eq!(d3xx.refresh().unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct SimulatedDriver {
    state: Mutex<State>,
    directory: DeviceDirectory,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    /// An empty bus. Devices re-enumerate one rescan after a port cycle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                reenumeration_rescans: 1,
                ..State::default()
            }),
            directory: DeviceDirectory::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plug a device in.
    pub fn attach(&self, device: SimulatedDevice) {
        let mut state = self.state();
        let location_id = u32::try_from(state.slots.len()).unwrap_or(u32::MAX) + 1;
        let eeprom = device.factory;
        state.slots.push(Slot {
            device: SimulatedDevice {
                location_id,
                ..device
            },
            eeprom,
            open: None,
            hidden_for: 0,
        });
    }

    /// Unplug the device with the given serial number. Its handle, if any,
    /// becomes invalid.
    pub fn detach(&self, serial_number: &str) -> bool {
        let mut state = self.state();
        let Some(pos) = state
            .slots
            .iter()
            .position(|slot| slot.device.serial_number == serial_number)
        else {
            return false;
        };
        state.slots.remove(pos);
        state.handles.retain(|_, slot| *slot != pos);
        for slot in state.handles.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        // the captured table refers to slots by position; drop it like a stale
        // driver table would be after an unplug
        state.table.clear();
        true
    }

    /// Number of rescans a device stays invisible after a port cycle.
    pub fn set_reenumeration_rescans(&self, rescans: u32) {
        self.state().reenumeration_rescans = rescans;
    }

    /// Make the next call of kind `call` fail with `status`.
    pub fn fail_next(&self, call: Call, status: Status) {
        self.state().faults.push_back((call, status.into()));
    }

    /// Total number of driver calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.state().calls
    }

    /// Whether the device with the given serial number is currently open.
    #[must_use]
    pub fn is_open(&self, serial_number: &str) -> bool {
        self.state()
            .slots
            .iter()
            .any(|slot| slot.device.serial_number == serial_number && slot.open.is_some())
    }

    /// Decoded EEPROM contents of the device with the given serial number.
    #[must_use]
    pub fn eeprom(&self, serial_number: &str) -> Option<ChipConfiguration> {
        self.state()
            .slots
            .iter()
            .find(|slot| slot.device.serial_number == serial_number)
            .and_then(|slot| ChipConfiguration::from_bytes(&slot.eeprom).ok())
    }
}

impl Driver for SimulatedDriver {
    type Handle = SimHandle;

    fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    fn library_version(&self) -> Result<u32> {
        self.state().enter(Call::LibraryVersion)?;
        Ok(LIBRARY_VERSION)
    }

    fn create_device_info_list(&self) -> Result<usize> {
        let mut state = self.state();
        state.enter(Call::CreateDeviceInfoList)?;
        for slot in &mut state.slots {
            slot.hidden_for = slot.hidden_for.saturating_sub(1);
        }
        let table: Vec<usize> = (0..state.slots.len())
            .filter(|&i| state.slots[i].hidden_for == 0)
            .collect();
        state.table = table;
        trace!("simulated rescan found {} devices", state.table.len());
        Ok(state.table.len())
    }

    fn device_info_list(&self, count: usize) -> Result<Vec<RawDeviceInfo>> {
        let mut state = self.state();
        state.enter(Call::DeviceInfoList)?;
        Ok(state
            .table
            .iter()
            .take(count)
            .map(|&i| {
                let slot = &state.slots[i];
                let device = &slot.device;
                let opened = if slot.open.is_some() { FLAG_OPENED } else { 0 };
                RawDeviceInfo {
                    flags: FLAG_SUPERSPEED | opened,
                    device_type: device.device_type.into(),
                    id: u32::from(device.vendor_id) << 16 | u32::from(device.product_id),
                    location_id: device.location_id,
                    serial_number: device.serial_number.clone(),
                    description: device.description.clone(),
                }
            })
            .collect())
    }

    fn create(&self, target: &Target) -> Result<Self::Handle> {
        let mut state = self.state();
        state.enter(Call::Create)?;
        let slot = match target {
            Target::Index(index) => state
                .table
                .get(*index)
                .copied()
                .filter(|&i| state.slots[i].hidden_for == 0),
            Target::SerialNumber(serial) => {
                state.find_visible(|device| device.serial_number == *serial)
            }
            Target::Description(description) => {
                state.find_visible(|device| device.description == *description)
            }
        }
        .ok_or(D3xxError::from(Status::DeviceNotFound))?;
        if state.slots[slot].open.is_some() {
            return Err(D3xxError::from(Status::DeviceNotOpened));
        }
        state.next_handle += 1;
        let id = state.next_handle;
        state.slots[slot].open = Some(id);
        state.handles.insert(id, slot);
        Ok(SimHandle(id))
    }

    fn close(&self, handle: Self::Handle) -> Result<()> {
        let mut state = self.state();
        state.enter(Call::Close)?;
        let slot = state.slot_for(handle)?;
        state.handles.remove(&handle.0);
        state.slots[slot].open = None;
        Ok(())
    }

    fn chip_configuration(&self, handle: Self::Handle) -> Result<ChipConfiguration> {
        let mut state = self.state();
        state.enter(Call::ChipConfiguration)?;
        let slot = state.slot_for(handle)?;
        ChipConfiguration::from_bytes(&state.slots[slot].eeprom)
    }

    fn set_chip_configuration(
        &self,
        handle: Self::Handle,
        config: Option<&ChipConfiguration>,
    ) -> Result<()> {
        let mut state = self.state();
        state.enter(Call::SetChipConfiguration)?;
        let index = state.slot_for(handle)?;
        let slot = &mut state.slots[index];
        slot.eeprom = match config {
            Some(config) => config.to_bytes(),
            None => slot.device.factory,
        };
        Ok(())
    }

    fn driver_version(&self, handle: Self::Handle) -> Result<u32> {
        let mut state = self.state();
        state.enter(Call::DriverVersion)?;
        let slot = state.slot_for(handle)?;
        Ok(state.slots[slot].device.driver_version)
    }

    fn reset_device_port(&self, handle: Self::Handle) -> Result<()> {
        let mut state = self.state();
        state.enter(Call::ResetDevicePort)?;
        state.slot_for(handle).map(|_| ())
    }

    fn cycle_device_port(&self, handle: Self::Handle) -> Result<()> {
        let mut state = self.state();
        state.enter(Call::CycleDevicePort)?;
        let slot = state.slot_for(handle)?;
        state.handles.remove(&handle.0);
        let rescans = state.reenumeration_rescans;
        let slot = &mut state.slots[slot];
        slot.open = None;
        slot.hidden_for = rescans;
        debug!(
            "simulated {} re-enumerating for {rescans} rescans",
            slot.device.serial_number
        );
        Ok(())
    }
}
