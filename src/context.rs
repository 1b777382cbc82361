use std::{
    panic::AssertUnwindSafe,
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::{debug, warn};

use crate::{
    driver::{Driver, NativeDriver, Target},
    ffi::with_global_lock,
    retry::{retry, RetryPolicy},
    scan::DeviceList,
    version::{LibraryVersion, Version},
    D3xxError, Result, Session,
};

/// Bookkeeping for the driver's device table.
#[derive(Debug, Default)]
struct Directory {
    /// Bumped by every rescan and every port cycle.
    generation: u64,
    /// Device count of the latest rescan in this generation.
    count: Option<usize>,
    /// Snapshot listed in this generation, if any.
    snapshot: Option<DeviceList>,
}

/// The device directory of one driver: the result of the latest bus rescan
/// and the snapshot listed from it.
///
/// The driver keeps a single device table, so the directory belongs to the
/// [`Driver`] rather than to a [`D3xx`]. Every `D3xx` over the same driver
/// sees every rescan, whichever of them made it.
#[derive(Debug, Default)]
pub struct DeviceDirectory(Mutex<Directory>);

impl DeviceDirectory {
    /// An empty directory: generation 0, no rescan yet.
    #[must_use]
    pub const fn new() -> Self {
        Self(Mutex::new(Directory {
            generation: 0,
            count: None,
            snapshot: None,
        }))
    }

    fn lock(&self) -> MutexGuard<'_, Directory> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Entry point to a D3XX driver.
///
/// A `D3xx` manages the driver's [`DeviceDirectory`]: the result of the
/// latest bus rescan and the snapshot listed from it. Devices are opened
/// through it, and the returned [`Session`]s borrow it.
///
/// Enumeration follows the driver's two-step protocol: [`refresh`](Self::refresh)
/// rescans the bus and returns the device count, then [`list`](Self::list)
/// fetches exactly that many entries. [`devices`](Self::devices) does both
/// at once.
///
/// # Example
///
/// ```no_run
/// use ftd3xx_control::D3xx;
///
/// let d3xx = D3xx::new();
/// for device in &d3xx.devices().unwrap() {
///     println!("{}: {}", device.serial_number(), device.description());
/// }
/// ```
#[derive(Debug)]
pub struct D3xx<D: Driver = NativeDriver> {
    driver: D,
}

impl D3xx<NativeDriver> {
    /// Use the D3XX library installed on this machine.
    #[must_use]
    pub fn new() -> Self {
        Self::with_driver(NativeDriver)
    }
}

impl Default for D3xx<NativeDriver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Driver> D3xx<D> {
    /// Use the given driver.
    pub fn with_driver(driver: D) -> Self {
        Self { driver }
    }

    /// The underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Version of the D3XX library. No device is needed.
    pub fn library_version(&self) -> Result<LibraryVersion> {
        self.driver
            .library_version()
            .map(|raw| LibraryVersion(Version::with_raw(raw)))
    }

    /// Current directory generation.
    pub fn generation(&self) -> u64 {
        self.directory().generation
    }

    /// Whether `list` was taken in the current directory generation.
    ///
    /// A stale list still identifies devices by serial number, but its
    /// indices no longer refer to the driver's table.
    pub fn is_current(&self, list: &DeviceList) -> bool {
        list.generation() == self.generation()
    }

    /// Rescan the bus and return the number of devices found.
    ///
    /// Starts a new directory generation. Any previously listed snapshot
    /// becomes stale.
    pub fn refresh(&self) -> Result<usize> {
        let mut directory = self.directory();
        with_global_lock(AssertUnwindSafe(|| self.rescan(&mut directory)))
    }

    /// Fetch the device table built by the last [`refresh`](Self::refresh).
    ///
    /// `count` must equal the count that refresh returned; any other value
    /// fails with [`D3xxError::CountMismatch`] before the driver is called.
    /// A count of zero after an empty rescan yields an empty list. Without a
    /// rescan in the current generation, fails with [`D3xxError::NotRefreshed`].
    pub fn list(&self, count: usize) -> Result<DeviceList> {
        let mut directory = self.directory();
        let Some(enumerated) = directory.count else {
            return Err(D3xxError::NotRefreshed);
        };
        if count != enumerated {
            return Err(D3xxError::CountMismatch {
                requested: count,
                enumerated,
            });
        }
        with_global_lock(AssertUnwindSafe(|| self.fetch(&mut directory, count)))
    }

    /// Rescan the bus and list every device found, as one step.
    pub fn devices(&self) -> Result<DeviceList> {
        let mut directory = self.directory();
        with_global_lock(AssertUnwindSafe(|| {
            let count = self.rescan(&mut directory)?;
            self.fetch(&mut directory, count)
        }))
    }

    /// Open a device by its position in the latest rescan.
    ///
    /// If the bus has not been scanned in the current generation, it is
    /// rescanned first. An index at or beyond the device count fails with
    /// [`D3xxError::NotEnumerated`] without calling the driver.
    pub fn open_by_index(&self, index: usize) -> Result<Session<'_, D>> {
        let mut directory = self.directory();
        with_global_lock(AssertUnwindSafe(|| {
            let count = match directory.count {
                Some(count) => count,
                None => self.rescan(&mut directory)?,
            };
            let target = Target::Index(index);
            if index >= count {
                return Err(D3xxError::NotEnumerated {
                    target: target.to_string(),
                });
            }
            self.create(target)
        }))
    }

    /// Open a device by serial number.
    ///
    /// If a snapshot has been listed in the current generation and does not
    /// contain `serial_number`, fails with [`D3xxError::NotEnumerated`]
    /// without calling the driver.
    pub fn open_by_serial(&self, serial_number: &str) -> Result<Session<'_, D>> {
        validate_identifier("serial number", serial_number)?;
        let target = Target::SerialNumber(serial_number.to_owned());
        if let Some(snapshot) = &self.directory().snapshot {
            if snapshot.by_serial_number(serial_number).is_none() {
                return Err(D3xxError::NotEnumerated {
                    target: target.to_string(),
                });
            }
        }
        self.create(target)
    }

    /// Open a device by its product description.
    ///
    /// The snapshot check of [`open_by_serial`](Self::open_by_serial) applies.
    pub fn open_by_description(&self, description: &str) -> Result<Session<'_, D>> {
        validate_identifier("description", description)?;
        let target = Target::Description(description.to_owned());
        if let Some(snapshot) = &self.directory().snapshot {
            if snapshot.by_description(description).is_none() {
                return Err(D3xxError::NotEnumerated {
                    target: target.to_string(),
                });
            }
        }
        self.create(target)
    }

    /// Open a device by any [`Target`].
    pub fn open(&self, target: &Target) -> Result<Session<'_, D>> {
        match target {
            Target::Index(index) => self.open_by_index(*index),
            Target::SerialNumber(serial) => self.open_by_serial(serial),
            Target::Description(description) => self.open_by_description(description),
        }
    }

    /// Rescan and open a device by serial number, retrying while the device
    /// is missing or busy.
    ///
    /// This is the way back to a device after [`Session::cycle_port`].
    pub fn reopen_by_serial(
        &self,
        serial_number: &str,
        policy: &RetryPolicy,
    ) -> Result<Session<'_, D>> {
        retry(policy, |attempt| {
            debug!("reopening {serial_number:?}, attempt {attempt}");
            self.refresh()?;
            self.open_by_serial(serial_number)
        })
    }

    /// Open `target`, run `f` on the session, and close it again.
    ///
    /// The session is closed on every path. If `f` succeeds, a failure to
    /// close is returned; if `f` fails, its error wins and a close failure is
    /// only logged. A session that `f` closed or cycled itself is left alone.
    pub fn with_session<T, F>(&self, target: &Target, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session<'_, D>) -> Result<T>,
    {
        let mut session = self.open(target)?;
        let result = f(&mut session);
        let closed = if session.is_open() {
            session.close()
        } else {
            Ok(())
        };
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!("failed to close device {target}: {close_err}");
                }
                Err(err)
            }
        }
    }

    /// Start a new generation after the bus changed under an open session.
    pub(crate) fn invalidate(&self) {
        let mut directory = self.directory();
        directory.generation += 1;
        directory.count = None;
        directory.snapshot = None;
        debug!("device directory invalidated (generation {})", directory.generation);
    }

    fn directory(&self) -> MutexGuard<'_, Directory> {
        self.driver.directory().lock()
    }

    /// Requires the global lock.
    fn rescan(&self, directory: &mut Directory) -> Result<usize> {
        let count = self.driver.create_device_info_list()?;
        directory.generation += 1;
        directory.count = Some(count);
        directory.snapshot = None;
        debug!(
            "found {count} devices (generation {})",
            directory.generation
        );
        Ok(count)
    }

    /// Requires the global lock.
    fn fetch(&self, directory: &mut Directory, count: usize) -> Result<DeviceList> {
        let raw = if count == 0 {
            Vec::new()
        } else {
            self.driver.device_info_list(count)?
        };
        if raw.len() != count {
            return Err(D3xxError::CountMismatch {
                requested: count,
                enumerated: raw.len(),
            });
        }
        let list = DeviceList::new(directory.generation, raw);
        directory.snapshot = Some(list.clone());
        Ok(list)
    }

    fn create(&self, target: Target) -> Result<Session<'_, D>> {
        let handle = self.driver.create(&target)?;
        debug!("opened device {target} as {handle:?}");
        Ok(Session::new(self, handle, target))
    }
}

fn validate_identifier(what: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(D3xxError::InvalidArgument {
            what,
            reason: "must not be empty".to_owned(),
        });
    }
    if value.contains('\0') {
        return Err(D3xxError::InvalidArgument {
            what,
            reason: "contains a NUL byte".to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        driver::{SimulatedDevice, SimulatedDriver},
        ErrorKind,
    };

    fn context(serials: &[&str]) -> D3xx<SimulatedDriver> {
        let driver = SimulatedDriver::new();
        for serial in serials {
            driver.attach(SimulatedDevice::new(serial));
        }
        D3xx::with_driver(driver)
    }

    #[test]
    fn refresh_bumps_generation() {
        let d3xx = context(&["A"]);
        assert_eq!(d3xx.generation(), 0);
        assert_eq!(d3xx.refresh().unwrap(), 1);
        assert_eq!(d3xx.refresh().unwrap(), 1);
        assert_eq!(d3xx.generation(), 2);
    }

    #[test]
    fn list_needs_a_rescan_first() {
        let d3xx = context(&["A"]);
        assert_eq!(d3xx.list(0).unwrap_err(), D3xxError::NotRefreshed);
        assert_eq!(d3xx.list(1).unwrap_err().kind(), ErrorKind::InvalidParameter);
        assert_eq!(d3xx.driver().calls(), 0);
        // no snapshot was recorded, so the driver still decides
        let _session = d3xx.open_by_serial("A").unwrap();
        assert!(d3xx.driver().is_open("A"));
    }

    #[test]
    fn contexts_over_one_driver_share_the_directory() {
        let driver = SimulatedDriver::new();
        driver.attach(SimulatedDevice::new("A"));
        let first = D3xx::with_driver(&driver);
        let second = D3xx::with_driver(&driver);
        assert_eq!(first.refresh().unwrap(), 1);
        driver.attach(SimulatedDevice::new("B"));
        assert_eq!(second.refresh().unwrap(), 2);
        assert_eq!(first.generation(), 2);
        let calls = driver.calls();
        assert_eq!(
            first.list(1).unwrap_err(),
            D3xxError::CountMismatch {
                requested: 1,
                enumerated: 2
            }
        );
        assert_eq!(driver.calls(), calls);
        assert_eq!(first.list(2).unwrap().len(), 2);
    }

    #[test]
    fn stale_list_is_detected() {
        let d3xx = context(&["A"]);
        let list = d3xx.devices().unwrap();
        assert!(d3xx.is_current(&list));
        d3xx.refresh().unwrap();
        assert!(!d3xx.is_current(&list));
    }

    #[test]
    fn identifiers_are_validated_before_the_driver() {
        let d3xx = context(&["A"]);
        for bad in ["", "A\0B"] {
            let err = d3xx.open_by_serial(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
            let err = d3xx.open_by_description(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
        assert_eq!(d3xx.driver().calls(), 0);
    }

    #[test]
    fn serial_missing_from_snapshot_skips_driver() {
        let d3xx = context(&["A"]);
        d3xx.devices().unwrap();
        let calls = d3xx.driver().calls();
        let err = d3xx.open_by_serial("B").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
        assert_eq!(d3xx.driver().calls(), calls);
    }

    #[test]
    fn open_by_index_rescans_when_needed() {
        let d3xx = context(&["A", "B"]);
        let session = d3xx.open_by_index(1).unwrap();
        assert_eq!(session.target(), &Target::Index(1));
        assert!(d3xx.driver().is_open("B"));
        assert_eq!(d3xx.generation(), 1);
    }

    #[test]
    fn open_by_description() {
        let driver = SimulatedDriver::new();
        driver.attach(SimulatedDevice::new("A").with_description("Bridge A"));
        let d3xx = D3xx::with_driver(driver);
        let _session = d3xx.open_by_description("Bridge A").unwrap();
        assert!(d3xx.driver().is_open("A"));
    }
}
