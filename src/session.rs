use std::{cell::Cell, marker::PhantomData};

use log::{debug, warn};

use crate::{
    driver::{Driver, NativeDriver, Target},
    version::{DriverVersion, Version},
    ChipConfiguration, D3xx, D3xxError, Result,
};

type PhantomUnsync = PhantomData<Cell<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State<H> {
    Open(H),
    Closed,
    /// The port was cycled; the driver already dropped the handle.
    Cycled,
}

/// An open connection to one D3XX device.
///
/// A session is the primary interface for configuring a `FT60x` device.
/// Only one session per device can be open at a time; the driver rejects a
/// second open with a [busy](crate::ErrorKind::DeviceBusy) error.
///
/// The device is closed when the session is dropped. Use
/// [`close`](Self::close) to observe close errors. After a close or a
/// [port cycle](Self::cycle_port) every operation fails with
/// [`D3xxError::ClosedHandle`].
///
/// # Example
///
/// ```no_run
/// use ftd3xx_control::D3xx;
///
/// let d3xx = D3xx::new();
/// let session = d3xx.open_by_serial("ABC123").unwrap();
/// let mut config = session.chip_configuration().unwrap();
/// config.interval = 9;
/// session.set_chip_configuration(&config).unwrap();
/// ```
#[derive(Debug)]
pub struct Session<'a, D: Driver = NativeDriver> {
    d3xx: &'a D3xx<D>,
    state: State<D::Handle>,
    target: Target,
    // The driver is not thread-safe, so a handle must not be used from two
    // threads at once.
    _unsync: PhantomUnsync,
}

impl<'a, D: Driver> Session<'a, D> {
    pub(crate) fn new(d3xx: &'a D3xx<D>, handle: D::Handle, target: Target) -> Self {
        Self {
            d3xx,
            state: State::Open(handle),
            target,
            _unsync: PhantomData,
        }
    }

    /// How the device was opened.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Whether the session still holds a live handle.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// The raw driver handle.
    pub fn handle(&self) -> Result<D::Handle> {
        match self.state {
            State::Open(handle) => Ok(handle),
            State::Closed | State::Cycled => Err(D3xxError::ClosedHandle),
        }
    }

    /// Read the chip configuration from the device's EEPROM.
    pub fn chip_configuration(&self) -> Result<ChipConfiguration> {
        self.driver().chip_configuration(self.handle()?)
    }

    /// Write `config` to the device's EEPROM as-is.
    ///
    /// No field is validated. The device typically needs a port cycle before
    /// the new configuration takes effect.
    pub fn set_chip_configuration(&self, config: &ChipConfiguration) -> Result<()> {
        let handle = self.handle()?;
        debug!("writing chip configuration to {}", self.target);
        self.driver().set_chip_configuration(handle, Some(config))
    }

    /// Restore the factory default configuration.
    pub fn restore_default_configuration(&self) -> Result<()> {
        let handle = self.handle()?;
        debug!("restoring default chip configuration on {}", self.target);
        self.driver().set_chip_configuration(handle, None)
    }

    /// Write `config`, read it back and compare.
    ///
    /// Fails with [`D3xxError::VerifyFailed`] naming every field that reads
    /// back differently.
    pub fn write_verified(&self, config: &ChipConfiguration) -> Result<()> {
        self.set_chip_configuration(config)?;
        let fields = config.diff(&self.chip_configuration()?);
        if fields.is_empty() {
            Ok(())
        } else {
            Err(D3xxError::VerifyFailed { fields })
        }
    }

    /// Version of the kernel driver serving this device.
    pub fn driver_version(&self) -> Result<DriverVersion> {
        self.driver()
            .driver_version(self.handle()?)
            .map(|raw| DriverVersion(Version::with_raw(raw)))
    }

    /// Reset the device port. The session stays usable.
    pub fn reset_port(&self) -> Result<()> {
        let handle = self.handle()?;
        debug!("resetting port of {}", self.target);
        self.driver().reset_device_port(handle)
    }

    /// Power cycle the device port, causing the host to re-enumerate it.
    ///
    /// On success the session is invalidated and the device directory starts
    /// a new generation. Reopen the device by serial number, for example with
    /// [`D3xx::reopen_by_serial`].
    pub fn cycle_port(&mut self) -> Result<()> {
        let handle = self.handle()?;
        debug!("cycling port of {}", self.target);
        self.driver().cycle_device_port(handle)?;
        // the driver releases the handle as part of the cycle
        self.state = State::Cycled;
        self.d3xx.invalidate();
        Ok(())
    }

    /// Close the session.
    ///
    /// The session is closed even if the driver reports an error.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle()?;
        self.state = State::Closed;
        debug!("closing device {}", self.target);
        self.driver().close(handle)
    }

    fn driver(&self) -> &'a D {
        self.d3xx.driver()
    }
}

impl<D: Driver> Drop for Session<'_, D> {
    fn drop(&mut self) {
        if let State::Open(handle) = self.state {
            debug!("closing device {}", self.target);
            if let Err(err) = self.driver().close(handle) {
                warn!("failed to close device {}: {err}", self.target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        driver::{Call, SimulatedDevice, SimulatedDriver},
        ErrorKind, Status,
    };

    fn context() -> D3xx<SimulatedDriver> {
        let driver = SimulatedDriver::new();
        driver.attach(SimulatedDevice::new("A"));
        D3xx::with_driver(driver)
    }

    #[test]
    fn closed_session_rejects_operations() {
        let d3xx = context();
        let mut session = d3xx.open_by_serial("A").unwrap();
        session.close().unwrap();
        assert!(!d3xx.driver().is_open("A"));
        assert_eq!(session.close(), Err(D3xxError::ClosedHandle));
        assert_eq!(session.chip_configuration(), Err(D3xxError::ClosedHandle));
        assert_eq!(
            session.driver_version().unwrap_err().kind(),
            ErrorKind::ClosedHandle
        );
        assert_eq!(session.reset_port(), Err(D3xxError::ClosedHandle));
    }

    #[test]
    fn drop_closes() {
        let d3xx = context();
        {
            let _session = d3xx.open_by_serial("A").unwrap();
            assert!(d3xx.driver().is_open("A"));
        }
        assert!(!d3xx.driver().is_open("A"));
    }

    #[test]
    fn failed_close_still_closes_session() {
        let d3xx = context();
        let mut session = d3xx.open_by_serial("A").unwrap();
        d3xx.driver().fail_next(Call::Close, Status::IoError);
        assert!(session.close().is_err());
        assert!(!session.is_open());
    }

    #[test]
    fn reset_keeps_session_usable() {
        let d3xx = context();
        let session = d3xx.open_by_serial("A").unwrap();
        session.reset_port().unwrap();
        assert!(session.driver_version().is_ok());
    }

    #[test]
    fn failed_cycle_keeps_session_open() {
        let d3xx = context();
        let mut session = d3xx.open_by_serial("A").unwrap();
        d3xx.driver().fail_next(Call::CycleDevicePort, Status::IoError);
        assert!(session.cycle_port().is_err());
        assert!(session.is_open());
        assert_eq!(d3xx.generation(), 0);
    }

    #[test]
    fn restore_default_configuration() {
        let d3xx = context();
        let session = d3xx.open_by_serial("A").unwrap();
        let mut config = session.chip_configuration().unwrap();
        config.vendor_id = 0x1234;
        session.set_chip_configuration(&config).unwrap();
        session.restore_default_configuration().unwrap();
        assert_eq!(
            session.chip_configuration().unwrap(),
            ChipConfiguration::default()
        );
    }
}
