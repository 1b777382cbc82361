//! Future Technology Devices International (FTDI) produces the FT60X series of chips (e.g. FT601),
//! which act as Super Speed USB 3.0 to FIFO bridges. FTDI provides a proprietary driver for these chips,
//! called D3XX, which exposes a low-level API for interacting with the devices through its DLL/shared library.
//!
//! This crate is the host-side control layer on top of that API: it finds devices, opens and
//! closes them, reads and writes the chip configuration stored in their EEPROM, resets and
//! cycles their USB port, and reports library and driver versions.
//!
//! # Disclaimer
//!
//! This crate is unofficial and is not affiliated with FTDI in any way.
//!
//! # What This Crate Does
//!
//! - Device enumeration, as generation-tagged snapshots
//! - Sessions opened by index, serial number or description
//! - Reading, writing and restoring the chip configuration, with typed views of its fields
//! - Port reset and port cycle
//! - Library and driver versions
//! - Bounded retry for operations racing with USB re-enumeration
//!
//! Pipe I/O, GPIO, notifications and overlapped I/O are not covered.
//!
//! # Requirements
//!
//! This crate is available for Linux, Windows, and macOS. Although the crate may be build without
//! it, the [D3XX driver](https://ftdichip.com/drivers/d3xx-drivers/) must be installed for the
//! target platform in order to communicate with devices.
//!
//! Everything except [`NativeDriver`] also works against the [`SimulatedDriver`], an in-memory
//! bus of `FT60x` chips.
//!
//! # D3XX Constraints
//!
//! The D3XX API does not provide many guarantees about the behavior of the driver. For example, there are
//! no guarantees about what happens when a device is unplugged while it is open, or whether any functions
//! are thread-safe. Because many aspects of the D3XX API are not explicitly defined or documented, this crate
//! intentionally puts in place additional restrictions and assumptions to ensure it is safe to use.
//! The two main assumptions with the greatest consequence on the design of this crate are:
//!
//! 1. The driver is not thread-safe nor reentrant.
//! 2. Any error can occur at any time for any reason.
//!
//! Because of the lack of a clear standard, it is *not recommended* to use this crate in safety-critical applications.
//! Any use of this crate in such applications is at your own risk.
//!
//! ## Error Handling
//!
//! Every error carries an [`ErrorKind`]. Only two kinds are worth handling specifically:
//! [`ErrorKind::DeviceNotFound`] and [`ErrorKind::DeviceBusy`] show up while the bus is settling
//! (for instance right after a port cycle) and are [retryable](D3xxError::is_retryable). The
//! [`retry`] combinator repeats an operation on exactly those kinds. For everything else a
//! catch-all approach is recommended, since the D3XX documentation does not say which errors
//! can occur and under what circumstances.
//!
//! ## Enumeration
//!
//! The driver keeps a single device table, rebuilt by every rescan. [`D3xx::refresh`] rescans and
//! returns the device count; [`D3xx::list`] must then be called with exactly that count. Indices
//! are only meaningful until the next rescan or port cycle, so each [`DeviceList`] records the
//! generation it was taken in. Serial numbers are the stable identity of a device. The
//! directory belongs to the driver, so every [`D3xx`] in a process sees the same rescans.
//!
//! ## Global Lock
//!
//! One of the consequences of the assumption regarding thread-safety is that some operations
//! must be performed while holding a lock on the driver. For example, listing devices must be done
//! with the lock held since the operation consists of a write followed by a read of the driver's
//! device table, which may by invalidated at any point by another thread.
//!
//! The operations which acquire the lock do so transparently by calling
//! [`with_global_lock`](crate::ffi::with_global_lock). This function is also available for use
//! by the user if access to the bindings are needed. Care should be taken to avoid deadlocks when
//! using this function.
//!
//! # Further Reading
//!
//! It is recommended to read the [D3XX Programmers Guide](https://ftdichip.com/wp-content/uploads/2020/07/AN_379-D3xx-Programmers-Guide-1.pdf)
//! for more information about the capabilities provided by the D3XX API. The chip configuration
//! is described in the
//! [FT60x Configuration Programmer guide](https://ftdichip.com/wp-content/uploads/2020/07/AN_370-FT60X-Configuration-Programmer-User-Guide.pdf).
//!
//! # Simple Example
//!
//! ```no_run
//! use ftd3xx_control::{D3xx, RetryPolicy};
//!
//! let d3xx = D3xx::new();
//!
//! // Scan for connected devices.
//! let count = d3xx.refresh().expect("failed to scan");
//! let devices = d3xx.list(count).expect("failed to list devices");
//!
//! // Open the first device found and change its configuration.
//! let serial = devices[0].serial_number().to_owned();
//! let mut session = d3xx.open_by_serial(&serial).expect("failed to open device");
//! let mut config = session.chip_configuration().expect("failed to read configuration");
//! let mut strings = config.string_descriptor();
//! strings.set_product("My Bridge");
//! config.set_string_descriptor(&strings);
//! session.write_verified(&config).expect("failed to write configuration");
//!
//! // The new configuration takes effect after the device re-enumerates.
//! session.cycle_port().expect("failed to cycle port");
//! let session = d3xx
//!     .reopen_by_serial(&serial, &RetryPolicy::default())
//!     .expect("device did not come back");
//! ```
#![warn(clippy::all, clippy::pedantic, clippy::cargo, missing_docs)]
// Allow missing error documentation since the D3XX documentation is vague about error conditions.
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod configuration;
mod context;
pub mod driver;
pub mod dynamic;
mod error;
pub mod ffi;
pub mod prelude;
mod retry;
mod scan;
mod session;
mod version;

pub use configuration::ChipConfiguration;
pub use context::{D3xx, DeviceDirectory};
pub use driver::{Driver, NativeDriver, SimulatedDevice, SimulatedDriver, Target};
pub use dynamic::{Host, Value};
pub(crate) use error::try_d3xx;
pub use error::{D3xxError, ErrorKind, Result, Status};
pub use retry::{retry, RetryPolicy};
pub use scan::{DeviceInfo, DeviceList, DeviceType};
pub use session::Session;
pub use version::{DriverVersion, LibraryVersion, Version};

/// Get the version of the D3XX library installed on this machine.
///
/// This is *not* the driver version, and no device is needed.
pub fn library_version() -> Result<LibraryVersion> {
    D3xx::new().library_version()
}
