//! A loosely-typed call surface for scripting hosts.
//!
//! Embedding languages pass arguments as [`Value`]s and refer to open devices
//! by integer tokens instead of owning [`Session`]s. Every argument is
//! checked before the driver is called; a wrong type fails with
//! [`D3xxError::TypeMismatch`].
//!
//! ```
//! use ftd3xx_control::{D3xx, ErrorKind, Host, SimulatedDriver, Value};
//!
//! let d3xx = D3xx::with_driver(SimulatedDriver::new());
//! let mut host = Host::new(&d3xx);
//! let err = host.call("get_driver_version", &[Value::None]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::TypeMismatch);
//! assert_eq!(d3xx.driver().calls(), 0);
//! ```

use std::collections::HashMap;

use log::debug;

use crate::{
    driver::{Driver, NativeDriver},
    scan::DeviceInfo,
    version::Version,
    ChipConfiguration, D3xx, D3xxError, Result, Session,
};

/// A dynamically typed argument or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Absence of a value.
    None,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A string.
    Str(String),
    /// An ordered collection.
    Tuple(Vec<Value>),
    /// Token of a session opened through a [`Host`].
    Handle(u32),
    /// A chip configuration record.
    Config(Box<ChipConfiguration>),
}

impl Value {
    /// Name of the variant, used in type mismatch errors.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::Handle(_) => "handle",
            Value::Config(_) => "configuration",
        }
    }

    fn as_handle(&self) -> Result<u32> {
        match self {
            Value::Handle(token) => Ok(*token),
            other => Err(mismatch("handle", other)),
        }
    }

    fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(mismatch("int", other)),
        }
    }

    fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(value) => Ok(value.as_str()),
            other => Err(mismatch("str", other)),
        }
    }

    fn as_optional_config(&self) -> Result<Option<&ChipConfiguration>> {
        match self {
            Value::Config(config) => Ok(Some(&**config)),
            Value::None => Ok(None),
            other => Err(mismatch("configuration or none", other)),
        }
    }
}

impl From<ChipConfiguration> for Value {
    fn from(config: ChipConfiguration) -> Self {
        Value::Config(Box::new(config))
    }
}

impl From<Version> for Value {
    fn from(version: Version) -> Self {
        Value::Tuple(vec![
            Value::Int(i64::from(version.major())),
            Value::Int(i64::from(version.minor())),
            Value::Int(i64::from(version.build())),
        ])
    }
}

impl From<&DeviceInfo> for Value {
    fn from(info: &DeviceInfo) -> Self {
        Value::Tuple(vec![
            Value::Int(i64::try_from(info.index()).unwrap_or(i64::MAX)),
            Value::Int(i64::from(info.flags())),
            Value::Int(i64::from(u32::from(info.device_type()))),
            Value::Int(i64::from(info.vendor_id()) << 16 | i64::from(info.product_id())),
            Value::Int(i64::from(info.location_id())),
            Value::Str(info.serial_number().to_owned()),
            Value::Str(info.description().to_owned()),
        ])
    }
}

fn mismatch(expected: &'static str, found: &Value) -> D3xxError {
    D3xxError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

fn to_index(what: &'static str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| D3xxError::InvalidArgument {
        what,
        reason: format!("{value} is negative"),
    })
}

/// Names accepted by [`Host::call`].
pub const FUNCTIONS: [&str; 12] = [
    "get_library_version",
    "get_driver_version",
    "create_device_info_list",
    "get_device_info_list",
    "create_by_index",
    "create_by_serial_number",
    "create_by_description",
    "close",
    "get_chip_configuration",
    "set_chip_configuration",
    "reset_device_port",
    "cycle_device_port",
];

/// Sessions keyed by integer tokens, driven through [`Value`] arguments.
///
/// Dropping the host closes every session it still holds.
#[derive(Debug)]
pub struct Host<'a, D: Driver = NativeDriver> {
    d3xx: &'a D3xx<D>,
    sessions: HashMap<u32, Session<'a, D>>,
    next_token: u32,
}

impl<'a, D: Driver> Host<'a, D> {
    /// A host with no open sessions.
    pub fn new(d3xx: &'a D3xx<D>) -> Self {
        Self {
            d3xx,
            sessions: HashMap::new(),
            next_token: 0,
        }
    }

    /// Number of sessions held.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Call a function by name.
    ///
    /// The argument count is checked first, then each argument's type.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        debug!("host call {name} with {} arguments", args.len());
        match (name, args) {
            ("get_library_version", []) => self.get_library_version(),
            ("get_driver_version", [handle]) => self.get_driver_version(handle),
            ("create_device_info_list", []) => self.create_device_info_list(),
            ("get_device_info_list", [count]) => self.get_device_info_list(count),
            ("create_by_index", [index]) => self.create_by_index(index),
            ("create_by_serial_number", [serial]) => self.create_by_serial_number(serial),
            ("create_by_description", [description]) => self.create_by_description(description),
            ("close", [handle]) => self.close(handle),
            ("get_chip_configuration", [handle]) => self.get_chip_configuration(handle),
            ("set_chip_configuration", [handle, config]) => {
                self.set_chip_configuration(handle, config)
            }
            ("reset_device_port", [handle]) => self.reset_device_port(handle),
            ("cycle_device_port", [handle]) => self.cycle_device_port(handle),
            (name, args) if FUNCTIONS.contains(&name) => Err(D3xxError::InvalidArgument {
                what: "arguments",
                reason: format!("{name} does not take {} arguments", args.len()),
            }),
            (name, _) => Err(D3xxError::InvalidArgument {
                what: "function",
                reason: format!("no function named {name:?}"),
            }),
        }
    }

    /// Library version as a `(major, minor, build)` tuple.
    pub fn get_library_version(&self) -> Result<Value> {
        Ok(self.d3xx.library_version()?.0.into())
    }

    /// Driver version as a `(major, minor, build)` tuple.
    pub fn get_driver_version(&self, handle: &Value) -> Result<Value> {
        let session = self.session(handle)?;
        Ok(session.driver_version()?.0.into())
    }

    /// Rescan; returns the device count.
    pub fn create_device_info_list(&self) -> Result<Value> {
        let count = self.d3xx.refresh()?;
        Ok(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)))
    }

    /// List the devices found by the last rescan, one tuple per device:
    /// `(index, flags, type, id, location, serial, description)`.
    pub fn get_device_info_list(&self, count: &Value) -> Result<Value> {
        let count = to_index("device count", count.as_int()?)?;
        let list = self.d3xx.list(count)?;
        Ok(Value::Tuple(list.iter().map(Value::from).collect()))
    }

    /// Open by index; returns a handle token.
    pub fn create_by_index(&mut self, index: &Value) -> Result<Value> {
        let index = to_index("device index", index.as_int()?)?;
        let session = self.d3xx.open_by_index(index)?;
        Ok(self.insert(session))
    }

    /// Open by serial number; returns a handle token.
    pub fn create_by_serial_number(&mut self, serial_number: &Value) -> Result<Value> {
        let session = self.d3xx.open_by_serial(serial_number.as_str()?)?;
        Ok(self.insert(session))
    }

    /// Open by description; returns a handle token.
    pub fn create_by_description(&mut self, description: &Value) -> Result<Value> {
        let session = self.d3xx.open_by_description(description.as_str()?)?;
        Ok(self.insert(session))
    }

    /// Close and forget a session.
    ///
    /// Closing a cycled session reports [`D3xxError::ClosedHandle`], but the
    /// token is released either way.
    pub fn close(&mut self, handle: &Value) -> Result<Value> {
        let token = handle.as_handle()?;
        let mut session = self
            .sessions
            .remove(&token)
            .ok_or(D3xxError::ClosedHandle)?;
        session.close()?;
        Ok(Value::None)
    }

    /// Read the chip configuration.
    pub fn get_chip_configuration(&self, handle: &Value) -> Result<Value> {
        Ok(self.session(handle)?.chip_configuration()?.into())
    }

    /// Write a configuration, or restore the defaults when `config` is none.
    pub fn set_chip_configuration(&self, handle: &Value, config: &Value) -> Result<Value> {
        let session = self.session(handle)?;
        match config.as_optional_config()? {
            Some(config) => session.set_chip_configuration(config)?,
            None => session.restore_default_configuration()?,
        }
        Ok(Value::None)
    }

    /// Reset the device port.
    pub fn reset_device_port(&self, handle: &Value) -> Result<Value> {
        self.session(handle)?.reset_port()?;
        Ok(Value::None)
    }

    /// Cycle the device port. The token stays allocated until closed.
    pub fn cycle_device_port(&mut self, handle: &Value) -> Result<Value> {
        let token = handle.as_handle()?;
        self.sessions
            .get_mut(&token)
            .ok_or(D3xxError::ClosedHandle)?
            .cycle_port()?;
        Ok(Value::None)
    }

    fn session(&self, handle: &Value) -> Result<&Session<'a, D>> {
        let token = handle.as_handle()?;
        self.sessions.get(&token).ok_or(D3xxError::ClosedHandle)
    }

    fn insert(&mut self, session: Session<'a, D>) -> Value {
        self.next_token += 1;
        self.sessions.insert(self.next_token, session);
        Value::Handle(self.next_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        driver::{SimulatedDevice, SimulatedDriver},
        ErrorKind,
    };

    fn context() -> D3xx<SimulatedDriver> {
        let driver = SimulatedDriver::new();
        driver.attach(SimulatedDevice::new("A").with_description("Bridge A"));
        D3xx::with_driver(driver)
    }

    #[test]
    fn wrong_types_never_reach_the_driver() {
        let d3xx = context();
        let mut host = Host::new(&d3xx);
        let cases: [(&str, &[Value]); 5] = [
            ("get_driver_version", &[Value::None]),
            ("get_driver_version", &[Value::Tuple(vec![Value::None])]),
            ("create_by_index", &[Value::Str("0".into())]),
            ("create_by_serial_number", &[Value::Int(1)]),
            ("get_device_info_list", &[Value::Bool(true)]),
        ];
        for (name, args) in cases {
            let err = host.call(name, args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TypeMismatch, "{name}");
        }
        assert_eq!(d3xx.driver().calls(), 0);
    }

    #[test]
    fn session_lifecycle_through_tokens() {
        let d3xx = context();
        let mut host = Host::new(&d3xx);
        assert_eq!(host.call("create_device_info_list", &[]), Ok(Value::Int(1)));
        let list = host.call("get_device_info_list", &[Value::Int(1)]).unwrap();
        let Value::Tuple(devices) = list else {
            panic!("expected a tuple");
        };
        assert_eq!(devices.len(), 1);

        let handle = host.call("create_by_index", &[Value::Int(0)]).unwrap();
        assert!(matches!(handle, Value::Handle(_)));
        let config = host
            .call("get_chip_configuration", &[handle.clone()])
            .unwrap();
        host.call("set_chip_configuration", &[handle.clone(), config])
            .unwrap();
        host.call("close", &[handle.clone()]).unwrap();
        assert_eq!(host.open_sessions(), 0);
        assert_eq!(
            host.call("get_driver_version", &[handle]).unwrap_err(),
            D3xxError::ClosedHandle
        );
    }

    #[test]
    fn version_is_a_triple() {
        let d3xx = context();
        let host = Host::new(&d3xx);
        let Value::Tuple(parts) = host.get_library_version().unwrap() else {
            panic!("expected a tuple");
        };
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn cycled_token_reports_closed() {
        let d3xx = context();
        let mut host = Host::new(&d3xx);
        let handle = host
            .create_by_description(&Value::Str("Bridge A".into()))
            .unwrap();
        host.cycle_device_port(&handle).unwrap();
        assert_eq!(
            host.reset_device_port(&handle).unwrap_err(),
            D3xxError::ClosedHandle
        );
        assert_eq!(host.close(&handle).unwrap_err(), D3xxError::ClosedHandle);
        assert_eq!(host.open_sessions(), 0);
    }

    #[test]
    fn arity_and_name_errors() {
        let d3xx = context();
        let mut host = Host::new(&d3xx);
        let err = host.call("close", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = host.call("frobnicate", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn negative_index_is_rejected() {
        let d3xx = context();
        let mut host = Host::new(&d3xx);
        let err = host.create_by_index(&Value::Int(-1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(d3xx.driver().calls(), 0);
    }
}
