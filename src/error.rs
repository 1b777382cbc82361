use std::fmt::Display;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Result type returned by every fallible operation in this crate.
pub type Result<T, E = D3xxError> = std::result::Result<T, E>;

/// Status codes defined by the D3XX API.
///
/// Codes 1 through 32 are defined as errors by the API. Codes outside that
/// range are kept as raw numbers inside [`D3xxError::Driver`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum Status {
    InvalidHandle = 1,
    DeviceNotFound,
    DeviceNotOpened,
    IoError,
    InsufficientResources,
    InvalidParameter,
    InvalidBaudRate,
    DeviceNotOpenedForErase,
    DeviceNotOpenedForWrite,
    FailedToWriteDevice,
    EEPROMReadFailed,
    EEPROMWriteFailed,
    EEPROMEraseFailed,
    EEPROMNotPresent,
    EEPROMNotProgrammed,
    InvalidArgs,
    NotSupported,

    NoMoreItems,
    Timeout,
    OperationAborted,
    ReservedPipe,
    InvalidControlRequestDirection,
    InvalidControlRequestType,
    IoPending,
    IoIncomplete,
    HandleEof,
    Busy,
    NoSystemResources,
    DeviceListNotReady,
    DeviceNotConnected,
    IncorrectDevicePath,

    OtherError,
}

impl Status {
    /// The error kind this status is classified as.
    #[must_use]
    pub fn kind(self) -> ErrorKind {
        match self {
            Status::InvalidHandle => ErrorKind::InvalidHandle,
            Status::DeviceNotFound => ErrorKind::DeviceNotFound,
            Status::DeviceNotOpened
            | Status::Busy
            | Status::DeviceListNotReady
            | Status::DeviceNotConnected => ErrorKind::DeviceBusy,
            Status::InvalidParameter | Status::InvalidArgs => ErrorKind::InvalidParameter,
            Status::Timeout => ErrorKind::IoTimeout,
            _ => ErrorKind::Other,
        }
    }
}

/// Coarse classification of every error this crate can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The device is absent from the current enumeration.
    DeviceNotFound,
    /// The device is owned by another session or is re-enumerating.
    DeviceBusy,
    /// The driver rejected the handle.
    InvalidHandle,
    /// The session was already closed or invalidated by a port cycle.
    ClosedHandle,
    /// An argument was rejected by this crate or by the driver.
    InvalidParameter,
    /// The driver timed out.
    IoTimeout,
    /// A loosely-typed argument did not have the expected type.
    TypeMismatch,
    /// Anything else, including statuses the D3XX documentation does not define.
    Other,
}

impl ErrorKind {
    /// Whether an operation failing with this kind may succeed if repeated.
    ///
    /// Only enumeration races qualify: the device is missing or busy while
    /// the bus settles.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::DeviceNotFound | ErrorKind::DeviceBusy)
    }
}

/// Represents an error returned by the D3XX API or detected by this crate
/// before a driver call was attempted.
///
/// Driver failures keep their raw status code:
///
/// ```
/// use ftd3xx_control::{D3xxError, ErrorKind};
///
/// let err = D3xxError::from_status(2);
/// assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
/// assert_eq!(err.status(), Some(2));
/// assert!(err.is_retryable());
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum D3xxError {
    /// A driver call returned a non-success status.
    #[error("driver call failed: {}", StatusDisplay::of(.code))]
    Driver {
        /// The raw status code.
        code: u32,
    },
    /// The session is closed or was invalidated by a port cycle.
    #[error("session handle is closed")]
    ClosedHandle,
    /// A dynamic argument had the wrong type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the expected type.
        expected: &'static str,
        /// Name of the type that was supplied.
        found: &'static str,
    },
    /// An identifier was malformed (empty, interior NUL, out of range).
    #[error("invalid {what}: {reason}")]
    InvalidArgument {
        /// The argument that was rejected.
        what: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// A device count did not match the most recent enumeration.
    #[error("device count mismatch: requested {requested}, enumerated {enumerated}")]
    CountMismatch {
        /// Count supplied by the caller (or returned by the driver).
        requested: usize,
        /// Count of the most recent enumeration.
        enumerated: usize,
    },
    /// A device table was requested before the bus was rescanned in the
    /// current generation. No driver call was made.
    #[error("the bus has not been rescanned since the directory was invalidated")]
    NotRefreshed,
    /// The device is absent from the current snapshot. No driver call was made.
    #[error("device {target} not present in enumeration")]
    NotEnumerated {
        /// Description of the identifier that was looked up.
        target: String,
    },
    /// A configuration field holds a value the typed view cannot decode.
    #[error("field {field} holds undecodable value {value:#x}")]
    InvalidField {
        /// Canonical field name.
        field: &'static str,
        /// The raw value.
        value: u32,
    },
    /// Read-back after a configuration write differed from what was written.
    #[error("configuration verify failed for fields {fields:?}")]
    VerifyFailed {
        /// Canonical names of the fields that differ.
        fields: Vec<&'static str>,
    },
    /// The bounded retry ceiling was reached.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error of the final attempt.
        last: Box<D3xxError>,
    },
}

impl D3xxError {
    /// Construct an error from a non-zero native status.
    ///
    /// # Panics
    ///
    /// Panics if `code` is `0` (`FT_OK`), which is not an error.
    #[must_use]
    pub fn from_status(code: u32) -> Self {
        assert_ne!(code, 0, "success is not an error");
        D3xxError::Driver { code }
    }

    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            D3xxError::Driver { code } => {
                Status::try_from(*code).map_or(ErrorKind::Other, Status::kind)
            }
            D3xxError::ClosedHandle => ErrorKind::ClosedHandle,
            D3xxError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            D3xxError::InvalidArgument { .. }
            | D3xxError::CountMismatch { .. }
            | D3xxError::NotRefreshed
            | D3xxError::InvalidField { .. } => ErrorKind::InvalidParameter,
            D3xxError::NotEnumerated { .. } => ErrorKind::DeviceNotFound,
            D3xxError::VerifyFailed { .. } => ErrorKind::Other,
            D3xxError::RetriesExhausted { last, .. } => last.kind(),
        }
    }

    /// The raw driver status, if this error came from the driver.
    #[must_use]
    pub fn status(&self) -> Option<u32> {
        match self {
            D3xxError::Driver { code } => Some(*code),
            D3xxError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Whether the failed operation may be retried.
    ///
    /// [`D3xxError::RetriesExhausted`] is always terminal even though it
    /// reports the kind of the last underlying error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            D3xxError::RetriesExhausted { .. } => false,
            other => other.kind().is_retryable(),
        }
    }
}

impl From<Status> for D3xxError {
    fn from(status: Status) -> Self {
        D3xxError::Driver {
            code: status.into(),
        }
    }
}

struct StatusDisplay(u32);

impl StatusDisplay {
    fn of(code: &u32) -> Self {
        Self(*code)
    }
}

impl Display for StatusDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match Status::try_from(self.0) {
            Ok(status) => write!(f, "{status:?} (status {})", self.0),
            Err(_) => write!(f, "undocumented status {}", self.0),
        }
    }
}

macro_rules! try_d3xx {
    ($expr:expr) => {
        match $expr {
            0 => Ok(()),
            #[allow(clippy::unnecessary_cast)]
            code => Err(crate::error::D3xxError::from_status(code as u32)),
        }
    };
}

pub(crate) use try_d3xx;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_two_is_retryable() {
        let err = D3xxError::from_status(2);
        assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
        assert!(err.is_retryable());
    }

    #[test]
    fn busy_family_maps_to_device_busy() {
        for code in [3, 27, 29, 30] {
            let err = D3xxError::from_status(code);
            assert_eq!(err.kind(), ErrorKind::DeviceBusy, "status {code}");
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn terminal_kinds() {
        assert_eq!(D3xxError::from_status(1).kind(), ErrorKind::InvalidHandle);
        assert_eq!(D3xxError::from_status(6).kind(), ErrorKind::InvalidParameter);
        assert_eq!(D3xxError::from_status(16).kind(), ErrorKind::InvalidParameter);
        assert_eq!(D3xxError::from_status(19).kind(), ErrorKind::IoTimeout);
        assert_eq!(D3xxError::from_status(11).kind(), ErrorKind::Other);
        for code in [1, 4, 6, 11, 19, 32] {
            assert!(!D3xxError::from_status(code).is_retryable(), "status {code}");
        }
    }

    #[test]
    fn undocumented_status_keeps_raw_code() {
        let err = D3xxError::from_status(0xEE);
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.status(), Some(0xEE));
        assert_eq!(err.to_string(), "driver call failed: undocumented status 238");
    }

    #[test]
    fn display_names_known_status() {
        let err = D3xxError::from(Status::Timeout);
        assert_eq!(err.to_string(), "driver call failed: Timeout (status 19)");
    }

    #[test]
    fn exhausted_is_terminal() {
        let err = D3xxError::RetriesExhausted {
            attempts: 20,
            last: Box::new(D3xxError::from_status(2)),
        };
        assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
        assert_eq!(err.status(), Some(2));
        assert!(!err.is_retryable());
    }

    #[test]
    fn macro_maps_status() {
        let ok: Result<()> = try_d3xx!(0u32);
        assert!(ok.is_ok());
        let err: Result<()> = try_d3xx!(19u32);
        assert_eq!(err, Err(D3xxError::Driver { code: 19 }));
    }

    #[test]
    #[should_panic(expected = "success is not an error")]
    fn success_is_not_an_error() {
        let _ = D3xxError::from_status(0);
    }
}
