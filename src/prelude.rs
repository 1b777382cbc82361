//! Public prelude of the crate containing the most commonly used types and functions.

pub use crate::{
    retry, ChipConfiguration, D3xx, D3xxError, DeviceInfo, DeviceList, ErrorKind, Result,
    RetryPolicy, Session, Target,
};
