//! Re-export of the `libftd3xx-ffi` crate.
//!
//! This module contains the raw FTDI D3XX driver bindings. Most users will not need to use
//! this module directly, and should instead use the higher-level abstractions provided by
//! the rest of the crate.

use std::{
    panic::{catch_unwind, resume_unwind, UnwindSafe},
    sync::{Mutex, PoisonError},
};

pub use libftd3xx_ffi::*;

/// Global lock is necessary for certain operations when working with the D3XX driver.
static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

/// Run the given closure with the global lock held.
///
/// This is necessary for certain operations when working with the D3XX driver.
/// For example, listing devices must be done with the lock held since the
/// operation consists of a rescan followed by a read of the driver's device table,
/// which may be invalidated at any point by another thread.
///
/// The lock is not reentrant: calling this function from inside `f` deadlocks.
pub fn with_global_lock<F, R>(f: F) -> R
where
    F: FnOnce() -> R + UnwindSafe,
{
    let guard = GLOBAL_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    match catch_unwind(f) {
        Ok(result) => result,
        Err(payload) => {
            // release before unwinding so the lock is never left poisoned
            drop(guard);
            resume_unwind(payload);
        }
    }
}
