mod common;

use std::time::Duration;

use common::bus;
use ftd3xx_control::{
    driver::Call, D3xxError, ErrorKind, RetryPolicy, Status, Target, Version,
};

fn fast(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_backoff(Duration::ZERO)
}

#[test]
fn second_open_is_busy() {
    let d3xx = bus(&["A"]);
    let _first = d3xx.open_by_serial("A").unwrap();
    let err = d3xx.open_by_serial("A").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceBusy);
    assert!(err.is_retryable());
}

#[test]
fn sessions_on_distinct_devices_coexist() {
    let d3xx = bus(&["A", "B"]);
    let a = d3xx.open_by_serial("A").unwrap();
    let b = d3xx.open_by_serial("B").unwrap();
    assert!(a.driver_version().is_ok());
    assert!(b.driver_version().is_ok());
}

#[test]
fn cycle_invalidates_session_and_directory() {
    let d3xx = bus(&["A"]);
    let list = d3xx.devices().unwrap();
    let mut session = d3xx.open_by_index(0).unwrap();
    session.cycle_port().unwrap();

    assert!(!session.is_open());
    assert_eq!(session.driver_version().unwrap_err(), D3xxError::ClosedHandle);
    assert_eq!(session.cycle_port(), Err(D3xxError::ClosedHandle));
    assert_eq!(session.close(), Err(D3xxError::ClosedHandle));
    assert!(!d3xx.is_current(&list));

    // the device is still re-enumerating
    let err = d3xx.open_by_serial("A").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceNotFound);

    // re-enumeration and a fresh open bring it back
    assert_eq!(d3xx.refresh().unwrap(), 1);
    let session = d3xx.open_by_serial("A").unwrap();
    assert!(session.driver_version().is_ok());
}

#[test]
fn cycled_session_drop_issues_no_close() {
    let d3xx = bus(&["A"]);
    let mut session = d3xx.open_by_serial("A").unwrap();
    session.cycle_port().unwrap();
    let calls = d3xx.driver().calls();
    drop(session);
    assert_eq!(d3xx.driver().calls(), calls);
}

#[test]
fn reopen_waits_for_reenumeration() {
    let d3xx = bus(&["A"]);
    d3xx.driver().set_reenumeration_rescans(3);
    let mut session = d3xx.open_by_serial("A").unwrap();
    session.cycle_port().unwrap();

    let mut attempts = 0;
    let session = ftd3xx_control::retry(&fast(10), |attempt| {
        attempts = attempt;
        d3xx.refresh()?;
        d3xx.open_by_serial("A")
    })
    .unwrap();
    assert_eq!(attempts, 3);
    assert!(session.is_open());
}

#[test]
fn reopen_by_serial_succeeds_after_cycle() {
    let d3xx = bus(&["A"]);
    d3xx.driver().set_reenumeration_rescans(2);
    let mut session = d3xx.open_by_serial("A").unwrap();
    session.cycle_port().unwrap();
    let session = d3xx.reopen_by_serial("A", &fast(5)).unwrap();
    assert_eq!(session.target(), &Target::SerialNumber("A".into()));
    assert!(d3xx.driver().is_open("A"));
}

#[test]
fn reopen_gives_up_on_missing_device() {
    let d3xx = bus(&["A"]);
    assert!(d3xx.driver().detach("A"));
    let err = d3xx.reopen_by_serial("A", &fast(3)).unwrap_err();
    match &err {
        D3xxError::RetriesExhausted { attempts, last } => {
            assert_eq!(*attempts, 3);
            assert_eq!(last.kind(), ErrorKind::DeviceNotFound);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[test]
fn reopen_propagates_terminal_errors() {
    let d3xx = bus(&["A"]);
    d3xx.driver()
        .fail_next(Call::CreateDeviceInfoList, Status::InvalidParameter);
    let err = d3xx.reopen_by_serial("A", &fast(5)).unwrap_err();
    assert_eq!(err, D3xxError::from(Status::InvalidParameter));
    assert_eq!(d3xx.driver().calls(), 1);
}

#[test]
fn reopen_rejects_bad_serial_once() {
    let d3xx = bus(&["A"]);
    let err = d3xx.reopen_by_serial("", &fast(5)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn with_session_closes_on_every_path() {
    let d3xx = bus(&["A"]);
    let target = Target::SerialNumber("A".into());

    let version = d3xx
        .with_session(&target, |session| session.driver_version())
        .unwrap();
    assert_eq!(version.0, Version::new(1, 3, 4));
    assert!(!d3xx.driver().is_open("A"));

    let err = d3xx
        .with_session(&target, |session| {
            assert!(session.is_open());
            Err::<(), _>(D3xxError::from(Status::IoError))
        })
        .unwrap_err();
    assert_eq!(err, D3xxError::from(Status::IoError));
    assert!(!d3xx.driver().is_open("A"));

    // a session closed by the closure is left alone
    d3xx.with_session(&target, |session| session.close()).unwrap();
    assert!(!d3xx.driver().is_open("A"));
}

#[test]
fn with_session_reports_close_failure() {
    let d3xx = bus(&["A"]);
    d3xx.driver().fail_next(Call::Close, Status::IoError);
    let err = d3xx
        .with_session(&Target::SerialNumber("A".into()), |_| Ok(()))
        .unwrap_err();
    assert_eq!(err, D3xxError::from(Status::IoError));
}

#[test]
fn library_version_needs_no_session() {
    let d3xx = bus(&[]);
    let version = d3xx.library_version().unwrap();
    assert_eq!(version.0, Version::new(1, 0, 0x16));
    assert_eq!(version.to_string(), "1.0.22");
}
