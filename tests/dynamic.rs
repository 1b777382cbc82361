mod common;

use common::bus;
use ftd3xx_control::{D3xxError, ErrorKind, Host, Value};

#[test]
fn driver_version_of_none_is_a_type_error() {
    let d3xx = bus(&["A"]);
    let host = Host::new(&d3xx);
    let err = host.get_driver_version(&Value::None).unwrap_err();
    assert_eq!(
        err,
        D3xxError::TypeMismatch {
            expected: "handle",
            found: "none"
        }
    );
    assert_eq!(d3xx.driver().calls(), 0);
}

#[test]
fn scripted_probe_of_every_device() {
    let d3xx = bus(&["A", "B"]);
    let mut host = Host::new(&d3xx);

    let Value::Int(count) = host.call("create_device_info_list", &[]).unwrap() else {
        panic!("expected an int");
    };
    assert_eq!(count, 2);
    let Value::Tuple(devices) = host
        .call("get_device_info_list", &[Value::Int(count)])
        .unwrap()
    else {
        panic!("expected a tuple");
    };
    assert_eq!(devices.len(), 2);

    for index in 0..count {
        let handle = host.call("create_by_index", &[Value::Int(index)]).unwrap();
        let version = host.call("get_driver_version", &[handle.clone()]).unwrap();
        assert_eq!(
            version,
            Value::Tuple(vec![Value::Int(1), Value::Int(3), Value::Int(4)])
        );
        host.call("close", &[handle]).unwrap();
    }
    assert_eq!(host.open_sessions(), 0);
}

#[test]
fn none_configuration_restores_defaults() {
    let d3xx = bus(&["A"]);
    let mut host = Host::new(&d3xx);
    let handle = host
        .call("create_by_serial_number", &[Value::Str("A".into())])
        .unwrap();
    let Value::Config(mut config) = host
        .call("get_chip_configuration", &[handle.clone()])
        .unwrap()
    else {
        panic!("expected a configuration");
    };
    config.interval = 3;
    host.call(
        "set_chip_configuration",
        &[handle.clone(), Value::Config(config)],
    )
    .unwrap();
    assert_eq!(d3xx.driver().eeprom("A").unwrap().interval, 3);
    host.call("set_chip_configuration", &[handle.clone(), Value::None])
        .unwrap();
    assert_eq!(d3xx.driver().eeprom("A").unwrap().interval, 0);

    let err = host
        .call("set_chip_configuration", &[handle, Value::Int(0)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn dropping_the_host_closes_sessions() {
    let d3xx = bus(&["A"]);
    {
        let mut host = Host::new(&d3xx);
        host.call("create_by_serial_number", &[Value::Str("A".into())])
            .unwrap();
        assert!(d3xx.driver().is_open("A"));
    }
    assert!(!d3xx.driver().is_open("A"));
}
