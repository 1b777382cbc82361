#![allow(dead_code)]

use ftd3xx_control::{D3xx, SimulatedDevice, SimulatedDriver};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A context over a simulated bus with one `FT601` per serial number.
pub fn bus(serials: &[&str]) -> D3xx<SimulatedDriver> {
    init_logging();
    let driver = SimulatedDriver::new();
    for serial in serials {
        driver.attach(SimulatedDevice::new(serial));
    }
    D3xx::with_driver(driver)
}
