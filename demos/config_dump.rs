//! Print every attached device and its chip configuration.
//!
//! Set `RUST_LOG=debug` to see the driver calls.

use ftd3xx_control::{configuration::FieldValue, library_version, D3xx, Result, Target};

fn main() -> Result<()> {
    env_logger::init();

    println!("D3XX library {}", library_version()?);
    let d3xx = D3xx::new();
    let count = d3xx.refresh()?;
    if count == 0 {
        println!("no devices found");
        return Ok(());
    }
    for device in &d3xx.list(count)? {
        println!(
            "[{}] {} {:04x}:{:04x} {:?} {:?}{}",
            device.index(),
            device.serial_number(),
            device.vendor_id(),
            device.product_id(),
            device.device_type(),
            device.description(),
            if device.is_open() { " (in use)" } else { "" },
        );
        if device.is_open() {
            continue;
        }
        let target = Target::SerialNumber(device.serial_number().to_owned());
        d3xx.with_session(&target, |session| {
            println!("  driver {}", session.driver_version()?);
            let config = session.chip_configuration()?;
            for (name, value) in config.fields() {
                match value {
                    FieldValue::Scalar(value) => println!("  {name:<26} {value:#x}"),
                    FieldValue::Array(bytes) if value.is_zero() => {
                        println!("  {name:<26} [0; {}]", bytes.len());
                    }
                    FieldValue::Array(bytes) => println!("  {name:<26} {bytes:02x?}"),
                }
            }
            let strings = config.string_descriptor();
            println!(
                "  strings: {:?} / {:?} / {:?}",
                strings.manufacturer(),
                strings.product(),
                strings.serial_number()
            );
            Ok(())
        })?;
    }
    Ok(())
}
