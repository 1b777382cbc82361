//! USB string descriptors.

use super::STRING_DESCRIPTORS_LEN;

const HEADER_SIZE: usize = 2;
const STRING_DESCRIPTOR_TYPE: u8 = 0x03;

/// Maximum lengths, in UTF-16 code units, of the three strings.
const MAX_MANUFACTURER: usize = 15;
const MAX_PRODUCT: usize = 31;
const MAX_SERIAL_NUMBER: usize = 15;

/// Container for the string descriptors stored in a
/// [`ChipConfiguration`](super::ChipConfiguration).
///
/// The chip stores three USB string descriptors back to back: manufacturer,
/// product and serial number. Each starts with a length byte (including the
/// two-byte header) and the descriptor type, followed by little-endian UTF-16.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringDescriptor {
    manufacturer: String,
    product: String,
    serial_number: String,
}

impl StringDescriptor {
    pub(crate) fn new(descriptors: &[u8; STRING_DESCRIPTORS_LEN]) -> Self {
        let mut parts = Parts {
            data: descriptors,
            offset: 0,
        };
        Self {
            manufacturer: parts.next_string(),
            product: parts.next_string(),
            serial_number: parts.next_string(),
        }
    }

    /// Manufacturer name.
    #[must_use]
    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// Set the manufacturer name.
    ///
    /// The string is truncated to 15 UTF-16 code units when encoded.
    pub fn set_manufacturer(&mut self, manufacturer: &str) {
        self.manufacturer = manufacturer.to_owned();
    }

    /// Product name.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Set the product name.
    ///
    /// The string is truncated to 31 UTF-16 code units when encoded.
    pub fn set_product(&mut self, product: &str) {
        self.product = product.to_owned();
    }

    /// Serial number.
    #[must_use]
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Set the serial number.
    ///
    /// The string is truncated to 15 UTF-16 code units when encoded.
    pub fn set_serial_number(&mut self, serial_number: &str) {
        self.serial_number = serial_number.to_owned();
    }

    /// Encode into the 128-byte block stored by the chip.
    #[must_use]
    pub fn as_ffi_descriptor(&self) -> [u8; STRING_DESCRIPTORS_LEN] {
        let manufacturer = str_to_utf16(&self.manufacturer, MAX_MANUFACTURER);
        let product = str_to_utf16(&self.product, MAX_PRODUCT);
        let serial_number = str_to_utf16(&self.serial_number, MAX_SERIAL_NUMBER);
        let mut descriptor = [0u8; STRING_DESCRIPTORS_LEN];
        let mut offset = 0;

        for encoded in [&manufacturer, &product, &serial_number] {
            let len = encoded.len() + HEADER_SIZE;
            // the three maxima add up to exactly 128 bytes including headers
            descriptor[offset] = u8::try_from(len).unwrap_or(u8::MAX);
            descriptor[offset + 1] = STRING_DESCRIPTOR_TYPE;
            descriptor[offset + HEADER_SIZE..offset + len].copy_from_slice(encoded);
            offset += len;
        }
        descriptor
    }
}

/// Cursor over the packed descriptors.
///
/// A zeroed or truncated block yields empty strings instead of failing.
struct Parts<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Parts<'_> {
    fn next_string(&mut self) -> String {
        let Some(&len) = self.data.get(self.offset) else {
            return String::new();
        };
        let len = usize::from(len);
        let start = self.offset + HEADER_SIZE;
        let end = (self.offset + len).min(self.data.len());
        self.offset += len.max(HEADER_SIZE);
        if len <= HEADER_SIZE || start >= end {
            return String::new();
        }
        let wide_chars = self.data[start..end]
            .chunks_exact(2)
            .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
            .collect::<Vec<_>>();
        String::from_utf16_lossy(&wide_chars)
    }
}

/// Encode at most `max` UTF-16 code units, cutting only at a `char` boundary.
fn str_to_utf16(string: &str, max: usize) -> Vec<u8> {
    let mut units = 0;
    let kept: String = string
        .chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= max
        })
        .collect();
    kept.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
