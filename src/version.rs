//! Library and driver version numbers.

use std::fmt::{self, Display};

/// A packed D3XX version number.
///
/// Byte 3 (most significant) holds the major version, byte 2 the minor
/// version and bytes 0 and 1 the build/SVN number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(u32);

impl Version {
    /// Wrap a raw version as returned by the driver.
    #[must_use]
    pub const fn with_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Build a version from its parts.
    #[must_use]
    pub const fn new(major: u8, minor: u8, build: u16) -> Self {
        Self((major as u32) << 24 | (minor as u32) << 16 | build as u32)
    }

    /// Major version number.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn major(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Minor version number.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn minor(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Build/subversion version number.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn build(&self) -> u16 {
        self.0 as u16
    }

    /// The raw packed value.
    #[must_use]
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.build())
    }
}

/// Version of the host-side D3XX library.
///
/// This is *not* the driver version; the two are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryVersion(pub Version);

/// Version of the kernel driver serving an open device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverVersion(pub Version);

impl Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
