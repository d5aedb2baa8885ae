use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// A dylib version packed in a `u32` as `xxxx.yy.zz` (16 bits major, 8 bits minor, 8 bits patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PackedVersion(pub u32);

/// [PackedVersion] parsing error.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PackedVersionParseError {
    /// Raised when a component is not a number.
    #[error("Invalid version component '{component}' in '{version}'")]
    InvalidComponent {
        /// Version being parsed.
        version: String,
        /// Faulty component.
        component: String,
    },

    /// Raised when a component does not fit in its bit range, or when there is more than three.
    #[error("Version '{0}' does not fit in a packed xxxx.yy.zz version")]
    OutOfRange(String),
}

impl PackedVersion {
    /// Version `1.0`, the default version of a dynamic library.
    pub const ONE: PackedVersion = PackedVersion::new(1, 0, 0);

    /// Create a version from its components.
    pub const fn new(major: u16, minor: u8, patch: u8) -> Self {
        Self(((major as u32) << 16) | ((minor as u32) << 8) | patch as u32)
    }

    /// Major component
    pub fn major(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Minor component
    pub fn minor(&self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    /// Patch component
    pub fn patch(&self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl FromStr for PackedVersion {
    type Err = PackedVersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let version = s.trim();
        let components = version
            .split('.')
            .map(|component| {
                component
                    .parse::<u32>()
                    .map_err(|_| PackedVersionParseError::InvalidComponent {
                        version: version.to_string(),
                        component: component.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let out_of_range = || PackedVersionParseError::OutOfRange(version.to_string());
        match components.as_slice() {
            [major] if *major <= 0xffff => Ok(Self::new(*major as u16, 0, 0)),
            [major, minor] if *major <= 0xffff && *minor <= 0xff => {
                Ok(Self::new(*major as u16, *minor as u8, 0))
            }
            [major, minor, patch] if *major <= 0xffff && *minor <= 0xff && *patch <= 0xff => {
                Ok(Self::new(*major as u16, *minor as u8, *patch as u8))
            }
            _ => Err(out_of_range()),
        }
    }
}

impl Display for PackedVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.patch() == 0 {
            write!(f, "{}.{}", self.major(), self.minor())
        } else {
            write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
        }
    }
}
