//! Render parameter validation.
//!
//! Values are validated but never rewritten: the format and resolution a
//! client submits are exactly what the worker receives.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Largest accepted edge length in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// Longest accepted format token.
const MAX_FORMAT_LEN: usize = 16;

/// Output resolution, written as `{width}x{height}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            CoreError::Validation(format!(
                "Invalid resolution '{s}'. Expected WIDTHxHEIGHT, e.g. 1920x1080"
            ))
        };

        let (w, h) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.parse().map_err(|_| invalid())?;
        let height: u32 = h.parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(CoreError::Validation(format!(
                "Resolution '{s}' is out of range (1..={MAX_DIMENSION} per edge)"
            )));
        }

        Ok(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Validate an output format token such as `png` or `jpeg`.
pub fn validate_format(format: &str) -> Result<(), CoreError> {
    if format.is_empty()
        || format.len() > MAX_FORMAT_LEN
        || !format.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(CoreError::Validation(format!(
            "Invalid format '{format}'. Expected a short alphanumeric token, e.g. png"
        )));
    }
    Ok(())
}
