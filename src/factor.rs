//! Scale factor accepted by the enhancement entry point.

use std::fmt;

use crate::error::{UpscaleError, UpscaleResult};

/// Factors offered to users. The core accepts any positive factor.
pub const POLICY_FACTORS: [u32; 2] = [2, 4];

/// Positive integer upscaling factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScaleFactor(u32);

impl ScaleFactor {
    /// Accept any factor >= 1.
    pub fn new(factor: i32) -> UpscaleResult<Self> {
        if factor < 1 {
            return Err(UpscaleError::invalid_argument(
                "scale",
                factor.to_string(),
                "scale factor must be at least 1",
            ));
        }
        Ok(Self(factor as u32))
    }

    /// Accept only the user-facing factors in [`POLICY_FACTORS`].
    pub fn policy(factor: u32) -> UpscaleResult<Self> {
        if !POLICY_FACTORS.contains(&factor) {
            return Err(UpscaleError::invalid_argument(
                "scale",
                factor.to_string(),
                "scale factor must be 2 or 4",
            ));
        }
        Ok(Self(factor))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}
