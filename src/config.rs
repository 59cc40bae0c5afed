//! Conversion options
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bits per sample of the output raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Deserialize, Serialize)]
pub enum BitDepth {
    /// 8 bit samples, 0..=255
    Eight,
    /// 16 bit samples, 0..=65535
    Sixteen,
}

impl BitDepth {
    /// The largest sample value at this depth
    pub fn max_value(&self) -> f64 {
        match self {
            BitDepth::Eight => f64::from(u8::MAX),
            BitDepth::Sixteen => f64::from(u16::MAX),
        }
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            other => Err(Error::UnsupportedConfiguration(format!(
                "bit depth must be 8 or 16, got {}",
                other
            ))),
        }
    }
}

/// Options for turning a sonar file into a raster
#[derive(Debug, Clone, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct ConvertConfig {
    /// Bit depth of the output raster
    pub bitdepth: BitDepth,
    /// Halve the horizontal resolution after quantization
    pub resize_half_width: bool,
    /// Equalize the histogram before quantization
    pub histogram_equalization: bool,
    /// Drop columns whose mean amplitude is below this value
    ///
    /// A negative value disables column cleanup.
    pub column_threshold: i32,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            bitdepth: BitDepth::Eight,
            resize_half_width: true,
            histogram_equalization: false,
            column_threshold: 7,
        }
    }
}

impl ConvertConfig {
    /// The cleanup threshold, or `None` if cleanup is disabled
    pub fn column_threshold(&self) -> Option<f64> {
        if self.column_threshold < 0 {
            None
        } else {
            Some(f64::from(self.column_threshold))
        }
    }
}
