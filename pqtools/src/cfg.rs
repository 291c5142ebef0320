//! Configuration tools: calibration values for a measurement
//!
//! The binary headers of the various instrument files carry the values that
//! the record decoders need. Reading those headers is left to other tools; the
//! decoders consume the handful of numbers below, usually from a small JSON
//! document:
//!
//! ```json
//! {
//!     "resolution": 4e-12,
//!     "sync_rate": 80000000,
//!     "channels": 4
//! }
//! ```
//!
//! Every field is optional. `resolution` falls back to the fixed base
//! resolution of the hardware where it has one, `sync_channel` falls back to
//! `channels` (one past the highest signal channel), and `overflow_increment`
//! falls back to the counter width of the record format.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Seconds per tick of the time (T2) or dtime (T3) field
    pub resolution:         Option<f64>,
    /// Sync rate in Hz
    #[serde(default)]
    pub sync_rate:          u32,
    /// Number of signal input channels
    #[serde(default)]
    pub channels:           u32,
    pub sync_channel:       Option<u32>,
    pub overflow_increment: Option<u64>,
}

impl Calibration {
    pub fn from_reader(rdr: impl Read) -> Result<Self> {
        let cal: Calibration = serde_json::from_reader(rdr)?;
        cal.validate()?;
        Ok(cal)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(r) = self.resolution {
            if !r.is_finite() || r <= 0.0 {
                return Err(Error::Options(format!("resolution must be a positive number of seconds, got {}", r)));
            }
        }
        if self.overflow_increment == Some(0) {
            return Err(Error::Options(String::from("overflow increment must be positive")));
        }
        Ok(())
    }
}

/// Creates an empty calibration. Hardware constants fill in the rest.
impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            resolution:         None,
            sync_rate:          0,
            channels:           0,
            sync_channel:       None,
            overflow_increment: None,
        }
    }
}
