pub mod bit;
pub mod cfg;
pub mod de;
pub mod decode;
pub mod error;
pub mod queue;
pub mod ser;
pub mod stream;
pub mod tttr;
pub mod window;

pub use error::{Error, Result};

use std::cmp::Ordering;
use std::fmt::Debug;

/// A photon recorded in T2 mode
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, Debug)]
pub struct T2 {
    /// Input channel, or the sync pseudo-channel
    pub channel: u32,
    /// Absolute arrival time in picoseconds since the start of the stream
    pub time: u64,
}

/// A photon recorded in T3 mode
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, Debug)]
pub struct T3 {
    pub channel: u32,
    /// Absolute index of the sync pulse preceding the photon
    pub pulse: u64,
    /// Delay after the sync pulse in picoseconds
    pub time: u64,
}

/// One bin of an interactive-mode histogram curve
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct HistogramBin {
    pub curve: u32,
    /// Left bin edge in picoseconds
    pub bin_left: f64,
    /// Right bin edge in picoseconds
    pub bin_right: f64,
    pub counts: u32,
}

/// Common view of T2 and T3 events used by the windowing and queueing tools.
pub trait Event: Copy + Default + Debug {
    fn channel(&self) -> u32;

    /// Position on the stream's natural axis: time for T2, pulse for T3.
    fn key(&self) -> u64;

    /// Chronological order of two events.
    ///
    /// Implemented with relational comparisons only: the difference of two
    /// `u64` times does not fit in an `i64` in general.
    fn cmp_time(&self, other: &Self) -> Ordering;
}

impl Event for T2 {
    #[inline]
    fn channel(&self) -> u32 {
        self.channel
    }

    #[inline]
    fn key(&self) -> u64 {
        self.time
    }

    #[inline]
    fn cmp_time(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time)
    }
}

impl Event for T3 {
    #[inline]
    fn channel(&self) -> u32 {
        self.channel
    }

    #[inline]
    fn key(&self) -> u64 {
        self.pulse
    }

    #[inline]
    fn cmp_time(&self, other: &Self) -> Ordering {
        self.pulse
            .cmp(&other.pulse)
            .then_with(|| self.time.cmp(&other.time))
    }
}

/// Acquisition mode of a record stream
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Mode {
    T2,
    T3,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::T2 => write!(f, "t2"),
            Mode::T3 => write!(f, "t3"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "t2" => Ok(Mode::T2),
            "t3" => Ok(Mode::T3),
            _ => Err(Error::Mode(format!("mode not recognized: {}", s))),
        }
    }
}

/// Picoseconds per second, for converting sync rates and resolutions
pub const PS_PER_S: f64 = 1e12;
