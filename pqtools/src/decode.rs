//! Record decoders for the supported hardware and measurement modes
//!
//! Every supported record is one little-endian 32-bit word. The layouts
//! below list fields from the least significant bit upwards.
//!
//! | Layout          | Fields (LSB first)                          |
//! |-----------------|---------------------------------------------|
//! | PicoHarp T2     | time 28, channel 4                          |
//! | PicoHarp T3     | nsync 16, dtime 12, channel 4               |
//! | HydraHarp T2    | time 25, channel 6, special 1               |
//! | HydraHarp T3    | nsync 10, dtime 15, channel 6, special 1    |
//! | TimeHarp 200    | timetag 16, data 12, route 2, valid 1, -- 1 |
//!
//! TimeHarp 260 records share the HydraHarp v2 layouts.

use crate::bit::{BitField, Field};
use crate::cfg::Calibration;
use crate::de::read_record;
use crate::stream::Diagnostics;
use crate::tttr::Tttr;
use crate::{Error, Event, Mode, Result, T2, T3};
use std::fmt;
use std::io::Read;
use std::str::FromStr;
use tracing::{debug, warn};

/// Size in bytes of one raw record
pub const RECORD_SIZE: usize = 4;

pub const PH_BASE_RESOLUTION: f64 = 4e-12;
pub const HH_BASE_RESOLUTION: f64 = 1e-12;

pub const PH_T2_OVERFLOW: u64 = 210_698_240;
pub const PH_T3_OVERFLOW: u64 = 65_536;
pub const HH_V1_T2_OVERFLOW: u64 = 33_552_000;
pub const HH_V2_T2_OVERFLOW: u64 = 33_554_432;
pub const HH_T3_OVERFLOW: u64 = 1_024;
pub const TH_OVERFLOW: u64 = 65_536;

pub const PH_T2_TIME: Field = Field::new(0, 28);
pub const PH_T2_CHANNEL: Field = Field::new(PH_T2_TIME.next(), 4);

pub const PH_T3_NSYNC: Field = Field::new(0, 16);
pub const PH_T3_DTIME: Field = Field::new(PH_T3_NSYNC.next(), 12);
pub const PH_T3_CHANNEL: Field = Field::new(PH_T3_DTIME.next(), 4);

pub const HH_T2_TIME: Field = Field::new(0, 25);
pub const HH_T2_CHANNEL: Field = Field::new(HH_T2_TIME.next(), 6);

pub const HH_T3_NSYNC: Field = Field::new(0, 10);
pub const HH_T3_DTIME: Field = Field::new(HH_T3_NSYNC.next(), 15);
pub const HH_T3_CHANNEL: Field = Field::new(HH_T3_DTIME.next(), 6);

pub const HH_SPECIAL: Field = Field::new(31, 1);

pub const TH_TIMETAG: Field = Field::new(0, 16);
pub const TH_DATA: Field = Field::new(TH_TIMETAG.next(), 12);
pub const TH_ROUTE: Field = Field::new(TH_DATA.next(), 2);
pub const TH_VALID: Field = Field::new(TH_ROUTE.next(), 1);

const PH_SPECIAL_CHANNEL: u32 = 15;
const HH_OVERFLOW_CHANNEL: u32 = 63;
const HH_SYNC_CHANNEL: u32 = 0;
const TH_OVERFLOW_FLAG: u32 = 0x800;
const TH_MARKER_MASK: u32 = 0x7;

/// Classification of one raw record
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Record<E> {
    Data(E),
    /// External marker with its bit pattern; does not move the origin
    Marker(u32),
    Overflow,
}

/// Read one record word. `Ok(None)` at a clean end of input; a partial
/// record is an error since the stream was cut inside a record.
pub fn read_word(rdr: &mut impl Read) -> Result<Option<u32>> {
    Ok(read_record::<RECORD_SIZE>(rdr)?.map(u32::from_le_bytes))
}

/// A record decoder for one hardware layout and mode.
pub trait Decode {
    type Event: Event;

    fn mode(&self) -> Mode;

    /// Classify one raw word, updating the stream state.
    fn decode_word(&self, word: u32, tttr: &mut Tttr) -> Record<Self::Event>;

    /// Read and classify the next record, `Ok(None)` at end of stream.
    fn decode<R: Read>(&self, rdr: &mut R, tttr: &mut Tttr) -> Result<Option<Record<Self::Event>>> {
        Ok(read_word(rdr)?.map(|w| self.decode_word(w, tttr)))
    }
}

/// T2 record layouts
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum T2Format {
    PicoHarp,
    /// First-generation HydraHarp: one wrap per overflow record, and ticks
    /// counted at twice the reported resolution.
    HydraHarpV1,
    /// HydraHarp v2 and TimeHarp 260: overflow records carry a wrap count.
    HydraHarpV2,
}

/// T3 record layouts
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum T3Format {
    PicoHarp,
    HydraHarpV1,
    HydraHarpV2,
    /// TimeHarp 200 TTTR records; the route bits select the channel
    TimeHarp200,
}

impl Decode for T2Format {
    type Event = T2;

    fn mode(&self) -> Mode {
        Mode::T2
    }

    fn decode_word(&self, w: u32, tttr: &mut Tttr) -> Record<T2> {
        match self {
            T2Format::PicoHarp => {
                let channel = w.field(PH_T2_CHANNEL);
                let time = w.field(PH_T2_TIME);
                if channel == PH_SPECIAL_CHANNEL {
                    let markers = time & 0xF;
                    if markers == 0 {
                        tttr.overflow(1);
                        Record::Overflow
                    } else {
                        Record::Marker(markers)
                    }
                } else {
                    Record::Data(T2 {
                        channel,
                        time: tttr.absolute(time as u64).saturating_mul(tttr.resolution_int),
                    })
                }
            }
            T2Format::HydraHarpV1 | T2Format::HydraHarpV2 => {
                let v1 = *self == T2Format::HydraHarpV1;
                let channel = w.field(HH_T2_CHANNEL);
                let time = w.field(HH_T2_TIME);
                let to_ps = |tttr: &Tttr| {
                    let ps = tttr.absolute(time as u64).saturating_mul(tttr.resolution_int);
                    if v1 { ps / 2 } else { ps }
                };
                if w.check(HH_SPECIAL.lsb) {
                    match channel {
                        HH_OVERFLOW_CHANNEL => {
                            tttr.overflow(if v1 { 1 } else { time as u64 });
                            Record::Overflow
                        }
                        HH_SYNC_CHANNEL => Record::Data(T2 {
                            channel: tttr.sync_channel,
                            time: to_ps(&*tttr),
                        }),
                        marker => Record::Marker(marker),
                    }
                } else {
                    Record::Data(T2 { channel, time: to_ps(&*tttr) })
                }
            }
        }
    }
}

impl Decode for T3Format {
    type Event = T3;

    fn mode(&self) -> Mode {
        Mode::T3
    }

    fn decode_word(&self, w: u32, tttr: &mut Tttr) -> Record<T3> {
        match self {
            T3Format::PicoHarp => {
                let channel = w.field(PH_T3_CHANNEL);
                let dtime = w.field(PH_T3_DTIME);
                if channel == PH_SPECIAL_CHANNEL {
                    if dtime == 0 {
                        tttr.overflow(1);
                        Record::Overflow
                    } else {
                        Record::Marker(dtime)
                    }
                } else {
                    Record::Data(T3 {
                        channel,
                        pulse: tttr.absolute(w.field(PH_T3_NSYNC) as u64),
                        time: dtime as u64 * tttr.resolution_int,
                    })
                }
            }
            T3Format::HydraHarpV1 | T3Format::HydraHarpV2 => {
                let channel = w.field(HH_T3_CHANNEL);
                let nsync = w.field(HH_T3_NSYNC);
                if w.check(HH_SPECIAL.lsb) {
                    if channel == HH_OVERFLOW_CHANNEL {
                        let n = if *self == T3Format::HydraHarpV1 { 1 } else { nsync as u64 };
                        tttr.overflow(n);
                        Record::Overflow
                    } else {
                        Record::Marker(channel)
                    }
                } else {
                    Record::Data(T3 {
                        channel,
                        pulse: tttr.absolute(nsync as u64),
                        time: w.field(HH_T3_DTIME) as u64 * tttr.resolution_int,
                    })
                }
            }
            T3Format::TimeHarp200 => {
                let data = w.field(TH_DATA);
                if w.check(TH_VALID.lsb) {
                    Record::Data(T3 {
                        channel: w.field(TH_ROUTE),
                        pulse: tttr.absolute(w.field(TH_TIMETAG) as u64),
                        time: data as u64 * tttr.resolution_int,
                    })
                } else if data & TH_OVERFLOW_FLAG != 0 {
                    tttr.overflow(1);
                    Record::Overflow
                } else {
                    Record::Marker(data & TH_MARKER_MASK)
                }
            }
        }
    }
}

/// A hardware family, generation and measurement mode
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum RecordFormat {
    PicoHarpT2,
    PicoHarpT3,
    HydraHarpV1T2,
    HydraHarpV1T3,
    HydraHarpV2T2,
    HydraHarpV2T3,
    TimeHarp260NT2,
    TimeHarp260NT3,
    TimeHarp260PT2,
    TimeHarp260PT3,
    TimeHarp200,
}

/// Name and unified-file record type code of every format
static FORMATS: [(RecordFormat, &str, Option<u32>); 11] = [
    (RecordFormat::PicoHarpT2, "picoharp-t2", Some(0x0001_0203)),
    (RecordFormat::PicoHarpT3, "picoharp-t3", Some(0x0001_0303)),
    (RecordFormat::HydraHarpV1T2, "hydraharp-v1-t2", Some(0x0001_0204)),
    (RecordFormat::HydraHarpV1T3, "hydraharp-v1-t3", Some(0x0001_0304)),
    (RecordFormat::HydraHarpV2T2, "hydraharp-v2-t2", Some(0x0101_0204)),
    (RecordFormat::HydraHarpV2T3, "hydraharp-v2-t3", Some(0x0101_0304)),
    (RecordFormat::TimeHarp260NT2, "timeharp-260n-t2", Some(0x0001_0205)),
    (RecordFormat::TimeHarp260NT3, "timeharp-260n-t3", Some(0x0001_0305)),
    (RecordFormat::TimeHarp260PT2, "timeharp-260p-t2", Some(0x0001_0206)),
    (RecordFormat::TimeHarp260PT3, "timeharp-260p-t3", Some(0x0001_0306)),
    (RecordFormat::TimeHarp200, "timeharp-200", None),
];

impl RecordFormat {
    /// Look up the format of a unified (.ptu) file's record type tag
    pub fn from_record_type(code: u32) -> Result<Self> {
        FORMATS
            .iter()
            .find(|(_, _, c)| *c == Some(code))
            .map(|(f, _, _)| *f)
            .ok_or(Error::UnknownRecordType(code))
    }

    pub fn record_type(&self) -> Option<u32> {
        self.entry().2
    }

    pub fn name(&self) -> &'static str {
        self.entry().1
    }

    fn entry(&self) -> &(RecordFormat, &'static str, Option<u32>) {
        // Every variant is listed in FORMATS
        &FORMATS[*self as usize]
    }

    pub fn mode(&self) -> Mode {
        match self {
            RecordFormat::PicoHarpT2
            | RecordFormat::HydraHarpV1T2
            | RecordFormat::HydraHarpV2T2
            | RecordFormat::TimeHarp260NT2
            | RecordFormat::TimeHarp260PT2 => Mode::T2,
            _ => Mode::T3,
        }
    }

    /// The T2 decoder for this format, or a mode error for T3 formats
    pub fn t2(&self) -> Result<T2Format> {
        match self {
            RecordFormat::PicoHarpT2 => Ok(T2Format::PicoHarp),
            RecordFormat::HydraHarpV1T2 => Ok(T2Format::HydraHarpV1),
            RecordFormat::HydraHarpV2T2
            | RecordFormat::TimeHarp260NT2
            | RecordFormat::TimeHarp260PT2 => Ok(T2Format::HydraHarpV2),
            _ => Err(Error::Mode(format!("{} is not a t2 format", self))),
        }
    }

    /// The T3 decoder for this format, or a mode error for T2 formats
    pub fn t3(&self) -> Result<T3Format> {
        match self {
            RecordFormat::PicoHarpT3 => Ok(T3Format::PicoHarp),
            RecordFormat::HydraHarpV1T3 => Ok(T3Format::HydraHarpV1),
            RecordFormat::HydraHarpV2T3
            | RecordFormat::TimeHarp260NT3
            | RecordFormat::TimeHarp260PT3 => Ok(T3Format::HydraHarpV2),
            RecordFormat::TimeHarp200 => Ok(T3Format::TimeHarp200),
            _ => Err(Error::Mode(format!("{} is not a t3 format", self))),
        }
    }

    /// Ticks added per counter wrap
    pub fn overflow_increment(&self) -> u64 {
        match self {
            RecordFormat::PicoHarpT2 => PH_T2_OVERFLOW,
            RecordFormat::PicoHarpT3 => PH_T3_OVERFLOW,
            RecordFormat::HydraHarpV1T2 => HH_V1_T2_OVERFLOW,
            RecordFormat::HydraHarpV2T2
            | RecordFormat::TimeHarp260NT2
            | RecordFormat::TimeHarp260PT2 => HH_V2_T2_OVERFLOW,
            RecordFormat::HydraHarpV1T3
            | RecordFormat::HydraHarpV2T3
            | RecordFormat::TimeHarp260NT3
            | RecordFormat::TimeHarp260PT3 => HH_T3_OVERFLOW,
            RecordFormat::TimeHarp200 => TH_OVERFLOW,
        }
    }

    /// Resolution fixed by the hardware, for formats whose tick does not
    /// depend on the measurement settings
    pub fn base_resolution(&self) -> Option<f64> {
        match self {
            RecordFormat::PicoHarpT2 => Some(PH_BASE_RESOLUTION),
            RecordFormat::HydraHarpV1T2 | RecordFormat::HydraHarpV2T2 => Some(HH_BASE_RESOLUTION),
            _ => None,
        }
    }

    /// Whether T3 pulses may be converted to T2 times
    pub fn supports_to_t2(&self) -> bool {
        self.mode() == Mode::T3 && *self != RecordFormat::TimeHarp200
    }

    /// Initial stream state from the calibration values
    pub fn tttr(&self, cal: &Calibration) -> Result<Tttr> {
        cal.validate()?;
        let resolution = match (self.base_resolution(), cal.resolution) {
            (Some(base), Some(r)) => {
                if r != base {
                    warn!("{} has a fixed resolution of {} s, ignoring {} s", self, base, r);
                }
                base
            }
            (Some(base), None) => base,
            (None, Some(r)) => r,
            (None, None) => {
                return Err(Error::Options(format!("{} needs a resolution in its calibration", self)))
            }
        };
        let tttr = Tttr::new(
            cal.sync_channel.unwrap_or(cal.channels),
            cal.overflow_increment.unwrap_or_else(|| self.overflow_increment()),
            cal.sync_rate,
            resolution,
        );
        if tttr.resolution_int == 0 {
            warn!("resolution {} s is below one picosecond; times will truncate to zero", resolution);
        }
        debug!(
            "{}: resolution {} ps, overflow increment {}, sync rate {} Hz",
            self, tttr.resolution_int, tttr.overflow_increment, tttr.sync_rate,
        );
        Ok(tttr)
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parse a format name such as `hydraharp-v2-t3`, or a record type code
/// written in hex (`0x01010304`).
impl FromStr for RecordFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let code = u32::from_str_radix(hex, 16).map_err(|_| Error::Parse {
                field: "record type",
                value: s.to_string(),
            })?;
            return RecordFormat::from_record_type(code);
        }
        let lower = s.to_ascii_lowercase();
        FORMATS
            .iter()
            .find(|(_, name, _)| *name == lower)
            .map(|(f, _, _)| *f)
            .ok_or_else(|| Error::Mode(format!("hardware format not recognized: {}", s)))
    }
}

/// Data events of a raw record stream, in order of arrival. Overflows are
/// absorbed into the state and markers go to the diagnostics sink. The
/// iterator ends after the first error.
pub struct Events<R, D, S> {
    rdr: R,
    decoder: D,
    tttr: Tttr,
    diag: S,
    done: bool,
}

impl<R: Read, D: Decode, S: Diagnostics> Events<R, D, S> {
    pub fn new(rdr: R, decoder: D, tttr: Tttr, diag: S) -> Self {
        Events { rdr, decoder, tttr, diag, done: false }
    }

    pub fn tttr(&self) -> &Tttr {
        &self.tttr
    }
}

impl<R: Read, D: Decode, S: Diagnostics> Iterator for Events<R, D, S> {
    type Item = Result<D::Event>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let record = self.decoder.decode(&mut self.rdr, &mut self.tttr);
            match record {
                Ok(Some(Record::Data(e))) => return Some(Ok(e)),
                Ok(Some(Record::Marker(m))) => {
                    if let Err(e) = self.diag.marker(m) {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
                Ok(Some(Record::Overflow)) => {}
                Ok(None) => self.done = true,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
