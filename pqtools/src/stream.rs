//! Stream driver: runs a record decoder to the end of its input, printing
//! canonical events and reporting markers and progress on the side

use crate::cfg::Calibration;
use crate::decode::{Decode, Record, RecordFormat, T2Format, T3Format};
use crate::ser::Printer;
use crate::tttr::Tttr;
use crate::{Error, Mode, Result, T2};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use tracing::debug;

/// Caller configuration for one stream
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Options {
    /// Stop after this many data records
    pub number: Option<u64>,
    pub binary_out: bool,
    /// Re-express T3 events as T2 times using the sync rate
    pub to_t2: bool,
    /// Report progress every this many data records
    pub print_every: Option<u64>,
}

/// Side channel for markers and progress, kept apart from the event output.
pub trait Diagnostics {
    fn marker(&mut self, value: u32) -> Result<()>;
    fn progress(&mut self, count: u64) -> Result<()>;
}

impl<D: Diagnostics + ?Sized> Diagnostics for &mut D {
    fn marker(&mut self, value: u32) -> Result<()> {
        (**self).marker(value)
    }

    fn progress(&mut self, count: u64) -> Result<()> {
        (**self).progress(count)
    }
}

/// Writes marker and progress lines as text, flushing each one.
pub struct TextDiagnostics<W: Write> {
    wtr: W,
    name: String,
}

impl<W: Write> TextDiagnostics<W> {
    pub fn new(wtr: W, name: impl Into<String>) -> Self {
        TextDiagnostics { wtr, name: name.into() }
    }

    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl TextDiagnostics<io::Stderr> {
    pub fn stderr(name: impl Into<String>) -> Self {
        TextDiagnostics::new(io::stderr(), name)
    }
}

impl<W: Write> Diagnostics for TextDiagnostics<W> {
    fn marker(&mut self, value: u32) -> Result<()> {
        writeln!(self.wtr, "External marker: {}", value)?;
        self.wtr.flush()?;
        Ok(())
    }

    fn progress(&mut self, count: u64) -> Result<()> {
        writeln!(
            self.wtr,
            "{}: ({}) Record {:>20}",
            Local::now().format("%Y.%m.%d %H.%M.%S"),
            self.name,
            count,
        )?;
        self.wtr.flush()?;
        Ok(())
    }
}

/// Drops everything.
pub struct Quiet;

impl Diagnostics for Quiet {
    fn marker(&mut self, _: u32) -> Result<()> {
        Ok(())
    }

    fn progress(&mut self, _: u64) -> Result<()> {
        Ok(())
    }
}

/// Counts from one finished stream
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Data records emitted
    pub records: u64,
    pub markers: u64,
    pub overflows: u64,
}

impl Summary {
    #[inline]
    fn data(&mut self, options: &Options, diag: &mut impl Diagnostics) -> Result<()> {
        self.records += 1;
        if let Some(n) = options.print_every {
            if n > 0 && self.records % n == 0 {
                diag.progress(self.records)?;
            }
        }
        Ok(())
    }
}

/// Decode T2 records until the input ends or the record limit is reached.
/// Nothing past the last counted record is read.
pub fn stream_t2<R: Read, W: Write, S: Diagnostics>(
    rdr: &mut R,
    printer: &mut Printer<W>,
    decoder: T2Format,
    tttr: &mut Tttr,
    options: &Options,
    diag: &mut S,
) -> Result<Summary> {
    let limit = options.number.unwrap_or(u64::MAX);
    let overflows = tttr.overflows;
    let mut summary = Summary::default();
    debug!("streaming {:?} records, limit {:?}", decoder, options.number);
    while summary.records < limit {
        match decoder.decode(rdr, tttr)? {
            Some(Record::Data(e)) => {
                printer.t2(&e)?;
                summary.data(options, diag)?;
            }
            Some(Record::Marker(m)) => {
                summary.markers += 1;
                diag.marker(m)?;
            }
            Some(Record::Overflow) => {}
            None => break,
        }
    }
    printer.flush()?;
    summary.overflows = tttr.overflows - overflows;
    debug!("{:?}", summary);
    Ok(summary)
}

/// Decode T3 records until the input ends or the record limit is reached,
/// optionally converting each sync pulse to a T2 time.
pub fn stream_t3<R: Read, W: Write, S: Diagnostics>(
    rdr: &mut R,
    printer: &mut Printer<W>,
    decoder: T3Format,
    tttr: &mut Tttr,
    options: &Options,
    diag: &mut S,
) -> Result<Summary> {
    if options.to_t2 {
        if decoder == T3Format::TimeHarp200 {
            return Err(Error::Options(String::from(
                "conversion to t2 is not supported for timeharp-200 records",
            )));
        }
        tttr.require_sync_rate()?;
    }
    let limit = options.number.unwrap_or(u64::MAX);
    let overflows = tttr.overflows;
    let mut summary = Summary::default();
    debug!("streaming {:?} records, limit {:?}, to t2 {}", decoder, options.number, options.to_t2);
    while summary.records < limit {
        match decoder.decode(rdr, tttr)? {
            Some(Record::Data(e)) => {
                if options.to_t2 {
                    printer.t2(&T2 { channel: e.channel, time: tttr.pulse_to_time(e.pulse) })?;
                } else {
                    printer.t3(&e)?;
                }
                summary.data(options, diag)?;
            }
            Some(Record::Marker(m)) => {
                summary.markers += 1;
                diag.marker(m)?;
            }
            Some(Record::Overflow) => {}
            None => break,
        }
    }
    printer.flush()?;
    summary.overflows = tttr.overflows - overflows;
    debug!("{:?}", summary);
    Ok(summary)
}

/// Set up the decoder and state for `format` and stream `rdr` to `wtr`.
pub fn stream<R: Read, W: Write, S: Diagnostics>(
    rdr: &mut R,
    wtr: W,
    format: RecordFormat,
    cal: &Calibration,
    options: &Options,
    diag: &mut S,
) -> Result<Summary> {
    let mut tttr = format.tttr(cal)?;
    let mut printer = Printer::new(wtr, options.binary_out);
    match format.mode() {
        Mode::T2 => {
            if options.to_t2 {
                debug!("{} is already t2; ignoring conversion", format);
            }
            stream_t2(rdr, &mut printer, format.t2()?, &mut tttr, options, diag)
        }
        Mode::T3 => stream_t3(rdr, &mut printer, format.t3()?, &mut tttr, options, diag),
    }
}
