//! Serialization of canonical events, as comma-separated text or as fixed
//! little-endian binary records

use crate::{HistogramBin, Result, T2, T3};
use std::io::Write;

/// Bytes per binary T2 record: channel, pad, time
pub const T2_SIZE: usize = 16;
/// Bytes per binary T3 record: channel, pad, pulse, time
pub const T3_SIZE: usize = 24;
/// Bytes per binary histogram bin: curve, pad, left, right, counts, pad
pub const BIN_SIZE: usize = 32;

/// Output sink chosen once per stream.
pub enum Printer<W: Write> {
    Ascii(csv::Writer<W>),
    Binary(W),
}

impl<W: Write> Printer<W> {
    pub fn new(wtr: W, binary: bool) -> Self {
        if binary {
            Printer::Binary(wtr)
        } else {
            Printer::Ascii(writer(wtr))
        }
    }

    #[inline]
    pub fn t2(&mut self, e: &T2) -> Result<()> {
        match self {
            Printer::Ascii(w) => t2_csv(w, e),
            Printer::Binary(w) => t2_binary(w, e),
        }
    }

    #[inline]
    pub fn t3(&mut self, e: &T3) -> Result<()> {
        match self {
            Printer::Ascii(w) => t3_csv(w, e),
            Printer::Binary(w) => t3_binary(w, e),
        }
    }

    pub fn bin(&mut self, b: &HistogramBin) -> Result<()> {
        match self {
            Printer::Ascii(w) => bin_csv(w, b),
            Printer::Binary(w) => bin_binary(w, b),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        match self {
            Printer::Ascii(w) => w.flush()?,
            Printer::Binary(w) => w.flush()?,
        }
        Ok(())
    }

    /// Flush and give back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        match self {
            Printer::Ascii(w) => w.into_inner().map_err(|e| e.into_error().into()),
            Printer::Binary(mut w) => {
                w.flush()?;
                Ok(w)
            }
        }
    }
}

/// Events a [`Printer`] knows how to write
pub trait Printable {
    fn print<W: Write>(&self, printer: &mut Printer<W>) -> Result<()>;
}

impl Printable for T2 {
    fn print<W: Write>(&self, printer: &mut Printer<W>) -> Result<()> {
        printer.t2(self)
    }
}

impl Printable for T3 {
    fn print<W: Write>(&self, printer: &mut Printer<W>) -> Result<()> {
        printer.t3(self)
    }
}

impl Printable for HistogramBin {
    fn print<W: Write>(&self, printer: &mut Printer<W>) -> Result<()> {
        printer.bin(self)
    }
}

/// Comma-separated writer without a header row
pub fn writer<W: Write>(wtr: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(wtr)
}

/// Serialize one event as `channel,time`.
pub fn t2_csv(wtr: &mut csv::Writer<impl Write>, e: &T2) -> Result<()> {
    wtr.write_record(&[e.channel.to_string(), e.time.to_string()])?;
    Ok(())
}

/// Serialize one event as `channel,pulse,time`.
pub fn t3_csv(wtr: &mut csv::Writer<impl Write>, e: &T3) -> Result<()> {
    wtr.write_record(&[e.channel.to_string(), e.pulse.to_string(), e.time.to_string()])?;
    Ok(())
}

/// Serialize one bin as `curve,left,right,counts` with the edges in
/// nanoseconds to two decimals.
pub fn bin_csv(wtr: &mut csv::Writer<impl Write>, b: &HistogramBin) -> Result<()> {
    wtr.write_record(&[
        b.curve.to_string(),
        format!("{:.2}", b.bin_left * 1e-3),
        format!("{:.2}", b.bin_right * 1e-3),
        b.counts.to_string(),
    ])?;
    Ok(())
}

pub fn t2_binary(wtr: &mut impl Write, e: &T2) -> Result<()> {
    let mut buf = [0u8; T2_SIZE];
    buf[0..4].copy_from_slice(&e.channel.to_le_bytes());
    buf[8..16].copy_from_slice(&e.time.to_le_bytes());
    wtr.write_all(&buf)?;
    Ok(())
}

pub fn t3_binary(wtr: &mut impl Write, e: &T3) -> Result<()> {
    let mut buf = [0u8; T3_SIZE];
    buf[0..4].copy_from_slice(&e.channel.to_le_bytes());
    buf[8..16].copy_from_slice(&e.pulse.to_le_bytes());
    buf[16..24].copy_from_slice(&e.time.to_le_bytes());
    wtr.write_all(&buf)?;
    Ok(())
}

/// Bin edges stay in picoseconds in the binary layout.
pub fn bin_binary(wtr: &mut impl Write, b: &HistogramBin) -> Result<()> {
    let mut buf = [0u8; BIN_SIZE];
    buf[0..4].copy_from_slice(&b.curve.to_le_bytes());
    buf[8..16].copy_from_slice(&b.bin_left.to_le_bytes());
    buf[16..24].copy_from_slice(&b.bin_right.to_le_bytes());
    buf[24..28].copy_from_slice(&b.counts.to_le_bytes());
    wtr.write_all(&buf)?;
    Ok(())
}

/// Time resolution in picoseconds: two decimals on a line, or a bare
/// little-endian `f64` in binary.
pub fn resolution(wtr: &mut impl Write, ps: f64, binary: bool) -> Result<()> {
    if binary {
        wtr.write_all(&ps.to_le_bytes())?;
    } else {
        writeln!(wtr, "{:.2}", ps)?;
    }
    Ok(())
}
