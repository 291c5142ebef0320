//! Deserialization of canonical events written by [`crate::ser`]

use crate::ser::{BIN_SIZE, T2_SIZE, T3_SIZE};
use crate::{Error, Event, HistogramBin, Result, T2, T3};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;
use zstd::stream;

/// Read exactly one `N`-byte record. `Ok(None)` when the input ends cleanly
/// on a record boundary; ending partway through a record is an error.
pub fn read_record<const N: usize>(rdr: &mut impl Read) -> Result<Option<[u8; N]>> {
    let mut buf = [0u8; N];
    let mut n = 0;
    while n < N {
        match rdr.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(k) => n += k,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    match n {
        0 => Ok(None),
        _ if n == N => Ok(Some(buf)),
        read => Err(Error::Truncated { read, expected: N }),
    }
}

/// Open a file for reading, decompressing on the fly if it ends in `.zst`.
pub fn open(path: impl AsRef<Path>) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let f = BufReader::new(File::open(path)?);
    if path.extension().map_or(false, |e| e == "zst") {
        Ok(Box::new(stream::read::Decoder::new(f)?))
    } else {
        Ok(Box::new(f))
    }
}

/// Comma-separated reader without a header row
pub fn reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(rdr)
}

fn parse<T: FromStr>(record: &csv::StringRecord, i: usize, field: &'static str) -> Result<T> {
    let value = record.get(i).unwrap_or("");
    value.trim().parse::<T>().map_err(|_| Error::Parse { field, value: value.to_string() })
}

/// An event with a canonical text and binary form
pub trait Canonical: Event {
    fn from_csv(record: &csv::StringRecord) -> Result<Self>;
    fn read_binary(rdr: &mut impl Read) -> Result<Option<Self>>;
}

impl Canonical for T2 {
    fn from_csv(record: &csv::StringRecord) -> Result<Self> {
        Ok(T2 {
            channel: parse(record, 0, "channel")?,
            time: parse(record, 1, "time")?,
        })
    }

    fn read_binary(rdr: &mut impl Read) -> Result<Option<Self>> {
        Ok(read_record::<T2_SIZE>(rdr)?.map(|b| T2 {
            channel: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            time: le_u64(&b[8..16]),
        }))
    }
}

impl Canonical for T3 {
    fn from_csv(record: &csv::StringRecord) -> Result<Self> {
        Ok(T3 {
            channel: parse(record, 0, "channel")?,
            pulse: parse(record, 1, "pulse")?,
            time: parse(record, 2, "time")?,
        })
    }

    fn read_binary(rdr: &mut impl Read) -> Result<Option<Self>> {
        Ok(read_record::<T3_SIZE>(rdr)?.map(|b| T3 {
            channel: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            pulse: le_u64(&b[8..16]),
            time: le_u64(&b[16..24]),
        }))
    }
}

fn le_u64(b: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(b);
    u64::from_le_bytes(word)
}

/// Stream canonical events from comma-separated text.
pub fn csv_events<E: Canonical, R: Read>(rdr: csv::Reader<R>) -> impl Iterator<Item = Result<E>> {
    rdr.into_records().map(|r| E::from_csv(&r?))
}

/// Stream canonical events from fixed binary records.
pub fn binary_events<E: Canonical, R: Read>(mut rdr: R) -> impl Iterator<Item = Result<E>> {
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        match E::read_binary(&mut rdr) {
            Ok(Some(e)) => Some(Ok(e)),
            Ok(None) => {
                done = true;
                None
            }
            Err(e) => {
                done = true;
                Some(Err(e))
            }
        }
    })
}

/// Deserialize T2 events from comma-separated values (channel, time).
pub fn t2_csv(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<T2>> {
    let mut events = Vec::new();
    for result in rdr.records() {
        events.push(T2::from_csv(&result?)?);
    }
    Ok(events)
}

/// Deserialize T3 events from comma-separated values (channel, pulse, time).
pub fn t3_csv(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<T3>> {
    let mut events = Vec::new();
    for result in rdr.records() {
        events.push(T3::from_csv(&result?)?);
    }
    Ok(events)
}

pub fn t2_binary(rdr: &mut impl Read) -> Result<Vec<T2>> {
    let mut events = Vec::new();
    while let Some(e) = T2::read_binary(rdr)? {
        events.push(e);
    }
    Ok(events)
}

pub fn t3_binary(rdr: &mut impl Read) -> Result<Vec<T3>> {
    let mut events = Vec::new();
    while let Some(e) = T3::read_binary(rdr)? {
        events.push(e);
    }
    Ok(events)
}

/// Deserialize histogram bins from comma-separated values. Edges are read
/// in nanoseconds and stored in picoseconds, so text output loses anything
/// below 10 ps.
pub fn bin_csv(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<HistogramBin>> {
    let mut bins = Vec::new();
    for result in rdr.records() {
        let record = result?;
        bins.push(HistogramBin {
            curve: parse(&record, 0, "curve")?,
            bin_left: parse::<f64>(&record, 1, "bin_left")? * 1e3,
            bin_right: parse::<f64>(&record, 2, "bin_right")? * 1e3,
            counts: parse(&record, 3, "counts")?,
        });
    }
    Ok(bins)
}

pub fn bin_binary(rdr: &mut impl Read) -> Result<Vec<HistogramBin>> {
    let mut bins = Vec::new();
    while let Some(b) = read_record::<BIN_SIZE>(rdr)? {
        bins.push(HistogramBin {
            curve: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            bin_left: f64::from_bits(le_u64(&b[8..16])),
            bin_right: f64::from_bits(le_u64(&b[16..24])),
            counts: u32::from_le_bytes([b[24], b[25], b[26], b[27]]),
        });
    }
    Ok(bins)
}
