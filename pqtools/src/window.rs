//! Fixed-width time windows over a sorted event stream
//!
//! Windows are half-open, `[lower, upper)`, and every upper bound falls on a
//! multiple of the width. A configured start that is off that grid only
//! shortens the first window. The axis is the event's [`Event::key`]: time in
//! picoseconds for T2, sync pulse for T3.

use crate::{Error, Event, Result};
use serde::{Deserialize, Serialize};
use std::cmp::min;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Options {
    /// Events below this are reported as before the range
    pub start: Option<u64>,
    /// The stream ends at the first event at or above this
    pub stop: Option<u64>,
    /// Zero means a single unbounded window
    pub bin_width: u64,
    pub count_all: bool,
}

impl Options {
    pub fn width(&self) -> u64 {
        if self.count_all { 0 } else { self.bin_width }
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(stop)) = (self.start, self.stop) {
            if start >= stop {
                return Err(Error::Options(format!("start {} must be below stop {}", start, stop)));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Window {
    pub lower: u64,
    pub upper: u64,
    /// Zero in count-all mode
    pub width: u64,
    pub stop: Option<u64>,
}

impl Window {
    /// First window for a stream whose first in-range value is `first`.
    /// Without a configured start the window is aligned down to a multiple
    /// of the width; with one it runs from the start to the next multiple.
    pub fn init(first: u64, options: &Options) -> Self {
        let width = options.width();
        let lower = match options.start {
            Some(start) => start,
            None if width == 0 => first,
            None => first / width * width,
        };
        let mut w = Window { lower, upper: lower, width, stop: options.stop };
        w.upper = w.next_upper(lower);
        w
    }

    /// Move to the next contiguous window.
    pub fn advance(&mut self) {
        self.lower = self.upper;
        self.upper = self.next_upper(self.upper);
    }

    fn next_upper(&self, from: u64) -> u64 {
        let limit = self.stop.unwrap_or(u64::MAX);
        if self.width == 0 {
            limit
        } else {
            let next = (from / self.width).saturating_add(1).saturating_mul(self.width);
            min(next, limit)
        }
    }

    pub fn contains(&self, value: u64) -> bool {
        self.lower <= value && value < self.upper
    }

    pub fn is_count_all(&self) -> bool {
        self.width == 0
    }
}

/// Outcome of asking for the next event of the current window
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Next<E> {
    Delivered(E),
    /// Below the configured start; consumed but outside every window
    BeforeStart(E),
    /// The next event belongs to a later window. It is kept for the call
    /// after [`Windowed::advance`].
    WindowBoundary,
    StreamEnded,
}

/// An event stream cut into windows
pub struct Windowed<I, E> {
    events: I,
    options: Options,
    window: Option<Window>,
    pending: Option<E>,
    ended: bool,
}

impl<I, E> Windowed<I, E>
where
    I: Iterator<Item = Result<E>>,
    E: Event,
{
    pub fn new(events: I, options: Options) -> Result<Self> {
        options.validate()?;
        Ok(Windowed { events, options, window: None, pending: None, ended: false })
    }

    /// The current window, once the first in-range event has been seen
    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn advance(&mut self) {
        if let Some(w) = self.window.as_mut() {
            w.advance();
            debug!("window [{}, {})", w.lower, w.upper);
        }
    }

    /// Open the first window at the configured start if no event has.
    /// Returns whether a window is now open.
    pub fn open_at_start(&mut self) -> bool {
        if self.window.is_none() {
            if let Some(start) = self.options.start {
                self.window = Some(Window::init(start, &self.options));
            }
        }
        self.window.is_some()
    }

    pub fn next_in_window(&mut self) -> Result<Next<E>> {
        if self.ended {
            return Ok(Next::StreamEnded);
        }
        let e = match self.pending.take() {
            Some(e) => e,
            None => match self.events.next() {
                Some(r) => r?,
                None => {
                    self.ended = true;
                    return Ok(Next::StreamEnded);
                }
            },
        };
        let value = e.key();
        if let Some(start) = self.options.start {
            if value < start {
                return Ok(Next::BeforeStart(e));
            }
        }
        if let Some(stop) = self.options.stop {
            if value >= stop {
                self.ended = true;
                return Ok(Next::StreamEnded);
            }
        }
        let options = &self.options;
        let w = self.window.get_or_insert_with(|| Window::init(value, options));
        if w.is_count_all() {
            return Ok(Next::Delivered(e));
        }
        if value >= w.upper {
            self.pending = Some(e);
            return Ok(Next::WindowBoundary);
        }
        if value < w.lower {
            return Err(Error::OutOfOrder { value, lower: w.lower, upper: w.upper });
        }
        Ok(Next::Delivered(e))
    }
}

/// Per-channel event counts of one window
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Counts {
    pub lower: u64,
    pub upper: u64,
    pub counts: Vec<u64>,
}

/// Per-window, per-channel counts over an event stream. Windows without
/// events are reported too, and once the input runs out empty windows
/// continue up to the configured stop.
pub struct Intensity<I, E> {
    windowed: Windowed<I, E>,
    counts: Vec<u64>,
    draining: bool,
    finished: bool,
}

impl<I, E> Intensity<I, E>
where
    I: Iterator<Item = Result<E>>,
    E: Event,
{
    pub fn new(events: I, channels: usize, options: Options) -> Result<Self> {
        Ok(Intensity {
            windowed: Windowed::new(events, options)?,
            counts: vec![0; channels],
            draining: false,
            finished: false,
        })
    }

    fn take(&mut self) -> Option<Counts> {
        let w = *self.windowed.window()?;
        let channels = self.counts.len();
        let counts = std::mem::replace(&mut self.counts, vec![0; channels]);
        Some(Counts { lower: w.lower, upper: w.upper, counts })
    }

    fn drain(&mut self) -> Option<Counts> {
        let w = *self.windowed.window()?;
        match w.stop {
            Some(stop) if !w.is_count_all() && w.upper < stop => {
                self.windowed.advance();
                self.take()
            }
            _ => None,
        }
    }
}

impl<I, E> Iterator for Intensity<I, E>
where
    I: Iterator<Item = Result<E>>,
    E: Event,
{
    type Item = Result<Counts>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.draining {
            let out = self.drain();
            self.finished = out.is_none();
            return out.map(Ok);
        }
        loop {
            match self.windowed.next_in_window() {
                Ok(Next::Delivered(e)) => {
                    let ch = e.channel() as usize;
                    match self.counts.get_mut(ch) {
                        Some(c) => *c += 1,
                        None => debug!("ignoring event on channel {}", ch),
                    }
                }
                Ok(Next::BeforeStart(_)) => {}
                Ok(Next::WindowBoundary) => {
                    let out = self.take();
                    self.windowed.advance();
                    return out.map(Ok);
                }
                Ok(Next::StreamEnded) => {
                    self.draining = true;
                    if !self.windowed.open_at_start() {
                        self.finished = true;
                        return None;
                    }
                    return self.take().map(Ok);
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
