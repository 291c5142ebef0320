use argh::FromArgs;
use anyhow::{bail, Result};
use either::{Left, Right};
use std::fs::{self, File};
use std::io::{self, stdin, stdout, BufReader, BufWriter, Read, Write};
use tracing::{debug, Level};

use pqtools::de::{self, Canonical};
use pqtools::window::{Intensity, Options};
use pqtools::{ser, Mode, T2, T3};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(Debug, FromArgs, Clone)]
/// Count canonical t2 or t3 events per channel in fixed-width windows and
/// print one "lower,upper,count_0,...,count_n" row per window. Windows are
/// measured in picoseconds for t2 and in sync pulses for t3. The input must
/// be sorted.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// event mode of the input, t2 or t3
    #[argh(option, short = 'm', default = "Mode::T2")]
    pub mode: Mode,
    /// read fixed binary records instead of text
    #[argh(switch, short = 'b')]
    pub binary: bool,
    /// number of channels to count
    #[argh(option, short = 'c', default = "2")]
    pub channels: usize,
    /// width of each window
    #[argh(option, short = 'w', default = "0")]
    pub bin_width: u64,
    /// count everything in a single window
    #[argh(switch)]
    pub count_all: bool,
    /// ignore events before this point
    #[argh(option)]
    pub start: Option<u64>,
    /// stop at the first event at or after this point
    #[argh(option)]
    pub stop: Option<u64>,
    /// file to write output to (writes to standard output by default)
    #[argh(option, short = 'o')]
    pub out: Option<String>,
    /// log debugging information to standard error
    #[argh(switch)]
    pub verbose: bool,
    /// with no input or when input is '-', read from standard input;
    /// files ending in .zst are decompressed
    #[argh(positional)]
    pub input: Option<String>,
}

fn main() -> Result<()> {
    let args: CliArgs = argh::from_env();
    if args.version {
        let stdout = stdout();
        let mut stdout = stdout.lock();
        writeln!(
            stdout,
            concat!(
                env!("CARGO_BIN_NAME"),
                " ",
                "{}",
            ),
            GIT_VERSION,
        )?;
        return Ok(())
    }

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    if args.bin_width == 0 && !args.count_all {
        bail!("specify a nonzero --bin-width or --count-all");
    }
    let options = Options {
        start: args.start,
        stop: args.stop,
        bin_width: args.bin_width,
        count_all: args.count_all,
    };
    options.validate()?;
    debug!("{:?}", options);

    let input = match args.input.as_deref() {
        None | Some("-") => Left(()),
        Some(i) => match fs::metadata(i) {
            Ok(m) => {
                if m.is_file() {
                    Right(i.to_string())
                } else {
                    bail!("{} is not a file", i);
                }
            },
            Err(e) => bail!(e),
        },
    };
    let rdr: Box<dyn Read> = match input {
        Left(()) => Box::new(BufReader::new(stdin())),
        Right(path) => de::open(path)?,
    };

    let stdout = stdout();
    let wtr: Box<dyn Write> = match args.out {
        None => Box::new(BufWriter::new(stdout.lock())),
        Some(p) => Box::new(BufWriter::new(File::create(p)?)),
    };
    let mut wtr = ser::writer(wtr);

    match args.mode {
        Mode::T2 => count::<T2>(rdr, args.binary, args.channels, options, &mut wtr)?,
        Mode::T3 => count::<T3>(rdr, args.binary, args.channels, options, &mut wtr)?,
    }
    wtr.flush()?;
    Ok(())
}

fn count<E: Canonical + 'static>(
    rdr: Box<dyn Read>,
    binary: bool,
    channels: usize,
    options: Options,
    wtr: &mut csv::Writer<impl Write>,
) -> Result<()> {
    let events: Box<dyn Iterator<Item = pqtools::Result<E>>> = if binary {
        Box::new(de::binary_events(rdr))
    } else {
        Box::new(de::csv_events(de::reader(rdr)))
    };
    for window in Intensity::new(events, channels, options)? {
        let window = window?;
        let mut record = vec![window.lower.to_string(), window.upper.to_string()];
        record.extend(window.counts.iter().map(|c| c.to_string()));
        wtr.write_record(&record)?;
    }
    Ok(())
}
