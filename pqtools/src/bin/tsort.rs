use argh::FromArgs;
use anyhow::{bail, Result};
use either::{Left, Right};
use std::fs::{self, File};
use std::io::{self, stdin, stdout, BufReader, BufWriter, Read, Write};
use tracing::{debug, Level};

use pqtools::de::{self, Canonical};
use pqtools::queue::Queue;
use pqtools::ser::{Printable, Printer};
use pqtools::{Mode, T2, T3};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(Debug, FromArgs, Clone)]
/// Sort canonical t2 or t3 events chronologically through a bounded queue.
/// T3 events are ordered by pulse, then by time within the pulse; events
/// that compare equal keep their input order. Fails if the input holds more
/// events than the queue.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// event mode of the input, t2 or t3
    #[argh(option, short = 'm', default = "Mode::T2")]
    pub mode: Mode,
    /// read and write fixed binary records instead of text
    #[argh(switch, short = 'b')]
    pub binary: bool,
    /// number of events the queue holds
    #[argh(option, short = 'q', default = "1048576")]
    pub queue_size: usize,
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
    let mut printer = Printer::new(wtr, args.binary);

    match args.mode {
        Mode::T2 => sort::<T2>(rdr, args.binary, args.queue_size, &mut printer)?,
        Mode::T3 => sort::<T3>(rdr, args.binary, args.queue_size, &mut printer)?,
    }
    printer.flush()?;
    Ok(())
}

fn sort<E: Canonical + Printable + 'static>(
    rdr: Box<dyn Read>,
    binary: bool,
    queue_size: usize,
    printer: &mut Printer<impl Write>,
) -> Result<()> {
    let events: Box<dyn Iterator<Item = pqtools::Result<E>>> = if binary {
        Box::new(de::binary_events(rdr))
    } else {
        Box::new(de::csv_events(de::reader(rdr)))
    };
    let mut queue = Queue::new(queue_size);
    for e in events {
        queue.push(e?)?;
    }
    debug!("sorting {} events", queue.len());
    queue.sort();
    while !queue.is_empty() {
        queue.pop()?.print(printer)?;
    }
    Ok(())
}
