use argh::FromArgs;
use anyhow::{bail, Result};
use either::{Left, Right};
use std::fs::{self, File};
use std::io::{self, stdin, stdout, BufReader, BufWriter, Read, Write};
use tracing::{info, Level};

use pqtools::cfg::Calibration;
use pqtools::decode::RecordFormat;
use pqtools::ser;
use pqtools::stream::{self, Options, TextDiagnostics};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(Debug, FromArgs, Clone)]
/// Decode raw time-tagged records from PicoHarp, HydraHarp and TimeHarp
/// instruments and print canonical events: "channel,time" for t2 and
/// "channel,pulse,time" for t3, or fixed little-endian binary records with
/// --binary-out. External markers are reported on standard error.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// record format, by name (e.g. hydraharp-v2-t3) or by unified-file
    /// record type code (e.g. 0x01010304)
    #[argh(option, short = 'f')]
    pub format: String,
    /// JSON file with the measurement's resolution, sync rate and channels
    #[argh(option, short = 'c')]
    pub calibration: Option<String>,
    /// bytes of file header to skip before the first record
    #[argh(option, default = "0")]
    pub offset: u64,
    /// stop after this many data records
    #[argh(option, short = 'n')]
    pub number: Option<u64>,
    /// write binary records instead of text
    #[argh(switch, short = 'b')]
    pub binary_out: bool,
    /// convert t3 sync pulses to t2 times using the sync rate
    #[argh(switch)]
    pub to_t2: bool,
    /// print the time resolution in picoseconds and exit
    #[argh(switch)]
    pub resolution_only: bool,
    /// report progress every this many records
    #[argh(option)]
    pub print_every: Option<u64>,
    /// file to write output to (writes to standard output by default)
    #[argh(option, short = 'o')]
    pub out: Option<String>,
    /// log debugging information to standard error
    #[argh(switch)]
    pub verbose: bool,
    /// with no input or when input is '-', read from standard input
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

    let format: RecordFormat = args.format.parse()?;
    let cal = match &args.calibration {
        Some(p) => Calibration::from_reader(BufReader::new(File::open(p)?))?,
        None => Calibration::default(),
    };
    let options = Options {
        number: args.number,
        binary_out: args.binary_out,
        to_t2: args.to_t2,
        print_every: args.print_every,
    };

    let stdout = stdout();
    let mut wtr: Box<dyn Write> = match args.out {
        None => Box::new(BufWriter::new(stdout.lock())),
        Some(p) => Box::new(BufWriter::new(File::create(p)?)),
    };

    if args.resolution_only {
        let tttr = format.tttr(&cal)?;
        ser::resolution(&mut wtr, tttr.resolution_ps(), args.binary_out)?;
        wtr.flush()?;
        return Ok(())
    }

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
    let mut rdr: Box<dyn Read> = match input {
        Left(()) => Box::new(BufReader::new(stdin())),
        Right(path) => Box::new(BufReader::new(File::open(path)?)),
    };

    if args.offset > 0 {
        let skipped = io::copy(&mut (&mut rdr).take(args.offset), &mut io::sink())?;
        if skipped < args.offset {
            bail!("input ended within the {} byte header", args.offset);
        }
    }

    let mut diag = TextDiagnostics::stderr(env!("CARGO_BIN_NAME"));
    let summary = stream::stream(&mut rdr, wtr, format, &cal, &options, &mut diag)?;
    info!(
        "{}: {} records, {} markers, {} overflows",
        format, summary.records, summary.markers, summary.overflows,
    );
    Ok(())
}
