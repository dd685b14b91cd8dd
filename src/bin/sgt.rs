//! Simple Good-Turing smoothing of a frequency-of-frequencies table.
//!
//! Reads `r n` pairs from a file or stdin and prints `r<TAB>p` rows, the
//! first row being the total probability of unseen events.

use std::env;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use tally::sgt::parse_pairs;
use tally::{SgtConfig, SimpleGoodTuring};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct CliConfig {
    input: Option<PathBuf>,
    verbose: bool,
    confidence: f64,
}

fn print_help() {
    let help = "\
sgt: Simple Good-Turing frequency estimation

USAGE:
    sgt [OPTIONS] [FILE]

Reads whitespace-separated `r n` pairs, one per line, from FILE or stdin.
Blank lines and lines starting with `#` are ignored.

OPTIONS:
    --confidence <f64>    Confidence factor for switching to the smoothed
                          estimate (default: 1.96; 1.65 for p < 0.1)
    -v, --verbose         Print the full table (r, n, p, r*)
    -h, --help            Show this help

Set RUST_LOG=debug to see the fitted regression.
";
    println!("{help}");
}

fn parse_args(args: &[String]) -> Result<CliConfig, String> {
    let mut config = CliConfig {
        input: None,
        verbose: false,
        confidence: SgtConfig::CONFIDENCE_95,
    };

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--confidence" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    return Err("--confidence requires a value".to_owned());
                };
                config.confidence = value
                    .parse::<f64>()
                    .ok()
                    .filter(|c| *c > 0.0 && c.is_finite())
                    .ok_or_else(|| format!("invalid confidence factor: {value}"))?;
            }
            "-v" | "--verbose" => config.verbose = true,
            "-h" | "--help" => {
                print_help();
                return Err(String::new());
            }
            flag if flag.starts_with('-') && flag != "-" => {
                return Err(format!("unknown option: {flag}"));
            }
            path => {
                if config.input.is_some() {
                    return Err(format!("unexpected extra argument: {path}"));
                }
                if path != "-" {
                    config.input = Some(PathBuf::from(path));
                }
            }
        }
        index += 1;
    }

    Ok(config)
}

fn run(args: &[String]) -> Result<(), String> {
    let config = parse_args(args)?;

    let pairs = match &config.input {
        Some(path) => {
            let file = File::open(path)
                .map_err(|error| format!("cannot open {}: {error}", path.display()))?;
            parse_pairs(BufReader::new(file))
        }
        None => parse_pairs(io::stdin().lock()),
    }
    .map_err(|error| error.to_string())?;

    let (r, n): (Vec<u64>, Vec<u64>) = pairs.into_iter().unzip();
    let sgt_config = SgtConfig::default().confidence_factor(config.confidence);
    let sgt = SimpleGoodTuring::with_config(&r, &n, sgt_config).map_err(|error| error.to_string())?;

    let mut out = io::stdout().lock();
    let written = if config.verbose {
        write!(out, "{sgt}")
    } else {
        write_estimates(&mut out, &sgt)
    };
    written.map_err(|error| format!("write failed: {error}"))
}

/// One `r<TAB>p` row per bucket, led by the `0<TAB>p_zero` row.
fn write_estimates<W: Write>(out: &mut W, sgt: &SimpleGoodTuring) -> io::Result<()> {
    for (r, p) in sgt.estimates() {
        writeln!(out, "{r}\t{p}")?;
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) if error.is_empty() => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("sgt: {error}");
            ExitCode::FAILURE
        }
    }
}
