//! Ehlit compiler CLI
//!
//! Usage: ehlitc <input.eh> [-o output.c] [--gen-import-output output.eh]

use clap::Parser;
use colored::Colorize;
use ehlit::driver::{self, DriverError, Options};
use ehlit::Severity;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "ehlitc")]
#[command(version = "0.1.0")]
#[command(about = "Compile Ehlit source files to C", long_about = None)]
struct Args {
    /// Source file to build
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// File where to write the output. You may use '-' for stdout
    #[arg(short = 'o', long = "gen-output", value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// File where to write the import file. You may use '-' for stdout
    #[arg(long = "gen-import-output", value_name = "OUTPUT")]
    import_output: Option<PathBuf>,

    /// Print debug messages
    #[arg(short = 'v', long = "gen-verbose", default_value_t = false)]
    verbose: bool,

    /// Print the built tree for debugging
    #[arg(long, default_value_t = false)]
    dump_ast: bool,

    /// Treat all warnings as errors
    #[arg(long = "warn-error", default_value_t = false, overrides_with = "warn_no_error")]
    warn_error: bool,

    /// Do not treat any warning as error [default]
    #[arg(long = "warn-no-error", default_value_t = false)]
    warn_no_error: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    let mut opts = Options {
        source: args.source,
        output_file: args.output,
        output_import_file: args.import_output,
        verbose: args.verbose,
        dump_ast: args.dump_ast,
        warn_error: args.warn_error && !args.warn_no_error,
    };

    match driver::build(&mut opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(DriverError::Arg(msg)) | Err(DriverError::Io(msg)) => {
            eprintln!("{}: {}", "error".red().bold(), msg);
            ExitCode::FAILURE
        }
        Err(DriverError::Build { error, rendered }) => {
            for line in &rendered {
                eprintln!("{}", line);
            }
            eprintln!("{}", error.summary());
            let max = error.max_severity();
            if max > Severity::Warning || opts.warn_error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}
