//! grist CLI
//!
//! The command-line front end for the grist program generator.
//!
//! # Usage
//!
//! ```text
//! grist [OPTIONS] <COMMAND>
//!
//! Commands:
//!   generate      Generate one test program from a seed
//!   dump-options  Print the effective options as JSON
//!
//! Options:
//!   -v, --verbose  Increase verbosity
//!   -q, --quiet    Suppress non-error output
//!   -h, --help     Print help information
//!   -V, --version  Print version information
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use grist::options::{Options, StandardKind};
use grist::program::ProgramGenerator;

/// Seed-deterministic random program generator for compiler testing.
///
/// Generated programs compute a checksum and are free of undefined
/// behavior by construction, so any output divergence between compilers
/// or optimization levels points at a compiler bug.
#[derive(Parser)]
#[command(name = "grist")]
#[command(version)]
#[command(about = "Random program generator for differential compiler testing", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (debug-level logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one test program from a seed
    ///
    /// Writes the program to the output directory (or stdout with
    /// `--stdout`). The same seed and options always produce the same
    /// bytes.
    Generate(GenerateArgs),

    /// Print the effective options as JSON
    DumpOptions(OptionArgs),
}

#[derive(Args)]
struct OptionArgs {
    /// Target standard: c++, ispc, or sycl
    #[arg(long = "std", default_value = "c++")]
    standard: StandardKind,

    /// Treat `long` as 32 bits wide (matching `int`)
    #[arg(long)]
    ilp32: bool,

    /// Permit alignment attributes on declarations
    #[arg(long)]
    align: bool,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    options: OptionArgs,

    /// Generation seed
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Write the program to stdout instead of a file
    #[arg(long)]
    stdout: bool,
}

impl OptionArgs {
    fn to_options(&self) -> Options {
        Options {
            standard: self.standard,
            int64_mode: !self.ilp32,
            allow_align: self.align,
            ..Options::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Generate(args) => cmd_generate(&args),
        Commands::DumpOptions(args) => cmd_dump_options(&args),
    }
}

fn cmd_generate(args: &GenerateArgs) -> ExitCode {
    let opts = args.options.to_options();
    let extension = match opts.standard {
        StandardKind::Cxx | StandardKind::Sycl => "cpp",
        StandardKind::Ispc => "ispc",
    };

    let generator = ProgramGenerator::new(opts);
    let prog = match generator.generate(args.seed) {
        Ok(prog) => prog,
        Err(err) => {
            eprintln!("error: generator invariant violated: {err}");
            return ExitCode::FAILURE;
        }
    };

    if args.stdout {
        print!("{}", prog.source);
        return ExitCode::SUCCESS;
    }

    let path = args.out_dir.join(format!("func_{}.{extension}", prog.seed));
    if let Err(err) = fs::create_dir_all(&args.out_dir) {
        eprintln!("error: cannot create {}: {err}", args.out_dir.display());
        return ExitCode::FAILURE;
    }
    match fs::write(&path, &prog.source) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "wrote test program");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: cannot write {}: {err}", path.display());
            ExitCode::FAILURE
        }
    }
}

fn cmd_dump_options(args: &OptionArgs) -> ExitCode {
    let opts = args.to_options();
    match serde_json::to_string_pretty(&opts) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
