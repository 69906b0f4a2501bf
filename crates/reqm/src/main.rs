use clap::Parser;
use reqm_core::RewriteOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Application configuration.
#[derive(clap::Parser, Debug)]
#[clap(version, about)]
struct Args {
    /// The main command to run.
    #[command(subcommand)]
    subcommand: Subcommand,

    /// The global options.
    #[clap(flatten)]
    global: GlobalArgs,
}

/// Global configuration options.
#[derive(clap::Args, Debug)]
struct GlobalArgs {
    /// Log completion progress. `REQM_LOG` overrides the filter.
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// The number of completion rounds that may add rules.
    #[arg(long = "max-iterations", global = true, default_value_t = RewriteOptions::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// The longest left hand side completion may produce.
    #[arg(long = "max-depth", global = true, default_value_t = RewriteOptions::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

/// The subcommands of the reqm executable.
#[derive(clap::Subcommand, Debug)]
enum Subcommand {
    /// Run rewrite system scripts.
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("REQM_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.global.verbose);
    tracing::debug!(?args, "parsed arguments");

    match args.subcommand {
        Subcommand::Run(run_args) => cmd_run(&args.global, &run_args),
    }
}

fn cmd_run(global_args: &GlobalArgs, args: &RunArgs) -> ExitCode {
    let options = RewriteOptions::new()
        .with_max_iterations(global_args.max_iterations)
        .with_max_depth(global_args.max_depth);
    let mut stdout = io::stdout().lock();
    let mut status = ExitCode::SUCCESS;
    for file in &args.files {
        if let Err(err) = reqm_dev::run_file(file, options, &mut stdout) {
            let _ = stdout.flush();
            eprintln!("{}: {err:#}", file.display());
            status = ExitCode::FAILURE;
        }
    }
    status
}
