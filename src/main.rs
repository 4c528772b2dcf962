use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::process::ExitCode;
use wolfdog::build::build_directory;

#[derive(Parser)]
#[command(name = "wolfdog", version, about = "Builds a static site from posts and templates")]
struct Cli {
    /// Log debug output, including every file written.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into its output directory.
    Build {
        /// The directory containing `wolfdog.json`.
        #[arg(default_value = ".")]
        site_directory: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "warn",
        _ => "info",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::from(1)
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Build { site_directory } => {
            let summary = build_directory(&site_directory)?;
            log::info!(
                "Built '{}': {} post(s), {} page(s), {} static file(s), {} partial(s)",
                site_directory.display(),
                summary.posts,
                summary.pages,
                summary.static_files,
                summary.partials
            );
            Ok(())
        }
    }
}
