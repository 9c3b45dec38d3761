use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use modforge_cli::commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modforge", version, about = "Reproducible mod distribution archives")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the standalone and quick-install archives.
    Dist {
        /// Project directory containing ccmod.json.
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
        /// Output directory (overrides outputDir in modforge.yaml).
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Unix time for every mod file (default: SOURCE_DATE_EPOCH, then the last commit).
        #[arg(long)]
        timestamp: Option<u64>,
        /// Only use dependencies already in the download cache.
        #[arg(long)]
        offline: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(message) = run_cli(cli.command) {
        exit_with_error(&message);
    }
}

fn run_cli(command: Command) -> Result<(), String> {
    match command {
        Command::Dist {
            project_dir,
            output_dir,
            timestamp,
            offline,
        } => {
            let outcome = commands::dist::run(commands::dist::DistArgs {
                project_dir,
                output_dir,
                timestamp,
                offline,
            })?;
            println!("timestamp={}", outcome.timestamp);
            for archive in outcome.archive_paths {
                println!("archive={}", archive.display());
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "modforge_cli={level},modforge_core={level},modforge_fetch={level},modforge_pack={level}"
        ))
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("error: {}", message);
    std::process::exit(1);
}
