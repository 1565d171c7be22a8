use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vigil::cmd::{diff, validate, DiffArgs, ValidateArgs};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validates template documents without rendering them.
    Validate(ValidateArgs),
    /// Computes the diff between a desired object document and an actual
    /// external object document.
    Diff(DiffArgs),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => validate::execute(args)?,
        Commands::Diff(args) => diff::execute(args)?,
    }

    Ok(())
}
