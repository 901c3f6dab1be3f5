use crate::commands::{run_fields, run_fill, run_manifest, FieldsArgs, FillArgs, ManifestArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use resale_cert::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Resale Certificate Service",
    about = "Map HOA application data onto resale certificate forms and serve the pipeline over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the field descriptors produced for an application data file
    Fields(FieldsArgs),
    /// Fill a PDF template from an application data file
    Fill(FillArgs),
    /// Derive a field manifest from a fillable PDF template
    Manifest(ManifestArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Fields(args) => run_fields(args),
        Command::Fill(args) => run_fill(args),
        Command::Manifest(args) => run_manifest(args),
    }
}
