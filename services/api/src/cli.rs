use crate::commands::{run_notify, run_rollup, NotifyArgs, RollupArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use partner_metrics::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Partner Metrics",
    about = "Roll up partner appointments, serve partner reports, and send the daily SMS digest",
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
    /// Aggregate a closer-app CSV export and print the per-partner rollup
    Rollup(RollupArgs),
    /// Send partner links, rep alerts, and the management digest by SMS
    Notify(NotifyArgs),
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
        Command::Rollup(args) => run_rollup(args),
        Command::Notify(args) => run_notify(args).await,
    }
}
