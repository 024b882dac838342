use clap::{Parser, Subcommand};
use cmd::breakdown::BreakdownCommand;
use cmd::estimate::EstimateCommand;
use cmd::review::ReviewCommand;
use cmd::schema::SchemaCommand;

mod cmd;

#[derive(Parser, Debug)]
#[command(
    name = "smbtax",
    version,
    about = "Estimate small-business taxes and quarterly payments from categorized transactions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate taxes and the quarterly payment plan for a period
    Estimate(EstimateCommand),
    /// Totals per tax bucket
    Breakdown(BreakdownCommand),
    /// List transactions that lower the accuracy score
    Review(ReviewCommand),
    /// Print the expected input and report formats
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Estimate(cmd) => cmd.exec(),
        Command::Breakdown(cmd) => cmd.exec(),
        Command::Review(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}
