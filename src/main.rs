use chrono::NaiveDate;
use clap::Parser;
use tracing::info;

use daily_digest::startup;
use daily_digest::utils::time::today;

/// Aggregate GitHub, Jira, Slack and calendar activity into a daily report
#[derive(Debug, Parser)]
#[command(name = "daily-digest", version, about)]
struct Args {
    /// Report date (YYYY-MM-DD); defaults to today in the configured timezone
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Output file path (overrides OUTPUT_FILE)
    #[arg(long)]
    output: Option<String>,

    /// Print the resolved Slack user map as JSON and exit
    #[arg(long)]
    slack_dump: bool,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = Args::parse();

    startup::init_logging()?;
    let config = startup::load_config()?;

    if args.slack_dump {
        return startup::run_slack_dump(&config).await;
    }

    let date = args.date.unwrap_or_else(|| today(config.timezone));
    info!("Starting daily digest for {}", date);

    startup::run_digest(&config, date, args.output).await
}
