use std::env;

use anyhow::{Context, Result};
use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};

mod csv;
mod datetime;
mod kubrick;
mod report;
mod report_command;
mod tags;
mod time_entry;

use kubrick::KubrickClient;
use report_command::{ReportArgs, ReportCommand, ReportOutcome};

/// CLI application exporting a client's time entries from the Kubrick
/// reporting API as a CSV file under `reports/`.
///
/// # Examples
/// ```
/// $ cargo run -- "Acme Corp"
/// $ cargo run -- "Acme Corp" 2024-03-01 2024-03-07
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(flatten)]
    report: ReportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger().context("Failed to initialize logger")?;

    let client = KubrickClient::new().context("Failed to new Kubrick client")?;
    let command = ReportCommand::new(&client);
    let reports_dir = env::current_dir()
        .context("Failed to resolve working directory")?
        .join("reports");

    match command.run(args.report, &reports_dir).await? {
        ReportOutcome::UnknownClient { given, available } => {
            println!(
                "Uh oh! Invalid client '{}' provided. Available options are:\n{}",
                given,
                available.join("\n")
            );
        }
        ReportOutcome::Empty => println!("\nNo results found. Exiting."),
        ReportOutcome::Saved { content, path } => {
            println!(
                "\nFile created!\n\n{}\n\nSaved to {}",
                content,
                path.display()
            );
        }
    }

    Ok(())
}

/// Info-level logging on stdout. Guided user-facing messages stay on
/// plain `println!`; there is no separate error channel.
fn setup_logger() -> Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new().info(Color::Green);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}] {}",
                colors.color(record.level()),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}
