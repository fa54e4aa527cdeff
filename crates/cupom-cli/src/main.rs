//! Cupom CLI - Receipt capture and spending insights
//!
//! Usage:
//!   cupom capture photo.jpg --save   Extract a receipt and save it
//!   cupom receipts --month prev      List last month's receipts
//!   cupom insights --generate        Category totals plus AI insights
//!   cupom status                     Show backends and AI health

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        // Prompt inspection works without any backend configured
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
        Commands::Capture { image, save } => {
            let tracker = commands::build_tracker(&commands::load_config(config_path)?)?;
            commands::cmd_capture(&tracker, &image, save)
                .await
                .map(|_| ())
        }
        Commands::Receipts { month, category } => {
            let month = commands::resolve_month(month.as_deref())?;
            let category = commands::parse_category(category.as_deref())?;
            let tracker = commands::build_tracker(&commands::load_config(config_path)?)?;
            commands::cmd_receipts(&tracker, month, category).await
        }
        Commands::Insights {
            month,
            generate,
            history,
        } => {
            let month = commands::resolve_month(month.as_deref())?;
            let tracker = commands::build_tracker(&commands::load_config(config_path)?)?;
            commands::cmd_insights(&tracker, month, generate, history).await
        }
        Commands::Status => commands::cmd_status(&commands::load_config(config_path)?).await,
    }
}
