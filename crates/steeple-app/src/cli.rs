use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use steeple_core::config::Settings;
use steeple_service::calendar::EventAggregator;
use steeple_service::content::{ContentResolver, content_from_csv};

#[derive(Parser)]
#[command(author, version, about = "Parish website calendar and content tools", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the next events from the calendar feed
    Upcoming {
        #[arg(long, default_value_t = 3)]
        limit: usize,
        /// Keep only the first occurrence of each title
        #[arg(long, action, default_value = "false")]
        unique: bool,
    },
    /// Print every event from now to the end of the month N-1 months ahead
    Months {
        #[arg(long, default_value_t = 3)]
        months: u32,
    },
    /// Print the resolved site content, or one value from it
    Content {
        /// Locator such as `services[0].name`
        #[arg(long)]
        path: Option<String>,
    },
    /// Check content sheets without publishing them
    ValidateSheet {
        /// Local CSV export (repeatable)
        #[arg(long)]
        file: Vec<PathBuf>,
        /// CSV URL (repeatable)
        #[arg(long)]
        url: Vec<String>,
    },
}

impl Command {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        match self {
            Self::Upcoming { limit, unique } => {
                let aggregator = EventAggregator::from_config(&settings.calendar)?;
                print_json(&aggregator.upcoming_events(limit, unique).await)
            }
            Self::Months { months } => {
                let aggregator = EventAggregator::from_config(&settings.calendar)?;
                print_json(&aggregator.events_for_next_months(months).await)
            }
            Self::Content { path } => {
                let resolver = ContentResolver::from_settings(settings);
                let content = resolver.get_site_content().await?;
                match path {
                    Some(path) => match content.lookup(&path) {
                        Some(value) => print_json(value),
                        None => bail!("No content at {path}"),
                    },
                    None => print_json(content),
                }
            }
            Self::ValidateSheet { file, url } => validate_sheets(settings, file, url).await,
        }
    }
}

fn sheet_resolver(settings: &Settings, csv_url: Option<String>) -> ContentResolver {
    let mut content = settings.content.clone();
    content.source = Some("sheets".to_string());
    let mut sheets = settings.sheets.clone();
    if csv_url.is_some() {
        sheets.csv_url = csv_url;
    }
    ContentResolver::new(content, sheets)
}

async fn validate_sheets(settings: &Settings, files: Vec<PathBuf>, urls: Vec<String>) -> Result<()> {
    if files.is_empty() && urls.is_empty() {
        sheet_resolver(settings, None)
            .get_site_content()
            .await
            .context("Configured content sheet failed validation")?;
        tracing::info!("Configured content sheet passed validation");
        return Ok(());
    }

    let mut failures = Vec::new();

    for file in files {
        let outcome = match tokio::fs::read_to_string(&file).await {
            Ok(text) => content_from_csv(&text).map(drop).map_err(anyhow::Error::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = outcome {
            failures.push(format!("{}: {e:#}", file.display()));
        }
    }

    for url in urls {
        if let Err(e) = sheet_resolver(settings, Some(url.clone())).get_site_content().await {
            failures.push(format!("{url}: {e}"));
        }
    }

    if failures.is_empty() {
        tracing::info!("Content sheets passed validation");
        return Ok(());
    }

    for failure in &failures {
        tracing::error!(%failure, "Content sheet failed validation");
    }
    bail!("{} content sheet(s) failed validation", failures.len())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
