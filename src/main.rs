mod aggregate;
mod config;
mod enrich;
mod error;
mod extract;
mod fetch;
mod identity;
mod model;
mod sitemap;
mod states;
mod store;
mod tasks;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use tasks::{EvaluationUpdate, RunContext};

#[derive(Parser)]
#[command(
    name = "einbuergerung_scraper",
    about = "Naturalisation test question bank, test centres and exam dates"
)]
struct Cli {
    /// Directory holding the JSON artifacts (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Questions, test centres and current evaluation, one after another (default)
    Run,
    /// Scrape questions, enrich new ones and save the corpus
    Questions {
        /// Extract and diff only: no service calls, nothing written
        #[arg(long)]
        dry_run: bool,
    },
    /// Scrape test centre spreadsheets for every state
    Facilities,
    /// Check the announced exam date and save it if it changed
    Evaluation,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = config::Settings::load()?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    let ctx = RunContext::new(settings)?;

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            tasks::run_all(&ctx).await;
            Ok(())
        }
        Commands::Questions { dry_run } => {
            let run = tasks::scrape_questions(&ctx, dry_run).await?;
            println!(
                "{} questions: {} known, {} new, {} without text",
                run.total, run.diff.known, run.diff.new, run.diff.skipped
            );
            if !dry_run {
                let e = run.enrichment;
                println!(
                    "Enriched {} ({} category fallbacks, {} context fallbacks, {} translation failures)",
                    e.enriched, e.category_fallbacks, e.context_fallbacks, e.translation_failures
                );
            }
            Ok(())
        }
        Commands::Facilities => {
            let count = tasks::scrape_facilities(&ctx).await?;
            println!("Saved {} test centres", count);
            Ok(())
        }
        Commands::Evaluation => {
            match tasks::check_current_evaluation(&ctx).await? {
                EvaluationUpdate::Unchanged => println!("Exam date unchanged"),
                EvaluationUpdate::Written(path) => println!("Exam date saved to {}", path.display()),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, secs / 60 % 60, secs % 60) {
        (0, 0, _) => format!("{:.1}s", d.as_secs_f64()),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, s) => format!("{h}h {m}m {s}s"),
    }
}
