use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "storydesk")]
#[command(about = "Generates feature stories with a hosted model and publishes them to a static site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Run the pipeline without writing to the site")]
    dry_run: bool,

    #[arg(long, global = true, default_value = storydesk::config::DEFAULT_CONFIG_FILE, help = "Path to the YAML config file")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Generate ideas and a story, then publish it")]
    Run {
        #[arg(long, help = "Publication date (YYYY-MM-DD), defaults to today")]
        date: Option<NaiveDate>,
    },

    #[command(about = "Publish a story from saved editor and writer responses")]
    Publish {
        #[arg(long, help = "File holding the editor's numbered ideas")]
        ideas: PathBuf,

        #[arg(long, help = "File holding the writer's story")]
        story: PathBuf,

        #[arg(long, help = "Publication date (YYYY-MM-DD), defaults to today")]
        date: Option<NaiveDate>,
    },

    #[command(about = "Render a published story page as terminal text")]
    Preview {
        #[arg(help = "Story page to render")]
        path: PathBuf,

        #[arg(long, default_value_t = 80, help = "Wrap width in columns")]
        width: usize,
    },

    #[command(about = "List published stories")]
    Ledger,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("storydesk={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli::Config {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    };
    let settings = storydesk::config::Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Run { date } => {
            cli::run(&settings, date.unwrap_or(today), &config).await?;
        }
        Commands::Publish { ideas, story, date } => {
            cli::publish(&settings, &ideas, &story, date.unwrap_or(today), &config)?;
        }
        Commands::Preview { path, width } => {
            cli::preview(&path, width)?;
        }
        Commands::Ledger => {
            cli::ledger(&settings, &config)?;
        }
    }

    Ok(())
}
