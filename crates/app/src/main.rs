mod cli;
mod terminal;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use services::{Clock, QuizLoopService, SeedService, StatsService};
use storage::repository::Storage;
use storage::supabase::SupabaseConfig;

use cli::{Cli, Command};

const DEFAULT_DB_URL: &str = "sqlite://driving_quiz.sqlite3";

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite://") || trimmed.starts_with("sqlite::memory:") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// sqlx does not create missing database files, so make sure one exists.
fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url.starts_with("sqlite::memory:") {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
    }
    Ok(())
}

/// `--db` wins; otherwise Supabase when both its settings are present;
/// otherwise the local SQLite file.
async fn open_storage(cli: &Cli) -> anyhow::Result<Storage> {
    if cli.db.is_none() {
        if let (Some(url), Some(key)) = (&cli.supabase_url, &cli.supabase_anon_key) {
            tracing::info!(url = %url, "using supabase backend");
            let config = SupabaseConfig::new(url.as_str(), key.as_str());
            return Storage::supabase(config, cli.store_timeout())
                .context("failed to build supabase client");
        }
    }

    let db_url = normalize_sqlite_url(cli.db.as_deref().unwrap_or(DEFAULT_DB_URL));
    prepare_sqlite_file(&db_url)?;
    tracing::info!(url = %db_url, "using sqlite backend");
    Storage::sqlite(&db_url)
        .await
        .with_context(|| format!("failed to open {db_url}"))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let storage = open_storage(&cli).await?;
    let timeout = cli.store_timeout();
    let mut stdout = io::stdout().lock();

    match cli.command.unwrap_or(Command::Play(cli.play)) {
        Command::Play(args) => {
            let config = args.quiz_config(timeout);
            let svc = QuizLoopService::from_storage(Clock::default(), &storage, config);
            let mut input = BufReader::new(tokio::io::stdin());
            terminal::play(&svc, &mut input, &mut stdout).await?;
        }
        Command::Stats { recent } => {
            let dashboard = StatsService::from_storage(&storage)
                .with_timeout(timeout)
                .with_recent_limit(recent)
                .dashboard()
                .await
                .context("failed to load statistics")?;
            terminal::print_dashboard(&dashboard, &mut stdout)?;
        }
        Command::Seed { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let count = SeedService::new(storage.questions.clone())
                .with_timeout(timeout)
                .seed_json(&json)
                .await
                .with_context(|| format!("failed to seed from {}", file.display()))?;
            writeln!(stdout, "seeded {count} questions")?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    run(Cli::parse()).await
}
