use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use quiz_core::model::Language;
use services::config::DEFAULT_MAX_QUESTIONS;
use services::stats::DEFAULT_RECENT_LIMIT;
use services::{QuizConfig, SelectionMode};

#[derive(Parser, Debug)]
#[command(name = "driving-quiz")]
#[command(about = "Bilingual (Hebrew/Persian) driving theory quiz")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Quiz options used when no subcommand is given
    #[command(flatten)]
    pub play: PlayArgs,

    /// SQLite database URL or path
    #[arg(long, env = "QUIZ_DB_URL", global = true, value_name = "URL")]
    pub db: Option<String>,

    /// Supabase project URL; used when --db is not given
    #[arg(long, env = "SUPABASE_URL", global = true, value_name = "URL")]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", global = true, hide_env_values = true)]
    pub supabase_anon_key: Option<String>,

    /// Timeout for each store call, in seconds
    #[arg(long, env = "QUIZ_TIMEOUT_SECS", global = true, default_value_t = 10)]
    pub timeout_secs: u64,
}

impl Cli {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an interactive quiz (default)
    Play(PlayArgs),
    /// Print the statistics dashboard
    Stats {
        /// How many recent attempts to list
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        recent: u32,
    },
    /// Load questions from a JSON file into the store
    Seed {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
    /// deterministic (shuffled once) or adaptive (weakest category first)
    #[arg(long, env = "QUIZ_MODE", default_value_t = SelectionMode::Deterministic)]
    pub mode: SelectionMode,

    /// 0 means every active question
    #[arg(long, env = "QUIZ_MAX_QUESTIONS", default_value_t = DEFAULT_MAX_QUESTIONS)]
    pub max_questions: u32,

    /// he or fa
    #[arg(long, env = "QUIZ_LANGUAGE", default_value = "he")]
    pub language: Language,
}

impl PlayArgs {
    pub fn quiz_config(&self, store_timeout: Duration) -> QuizConfig {
        QuizConfig::default()
            .with_mode(self.mode)
            .with_max_questions(self.max_questions)
            .with_language(self.language)
            .with_store_timeout(store_timeout)
    }
}
