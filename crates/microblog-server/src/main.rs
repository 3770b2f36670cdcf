mod commands;
mod config;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use microblog_crypto::PasswordHasher;
use microblog_db::Database;
use microblog_sensor::{ReadingReport, ReadingSource};
use microblog_types::PostQuery;
use serde_json::{Value, json};
use tracing::info;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "microblog", version, about = "Accounts, posts and room readings")]
struct Cli {
    /// Database file (overrides MICROBLOG_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Register {
        username: String,
        email: String,
        #[arg(long, env = "MICROBLOG_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Set a new password for an account
    Passwd {
        username: String,
        #[arg(long, env = "MICROBLOG_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Check a username/password pair
    Login {
        username: String,
        #[arg(long, env = "MICROBLOG_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Resolve a session subject (account id) to an account
    Whoami { subject: String },
    /// Publish a post of at most 140 characters
    Post { username: String, body: String },
    /// List an account's posts, newest first
    Posts {
        username: String,
        #[arg(long, default_value_t = PostQuery::DEFAULT_LIMIT)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Delete an account together with its posts
    DeleteAccount { username: String },
    /// Poll the configured sensor
    Reading {
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,
    },
}

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "microblog=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Command::Reading { count, interval_ms } => {
            poll_sensor(&config, count, Duration::from_millis(interval_ms))
        }
        command => {
            let db = Database::open(&config.db_path)?;
            let output = run_store_command(&db, &PasswordHasher::default(), command)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

fn run_store_command(db: &Database, hasher: &PasswordHasher, command: Command) -> anyhow::Result<Value> {
    let output = match command {
        Command::Register {
            username,
            email,
            password,
        } => json!(commands::register(db, hasher, &username, &email, &password)?),
        Command::Passwd { username, password } => {
            commands::change_password(db, hasher, &username, &password)?;
            json!({ "updated": username })
        }
        Command::Login { username, password } => {
            json!(commands::login(db, &username, &password)?)
        }
        Command::Whoami { subject } => json!(commands::whoami(db, &subject)?),
        Command::Post { username, body } => json!(commands::post(db, &username, &body)?),
        Command::Posts {
            username,
            limit,
            page,
        } => {
            let limit = limit.clamp(1, PostQuery::MAX_LIMIT);
            let query = PostQuery::new(limit, page.saturating_mul(limit));
            let (total, posts) = commands::posts(db, &username, query)?;
            json!({ "total": total, "posts": posts })
        }
        Command::DeleteAccount { username } => {
            commands::delete_account(db, &username)?;
            json!({ "deleted": username })
        }
        Command::Reading { .. } => bail!("`reading` does not touch the database"),
    };

    Ok(output)
}

fn poll_sensor(config: &Config, count: u32, interval: Duration) -> anyhow::Result<()> {
    let provider = commands::build_provider(&config.sensor)?;
    info!(
        backend = %provider.backend(),
        pin = config.sensor.pin,
        model = %config.sensor.model,
        "Polling sensor"
    );

    for i in 0..count {
        if i > 0 {
            thread::sleep(interval);
        }
        let report = ReadingReport::from(provider.get_reading());
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}
