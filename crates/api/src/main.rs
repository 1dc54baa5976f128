//! RentKenya - rental management account CLI
//!
//! Drives the same auth service the web client uses: sign in or up, inspect
//! the resolved profile, and check what the view gate would do.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rentkenya_domain::{Config, Role};
use rentkenya_infra::{config, SessionFile};
use rentkenya_lib::{commands, AppContext};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Config file (TOML or JSON); environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Where the session is kept between runs
    #[arg(long, global = true, default_value = ".rentkenya/session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Signin { email: String, password: String },
    /// Create an account with a landlord or tenant profile
    Signup {
        email: String,
        password: String,
        #[arg(long, default_value = "tenant")]
        role: Role,
    },
    /// Show the signed-in user and their profile
    Whoami {
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Sign out and forget the stored session
    Signout,
    /// Show what the view gate decides for a protected path
    Gate {
        #[arg(default_value = "/dashboard")]
        path: String,
    },
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => {
            let mut config = config::load_from_file(Some(path))?;
            config::apply_env_overrides(&mut config)?;
            config
        }
        None => config::load()?,
    };
    Ok(config)
}

#[allow(clippy::print_stdout)]
fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

async fn run(ctx: &AppContext, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Signin { email, password } => {
            commands::sign_in(ctx, &email, &password).await?;
            let who = commands::whoami(ctx, Duration::from_secs(10)).await?;
            emit(json, &who, || format!("signed in as {}", who.email.as_deref().unwrap_or("?")))
        }
        Command::Signup { email, password, role } => {
            let user = commands::sign_up(ctx, &email, &password, role).await?;
            emit(json, &user, || format!("created {role} account {}", user.id))
        }
        Command::Whoami { timeout_secs } => {
            let who = commands::whoami(ctx, Duration::from_secs(timeout_secs)).await?;
            emit(json, &who, || match (&who.user_id, who.role) {
                (None, _) => "signed out".to_string(),
                (Some(id), Some(role)) => format!("{id} ({role})"),
                (Some(id), None) => format!("{id} (profile {:?})", who.reconcile),
            })
        }
        Command::Signout => {
            commands::sign_out(ctx).await?;
            emit(json, &serde_json::json!({ "signed_out": true }), || "signed out".to_string())
        }
        Command::Gate { path } => {
            ctx.auth.wait_until_resolved(Duration::from_secs(10)).await;
            let check = commands::gate(ctx, &path);
            emit(json, &check, || format!("{}: {:?}", check.path, check.decision))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is normal outside development
    let dotenv = dotenvy::dotenv();

    let config = load_config(cli.config).context("loading configuration")?;
    rentkenya_common::init_logging(&config.logging.filter, config.logging.json)
        .context("initializing logging")?;
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let store = SessionFile::new(cli.session_file);
    let persisted = store.load()?;
    let ctx = AppContext::new(config, persisted)?;

    let outcome = run(&ctx, cli.command, cli.json).await;

    store.save(ctx.session_to_persist().as_ref())?;
    outcome
}
