//! services/client/src/bin/voice_word.rs

use clap::{Parser, Subcommand};
use client_lib::{
    adapters::load_audio_file, config::Config, error::ClientError, ClientContext, LOGIN_ROUTE,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_word_core::domain::{DownloadKind, Record, RecordUpdate};

#[derive(Parser)]
#[command(name = "voice_word", version, about = "Turn voice recordings into Word documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session for seven days
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List all records
    List,
    /// Show one record in full
    Show { id: i64 },
    /// Upload a recording
    Upload {
        title: String,
        file: PathBuf,
        /// Keep polling until processing finishes
        #[arg(long)]
        wait: bool,
    },
    /// Rename a record or replace its processed text
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        text: Option<String>,
    },
    /// Delete a record and its files
    Delete { id: i64 },
    /// Rebuild the Word document from the processed text
    Regenerate { id: i64 },
    /// Print the download link for a record's audio or Word file
    Url { id: i64, kind: DownloadKind },
    /// Download a record's audio or Word file
    Download {
        id: i64,
        kind: DownloadKind,
        dest: PathBuf,
    },
    /// Poll a record until processing completes or fails
    Wait {
        id: i64,
        /// Seconds between checks
        #[arg(long, default_value_t = 5)]
        interval: u64,
        #[arg(long, default_value_t = 120)]
        attempts: u32,
    },
}

impl Command {
    /// The route each command lives on; the guard runs against it first.
    fn route(&self) -> Option<String> {
        match self {
            Command::Login { .. } => Some(LOGIN_ROUTE.to_string()),
            Command::Logout => None,
            Command::Whoami | Command::List | Command::Upload { .. } => Some("/".to_string()),
            Command::Show { id }
            | Command::Update { id, .. }
            | Command::Delete { id }
            | Command::Regenerate { id }
            | Command::Url { id, .. }
            | Command::Download { id, .. }
            | Command::Wait { id, .. } => Some(format!("/records/{}", id)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
    info!("Using backend at {}", config.api_base);

    // --- 2. Build the Context and Run the Command ---
    let ctx = ClientContext::from_config(config);
    run(&ctx, cli.command).await
}

async fn run(ctx: &ClientContext, command: Command) -> Result<(), ClientError> {
    let landed = match command.route() {
        Some(route) => Some(ctx.guard.navigate(&route).await?),
        None => None,
    };
    let on_login = landed.as_deref() == Some(LOGIN_ROUTE);

    match command {
        Command::Login { username, password } => {
            if !on_login {
                let name = ctx.auth.user().map(|u| u.username).unwrap_or_default();
                println!("Already logged in as {}", name);
                return Ok(());
            }
            let password = match password {
                Some(p) => p,
                None => prompt_password()?,
            };
            ctx.auth.login(&username, &password).await?;
            let name = ctx.auth.user().map(|u| u.username).unwrap_or(username);
            println!("Logged in as {}", name);
        }
        Command::Logout => {
            ctx.auth.logout();
            println!("Logged out");
        }
        _ if on_login => {
            return Err(ClientError::Internal(
                "not logged in, run `voice_word login <username>` first".to_string(),
            ));
        }
        Command::Whoami => {
            if let Some(user) = ctx.auth.user() {
                println!(
                    "{} (id {}, since {})",
                    user.username,
                    user.id,
                    user.created_at.format("%Y-%m-%d")
                );
            }
        }
        Command::List => {
            ctx.records.fetch_records().await;
            if let Some(e) = ctx.records.error() {
                return Err(ClientError::Internal(e));
            }
            let records = ctx.records.records();
            if records.is_empty() {
                println!("No records yet");
            }
            for r in records {
                println!(
                    "{:>5}  {:<10}  {}  {}",
                    r.id,
                    r.status,
                    r.created_at.format("%Y-%m-%d %H:%M"),
                    r.title
                );
            }
        }
        Command::Show { id } => match ctx.records.fetch_record(id).await {
            Some(record) => print_record(&record),
            None => return Err(ClientError::Internal(ctx.records.error().unwrap_or_default())),
        },
        Command::Upload { title, file, wait } => {
            let audio = load_audio_file(&file).await?;
            let record = ctx.records.create_record(&title, audio).await?;
            println!("Created record {} ({})", record.id, record.status);
            if wait {
                let record = ctx
                    .records
                    .wait_for_completion(record.id, Duration::from_secs(5), 120)
                    .await?;
                print_record(&record);
            }
        }
        Command::Update { id, title, text } => {
            let update = RecordUpdate {
                title,
                processed_text: text,
            };
            if update.is_empty() {
                return Err(ClientError::Internal(
                    "nothing to update, pass --title and/or --text".to_string(),
                ));
            }
            let record = ctx.records.update_record(id, &update).await?;
            println!("Updated record {}", record.id);
        }
        Command::Delete { id } => {
            ctx.records.delete_record(id).await?;
            println!("Deleted record {}", id);
        }
        Command::Regenerate { id } => {
            let record = ctx.records.regenerate_word(id).await?;
            println!(
                "Regenerated document for record {}: {}",
                record.id,
                record.word_file_path.as_deref().unwrap_or("-")
            );
        }
        Command::Url { id, kind } => {
            println!("{}", ctx.records.get_download_url(id, kind));
        }
        Command::Download { id, kind, dest } => {
            let bytes = ctx.records.download(id, kind).await?;
            tokio::fs::write(&dest, &bytes).await?;
            println!("Saved {} bytes to {}", bytes.len(), dest.display());
        }
        Command::Wait {
            id,
            interval,
            attempts,
        } => {
            let record = ctx
                .records
                .wait_for_completion(id, Duration::from_secs(interval), attempts)
                .await?;
            print_record(&record);
        }
    }
    Ok(())
}

fn print_record(record: &Record) {
    println!("#{} {}", record.id, record.title);
    println!("status:   {}", record.status);
    if let Some(message) = &record.error_message {
        println!("error:    {}", message);
    }
    println!("created:  {}", record.created_at.format("%Y-%m-%d %H:%M"));
    println!("updated:  {}", record.updated_at.format("%Y-%m-%d %H:%M"));
    println!(
        "files:    audio={} word={}",
        if record.audio_file_path.is_some() { "yes" } else { "no" },
        if record.word_file_path.is_some() { "yes" } else { "no" },
    );
    if let Some(text) = &record.processed_text {
        println!("\n{}", text);
    } else if let Some(text) = &record.original_text {
        println!("\n(unprocessed)\n{}", text);
    }
}

fn prompt_password() -> Result<String, ClientError> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
