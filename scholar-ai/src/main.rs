//! scholar-ai - exam photo ingestion command-line front end
//!
//! Every command prints its result as JSON on stdout; logs go to stderr.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use scholar_ai::config::{resolve_gemini_api_key, PipelineConfig};
use scholar_ai::db::{mistakes, questions, settings};
use scholar_ai::models::{ImageUpload, IngestRequest, MistakeStatus, Subject};
use scholar_ai::services::{GeminiClient, LocalBlobStore};
use scholar_ai::{AppState, IngestError};
use scholar_common::config::{self as common_config, TomlConfig};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const SERVICE_NAME: &str = "scholar-ai";

#[derive(Parser, Debug)]
#[command(name = "scholar-ai", version, about = "Exam photo ingestion and analysis")]
struct Cli {
    /// Data root folder (database + blobs)
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a batch of cropped exam photos
    Ingest {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        subject: Subject,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long)]
        occurred_at: Option<String>,
        /// Model variant to try first
        #[arg(long)]
        model: Option<String>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Import an official paper as difficulty reference questions
    ImportReferences {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        subject: Subject,
        #[arg(long)]
        description: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Generate a practice variant of a question
    Variant {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        question: Uuid,
    },
    /// Show the knowledge card for a knowledge point
    Knowledge { name: String },
    /// Change when a question was attempted
    OccurredAt {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        question: Uuid,
        date: String,
    },
    /// Mistake tracking
    Mistakes {
        #[command(subcommand)]
        action: MistakeAction,
    },
    /// Store the Gemini API key in the database
    SetApiKey { key: String },
}

#[derive(Subcommand, Debug)]
enum MistakeAction {
    /// Visible mistakes, newest first
    List {
        #[arg(long)]
        user: Uuid,
    },
    /// Soft-deleted mistakes
    Trash {
        #[arg(long)]
        user: Uuid,
    },
    /// Move mistakes to the trash
    Delete {
        #[arg(long)]
        user: Uuid,
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Bring mistakes back from the trash
    Restore {
        #[arg(long)]
        user: Uuid,
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Permanently remove trashed mistakes
    Purge {
        #[arg(long)]
        user: Uuid,
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Set status (active, corrected, archived)
    Status {
        #[arg(long)]
        user: Uuid,
        id: Uuid,
        status: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(|| common_config::config_file_path(SERVICE_NAME));
    let toml_config = match &config_path {
        Some(path) => common_config::load_toml_config(path)?,
        None => TomlConfig::default(),
    };

    init_tracing(&toml_config.logging.level);
    info!("Starting {} v{}", SERVICE_NAME, env!("CARGO_PKG_VERSION"));

    let root = common_config::resolve_root_folder(cli.root_folder.as_deref(), &toml_config);
    common_config::ensure_root_folder(&root).context("Failed to create root folder")?;
    let db_path = common_config::database_path(&root);
    info!("Database: {}", db_path.display());
    let db = scholar_common::db::init_database(&db_path).await?;

    let pipeline = PipelineConfig::from_toml(&toml_config)?;

    match cli.command {
        Command::Ingest {
            user,
            subject,
            occurred_at,
            model,
            files,
        } => {
            let state = build_state(db, &root, &toml_config, pipeline).await?;
            let request = IngestRequest {
                owner: user,
                subject,
                images: read_files(&files).await?,
                occurred_at: occurred_at
                    .as_deref()
                    .map(scholar_common::time::parse_user_date)
                    .transpose()?,
                preferred_model: model,
            };
            let outcome = state.orchestrator().ingest(request).await.map_err(coded)?;
            print_json(&outcome)
        }
        Command::ImportReferences {
            user,
            subject,
            description,
            files,
        } => {
            let state = build_state(db, &root, &toml_config, pipeline).await?;
            let uploads = read_files(&files).await?;
            let outcome = state
                .reference_importer()
                .import(user, subject, &description, &uploads)
                .await
                .map_err(coded)?;
            print_json(&outcome)
        }
        Command::Variant { user, question } => {
            let state = build_state(db, &root, &toml_config, pipeline).await?;
            let record = state.practice().generate(user, question).await.map_err(coded)?;
            print_json(&record)
        }
        Command::Knowledge { name } => {
            let state = build_state(db, &root, &toml_config, pipeline).await?;
            let card = state.knowledge().card(&name).await.map_err(coded)?;
            print_json(&card)
        }
        Command::OccurredAt { user, question, date } => {
            let occurred_at = scholar_common::time::parse_user_date(&date)?;
            questions::update_occurred_at(&db, user, question, occurred_at).await?;
            print_json(&serde_json::json!({ "question_id": question, "occurred_at": occurred_at }))
        }
        Command::Mistakes { action } => run_mistake_action(&db, action).await,
        Command::SetApiKey { key } => {
            if !scholar_ai::config::is_valid_key(&key) {
                return Err(anyhow!("API key must not be empty"));
            }
            settings::set_gemini_api_key(&db, &key).await?;
            print_json(&serde_json::json!({ "stored": true }))
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn build_state(db: SqlitePool, root: &Path, toml_config: &TomlConfig, pipeline: PipelineConfig) -> Result<AppState> {
    let api_key = resolve_gemini_api_key(&db, toml_config).await?;
    let client = GeminiClient::new(
        api_key,
        toml_config.gemini_base_url.clone(),
        pipeline.requests_per_second,
        Duration::from_secs(pipeline.model_timeout_secs),
    )
    .map_err(|e| anyhow!("Failed to build Gemini client: {}", e))?;
    let client = Arc::new(client);

    let blobs = Arc::new(LocalBlobStore::new(
        common_config::blob_root(root),
        toml_config.public_base_url.clone(),
    ));

    Ok(AppState::new(db, client.clone(), client, blobs, pipeline))
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<ImageUpload>> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let upload = ImageUpload::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        uploads.push(upload);
    }
    Ok(uploads)
}

async fn run_mistake_action(db: &SqlitePool, action: MistakeAction) -> Result<()> {
    match action {
        MistakeAction::List { user } => print_json(&mistakes::list_active(db, user).await?),
        MistakeAction::Trash { user } => print_json(&mistakes::list_trash(db, user).await?),
        MistakeAction::Delete { user, ids } => {
            let affected = mistakes::bulk_soft_delete(db, user, &ids).await?;
            print_json(&serde_json::json!({ "deleted": affected }))
        }
        MistakeAction::Restore { user, ids } => {
            let affected = mistakes::bulk_restore(db, user, &ids).await?;
            print_json(&serde_json::json!({ "restored": affected }))
        }
        MistakeAction::Purge { user, ids } => {
            let affected = mistakes::bulk_permanent_delete(db, user, &ids).await?;
            print_json(&serde_json::json!({ "purged": affected }))
        }
        MistakeAction::Status { user, id, status } => {
            let status: MistakeStatus = status.parse().map_err(|e: String| anyhow!(e))?;
            mistakes::set_status(db, user, id, status).await?;
            print_json(&mistakes::get(db, user, id).await?)
        }
    }
}

/// Prefix the stable error code so scripts can branch on it
fn coded(err: IngestError) -> anyhow::Error {
    anyhow!("[{}] {}", err.code(), err)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
