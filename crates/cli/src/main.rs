use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notetag_cli::report;
use notetag_core::config::{self, AppConfig};
use notetag_core::pipeline::{self, CaptureOptions};
use notetag_core::service::TaggingService;
use providers::ProviderKind;
use storage::{notes, tags, SqlitePool};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    let service = pipeline::build_service(&cfg);
    tracing::debug!(provider = %service.provider(), db = %cfg.database.path, "config loaded");

    if let Some(kind) = cli.provider {
        // switch only to a provider that answers
        let status = service.switch_provider(kind).await;
        if !status.connected {
            eprintln!("{}; staying on {}", report::status_line(&status), service.provider());
        }
    }

    match cli.command {
        Commands::Status { json } => run_status(&service, json).await,
        Commands::Suggest { text, tags, json } => {
            let vocabulary = resolve_vocabulary(&cfg, &tags).await?;
            let outcome = service.suggest_tags(&text, &vocabulary, None).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", report::suggestion(&outcome));
            }
            Ok(())
        }
        Commands::Compare { text, tags, json } => {
            let vocabulary = resolve_vocabulary(&cfg, &tags).await?;
            let results = service.compare_providers(&text, &vocabulary).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("{}", report::comparison(&results));
            }
            Ok(())
        }
        Commands::Parse { text, json } => {
            let items = service.parse_note(&text, None).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                println!("{}", report::items(&items));
            }
            Ok(())
        }
        Commands::Generate { prompt, max_length } => {
            let text = service.generate_text(&prompt, max_length).await?;
            println!("{text}");
            Ok(())
        }
        Commands::Entities { text } => {
            let entities = service.extract_entities(&text).await;
            println!("{}", report::entities(&entities));
            Ok(())
        }
        Commands::Add { text, split, no_tag } => {
            let pool = open_pool(&cfg).await?;
            let opts = CaptureOptions {
                split,
                auto_tag: !no_tag,
            };
            let captured = pipeline::capture(&pool, &service, &text, opts).await?;
            println!("{}", report::captured(&captured));
            Ok(())
        }
        Commands::List { json } => {
            let pool = open_pool(&cfg).await?;
            let listed = notes::list_notes(&pool).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                for note in &listed {
                    println!("{}", report::note_row(note));
                }
            }
            Ok(())
        }
        Commands::Delete { id } => {
            let pool = open_pool(&cfg).await?;
            if notes::delete_note(&pool, id).await? {
                println!("deleted note #{id}");
            } else {
                anyhow::bail!("note #{id} not found");
            }
            Ok(())
        }
        Commands::Tag { command } => {
            let pool = open_pool(&cfg).await?;
            match command {
                TagCommands::Add { names } => {
                    for name in names {
                        let tag = tags::ensure_tag(&pool, &name).await?;
                        println!("{}", tag.name);
                    }
                }
                TagCommands::List => {
                    for name in tags::list_tag_names(&pool).await? {
                        println!("{name}");
                    }
                }
            }
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "notetag")]
#[command(about = "Notes with AI tag suggestions", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Provider to use (huggingface|openai|gemini); tested before switching
    #[arg(short, long, global = true, value_parser = parse_provider)]
    provider: Option<ProviderKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test the connection of every provider
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest up to three tags for a text
    Suggest {
        text: String,
        /// Allowed tags (comma-separated); defaults to the stored tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask every configured provider for tags side by side
    Compare {
        text: String,
        /// Allowed tags (comma-separated); defaults to the stored tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Split a note into separate items
    Parse {
        text: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate free text from a prompt
    Generate {
        prompt: String,
        /// Maximum number of tokens to generate
        #[arg(long)]
        max_length: Option<usize>,
    },
    /// Extract named entities (people, places, organisations)
    Entities { text: String },
    /// Store a note, tagging it from the stored tags
    Add {
        text: String,
        /// Store one note per item found in the text
        #[arg(long, default_value_t = false)]
        split: bool,
        /// Do not suggest tags
        #[arg(long, default_value_t = false)]
        no_tag: bool,
    },
    /// List stored notes, newest first
    List {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a note
    Delete { id: i64 },
    /// Manage the tag vocabulary
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// Add tags to the vocabulary
    Add {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List the vocabulary
    List,
}

fn parse_provider(s: &str) -> Result<ProviderKind, String> {
    s.parse::<ProviderKind>().map_err(|e| e.to_string())
}

async fn run_status(service: &TaggingService, json: bool) -> Result<()> {
    let statuses = service.test_all().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }
    let current = service.provider();
    for status in &statuses {
        let marker = if status.provider == current { "*" } else { " " };
        println!("{marker} {}", report::status_line(status));
    }
    Ok(())
}

async fn resolve_vocabulary(cfg: &AppConfig, raw: &[String]) -> Result<Vec<String>> {
    let from_args = report::vocabulary_from_args(raw);
    if !from_args.is_empty() {
        return Ok(from_args);
    }
    let pool = open_pool(cfg).await?;
    let stored = tags::list_tag_names(&pool).await?;
    if stored.is_empty() {
        anyhow::bail!("no tags stored yet; pass --tags or run `notetag tag add`");
    }
    Ok(stored)
}

async fn open_pool(cfg: &AppConfig) -> Result<SqlitePool> {
    let pool = storage::connect(&cfg.database.path)
        .await
        .context("db connect")?;
    storage::migrate(&pool).await.context("db migrate")?;
    Ok(pool)
}
