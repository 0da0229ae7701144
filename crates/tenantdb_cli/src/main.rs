//! Command-line front end over the core repositories.
//!
//! # Responsibility
//! - Resolve configuration from file, flags, and `TENANTDB_*` variables.
//! - Run one repository operation and print its result as JSON.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::path::PathBuf;
use tenantdb_core::model::activity::Activity;
use tenantdb_core::model::file_stats::FileStats;
use tenantdb_core::model::member::Member;
use tenantdb_core::model::project::Project;
use tenantdb_core::model::state::State;
use tenantdb_core::model::threshold::Threshold;
use tenantdb_core::model::user::User;
use tenantdb_core::model::verification_token::VerificationToken;
use tenantdb_core::model::workspace::Workspace;
use tenantdb_core::{CoreConfig, Document, DocumentStore, Repository};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "tenantdb", version, about = "Validated document repositories")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "TENANTDB_CONFIG")]
    config: Option<PathBuf>,

    /// Database file; overrides `[database].path`.
    #[arg(long, global = true, env = "TENANTDB_DB")]
    db: Option<PathBuf>,

    /// Log level; overrides `[logging].level`.
    #[arg(long, global = true, env = "TENANTDB_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core version and health.
    Ping,
    /// Create a document from a JSON payload.
    Create {
        collection: Collection,
        payload: String,
    },
    /// Read one document by id.
    Get {
        collection: Collection,
        id: Uuid,
        /// Leave references as bare ids.
        #[arg(long)]
        raw: bool,
    },
    /// List one page of documents matching a JSON filter.
    Query(QueryArgs),
    /// Apply a partial JSON update.
    Update {
        collection: Collection,
        id: Uuid,
        payload: String,
    },
    /// Delete one document.
    Delete { collection: Collection, id: Uuid },
    /// Check whether every id exists.
    Exists {
        collection: Collection,
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
}

#[derive(Debug, Args)]
struct QueryArgs {
    collection: Collection,
    /// Filter object, e.g. `{"workspace": "<id>"}`.
    #[arg(long, default_value = "{}")]
    filter: String,
    #[arg(long, default_value_t = 0)]
    page: u32,
    /// Defaults to `[query].items_per_page`.
    #[arg(long)]
    items_per_page: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Collection {
    Users,
    Workspaces,
    Members,
    Projects,
    States,
    FileStats,
    Thresholds,
    VerificationTokens,
    Activities,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    tenantdb_core::init_logging(&config.logging).context("failed to initialize logging")?;

    let Some(collection) = cli.command.collection() else {
        println!("tenantdb_core ping={}", tenantdb_core::ping());
        println!("tenantdb_core version={}", tenantdb_core::core_version());
        return Ok(());
    };

    let conn = tenantdb_core::open_with_config(&config.database)
        .context("failed to open database")?;
    let store = DocumentStore::try_new(&conn).context("database is not initialized")?;

    let output = match collection {
        Collection::Users => run::<User>(store, &cli.command, &config),
        Collection::Workspaces => run::<Workspace>(store, &cli.command, &config),
        Collection::Members => run::<Member>(store, &cli.command, &config),
        Collection::Projects => run::<Project>(store, &cli.command, &config),
        Collection::States => run::<State>(store, &cli.command, &config),
        Collection::FileStats => run::<FileStats>(store, &cli.command, &config),
        Collection::Thresholds => run::<Threshold>(store, &cli.command, &config),
        Collection::VerificationTokens => run::<VerificationToken>(store, &cli.command, &config),
        Collection::Activities => run::<Activity>(store, &cli.command, &config),
    }?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

impl Command {
    fn collection(&self) -> Option<Collection> {
        match self {
            Self::Ping => None,
            Self::Create { collection, .. }
            | Self::Get { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. }
            | Self::Exists { collection, .. } => Some(*collection),
            Self::Query(args) => Some(args.collection),
        }
    }
}

fn run<T: Document>(
    store: DocumentStore<'_>,
    command: &Command,
    config: &CoreConfig,
) -> Result<serde_json::Value> {
    let repo = Repository::<T>::new(store);
    let output = match command {
        Command::Ping => bail!("ping does not operate on a collection"),
        Command::Create { payload, .. } => {
            let input: T::Input = serde_json::from_str(payload)
                .with_context(|| format!("invalid {} payload", T::COLLECTION))?;
            serde_json::to_value(repo.create(input)?)?
        }
        Command::Get { id, raw, .. } => {
            let repo = if *raw { repo.without_population() } else { repo };
            serde_json::to_value(repo.get_by_id(*id)?)?
        }
        Command::Query(args) => {
            let filter: T::Filter = serde_json::from_str(&args.filter)
                .with_context(|| format!("invalid {} filter", T::COLLECTION))?;
            let items_per_page = args.items_per_page.unwrap_or(config.query.items_per_page);
            serde_json::to_value(repo.query(&filter, args.page, items_per_page)?)?
        }
        Command::Update { id, payload, .. } => {
            let payload: serde_json::Value =
                serde_json::from_str(payload).context("update payload is not valid JSON")?;
            serde_json::to_value(repo.update_by_id_json(*id, payload)?)?
        }
        Command::Delete { id, .. } => {
            repo.delete_by_id(*id)?;
            serde_json::json!({ "deleted": id })
        }
        Command::Exists { ids, .. } => match ids.as_slice() {
            [] => bail!("at least one id is required"),
            [id] => serde_json::json!({ "exists": repo.id_exists(*id)? }),
            ids => serde_json::json!({ "exists": repo.all_ids_exist(ids)? }),
        },
    };

    info!(
        "event=cli_command module=cli status=ok collection={}",
        T::COLLECTION
    );
    Ok(output)
}
