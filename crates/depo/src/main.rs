use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use depo::config::Config;
use depo::demo::{seed_tasks, task, TASK_MODEL};
use depo::storage::{CacheOptions, CachingRepository};
use depo_core::cache::{
    all_key, cache_key, get_prefix, paginate_prefix, KeywordTrail, TaggedCache,
};
use depo_core::query::ScopeCommand;
use depo_core::storage::{Columns, Model, Pagination, RecordRepository, Row};

/// Depo - Repositories with tag-invalidated query caching
#[derive(Parser, Debug)]
#[command(name = "depo")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed a task model and run the caching scenario, logging read counts
    Demo {
        /// Number of completed tasks to seed
        #[arg(long, default_value = "10")]
        completed: usize,

        /// Number of in-progress tasks to seed
        #[arg(long, default_value = "8")]
        in_progress: usize,

        /// Cache TTL in seconds
        #[arg(long, env = "CACHE_TTL_SECONDS")]
        ttl: Option<u64>,
    },

    /// Print the keyword trail and cache key a chain of scopes produces
    Key {
        /// Terminal read the key is for
        #[arg(value_enum)]
        operation: Operation,

        /// Page size for `paginate`
        #[arg(long, default_value = "15")]
        per_page: u32,

        /// Page number for `paginate`
        #[arg(long, default_value = "1")]
        page: u32,

        /// Comma-separated columns to select (default: all)
        #[arg(long)]
        columns: Option<String>,

        /// Scope calls as `name` or `name:arg1,arg2`
        scopes: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Operation {
    Get,
    All,
    Paginate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "depo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Command::Demo {
            completed,
            in_progress,
            ttl,
        } => {
            let config = Config::from_env();
            let ttl = ttl.map_or_else(|| config.cache_ttl(), Duration::from_secs);
            demo(&config, ttl, completed, in_progress).await
        }
        Command::Key {
            operation,
            per_page,
            page,
            columns,
            scopes,
        } => {
            let columns = columns
                .map(|list| Columns::only(list.split(',').map(str::trim)))
                .unwrap_or_default();
            let commands: Vec<ScopeCommand> = scopes.iter().map(|s| parse_scope(s)).collect();
            let pagination = Pagination::new(per_page, page)?;
            let (keywords, key) = key_for(operation, pagination, &columns, &commands);

            println!("keywords: {keywords}");
            println!("key: {key}");
            Ok(())
        }
    }
}

/// Parses `name` or `name:arg1,arg2` into a scope command.
///
/// Arguments are read as JSON, falling back to plain strings.
fn parse_scope(input: &str) -> ScopeCommand {
    let Some((name, args)) = input.split_once(':') else {
        return ScopeCommand::new(input.trim());
    };

    args.split(',')
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .fold(ScopeCommand::new(name.trim()), |command, arg| {
            let value = serde_json::from_str::<Value>(arg)
                .unwrap_or_else(|_| Value::String(arg.to_string()));
            command.arg(value)
        })
}

fn key_for(
    operation: Operation,
    pagination: Pagination,
    columns: &Columns,
    commands: &[ScopeCommand],
) -> (KeywordTrail, String) {
    let keywords: KeywordTrail = commands.iter().map(ScopeCommand::keyword).collect();
    let key = match operation {
        Operation::Get => cache_key(&get_prefix(columns), &keywords),
        Operation::Paginate => cache_key(&paginate_prefix(pagination, columns), &keywords),
        Operation::All => all_key(columns),
    };
    (keywords, key)
}

async fn demo(config: &Config, ttl: Duration, completed: usize, in_progress: usize) -> Result<()> {
    #[cfg(feature = "redis")]
    let cache: Arc<dyn TaggedCache> =
        Arc::new(depo::cache::RedisCache::new(&config.redis_url).await?);
    #[cfg(not(feature = "redis"))]
    let cache: Arc<dyn TaggedCache> = Arc::new(config.memory_cache()?);

    run_with_storage(config, cache, ttl, completed, in_progress).await
}

#[cfg(feature = "sqlite")]
async fn run_with_storage(
    config: &Config,
    cache: Arc<dyn TaggedCache>,
    ttl: Duration,
    completed: usize,
    in_progress: usize,
) -> Result<()> {
    let model = depo::storage::sqlite::SqliteModel::open(&config.sqlite_path, TASK_MODEL)
        .await?
        .with_scopes(depo::demo::task_scopes());
    tracing::info!(path = %config.sqlite_path, "Using SQLite storage");
    run_demo(model, cache, ttl, completed, in_progress, |m| m.read_count()).await
}

#[cfg(not(feature = "sqlite"))]
async fn run_with_storage(
    _config: &Config,
    cache: Arc<dyn TaggedCache>,
    ttl: Duration,
    completed: usize,
    in_progress: usize,
) -> Result<()> {
    let model = depo::demo::task_model();
    tracing::info!(model = TASK_MODEL, "Using in-memory storage");
    run_demo(model, cache, ttl, completed, in_progress, |m| m.read_count()).await
}

async fn run_demo<M>(
    model: M,
    cache: Arc<dyn TaggedCache>,
    ttl: Duration,
    completed: usize,
    in_progress: usize,
    read_count: impl Fn(&M) -> usize,
) -> Result<()>
where
    M: Model<Record = Row> + Clone + 'static,
{
    seed_tasks(&model, completed, in_progress).await?;

    let mut tasks =
        CachingRepository::from_model(model.clone(), ttl, cache, CacheOptions::new())?;
    tracing::info!(
        primary_tag = tasks.primary_tag(),
        ttl_seconds = ttl.as_secs(),
        "Caching repository ready"
    );

    for round in 1..=2 {
        let open = tasks
            .scope(ScopeCommand::new("inProgress"))
            .await?
            .get(&Columns::All)
            .await?;
        let done = tasks
            .scope(ScopeCommand::new("completed"))
            .await?
            .get(&Columns::All)
            .await?;
        tracing::info!(
            round,
            in_progress = open.len(),
            completed = done.len(),
            reads = read_count(&model),
            "Scoped reads"
        );
    }

    for round in 1..=2 {
        let everything = tasks.all(&Columns::All).await?;
        tracing::info!(
            round,
            rows = everything.len(),
            reads = read_count(&model),
            "All rows"
        );
    }

    let created = tasks.create(task("Task added by the demo", false)).await?;
    let open = tasks
        .scope(ScopeCommand::new("inProgress"))
        .await?
        .get(&Columns::All)
        .await?;
    tracing::info!(
        id = created.id,
        in_progress = open.len(),
        reads = read_count(&model),
        "Read after write"
    );

    Ok(())
}
