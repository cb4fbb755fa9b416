//! Value set expansion CLI
//!
//! Usage:
//!   lexicon migrate
//!   lexicon expand <VERSION_UUID> [--force-new] [--codes]
//!   lexicon serialize <VERSION_UUID> [--expand]
//!   lexicon validate <VERSION_UUID>
//!   lexicon snapshots <VERSION_UUID>
//!
//! Configuration is read from `lexicon.toml` and `LEXICON__*` environment variables.

use anyhow::Context;
use clap::{Parser, Subcommand};
use lexicon_ecl_client::EclClient;
use lexicon_engine::{
    config::Config, db, logging, metrics, models::Code, EngineContext, LookupCache,
    ValueSetVersion,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "lexicon")]
#[command(about = "Expand FHIR value set versions against loaded terminologies")]
struct Cli {
    /// Print Prometheus metrics to stderr when the command finishes
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Expand a value set version and print its codes as JSON
    Expand {
        version_uuid: Uuid,
        /// Recompute even when a snapshot exists
        #[arg(long)]
        force_new: bool,
        /// Print one `system|version|code|display` line per code
        #[arg(long)]
        codes: bool,
    },
    /// Print the FHIR-shaped document of a value set version
    Serialize {
        version_uuid: Uuid,
        /// Expand first so the document carries the expansion
        #[arg(long)]
        expand: bool,
    },
    /// Check that every rule of a version can be evaluated
    Validate { version_uuid: Uuid },
    /// List stored snapshots of a version, newest first
    Snapshots { version_uuid: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
    let _logging_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    let pool = db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    if let Commands::Migrate = cli.command {
        db::migrate(&pool).await.context("Failed to run migrations")?;
        tracing::info!("Migrations applied");
        return Ok(());
    }

    let cache = Arc::new(LookupCache::from_config(&config.engine));
    let mut ctx = EngineContext::postgres(pool, cache, config.engine.clone());
    if config.terminology_server.is_enabled() {
        let client = EclClient::new(config.terminology_server.client_config())
            .context("Failed to create terminology server client")?;
        ctx = ctx.with_query_service(Arc::new(client));
    }

    let result = run(&ctx, cli.command).await;

    if cli.metrics {
        eprintln!("{}", metrics::gather_text()?);
    }
    result
}

async fn run(ctx: &EngineContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Migrate => Ok(()),
        Commands::Expand {
            version_uuid,
            force_new,
            codes,
        } => {
            let mut version = ValueSetVersion::load(ctx, version_uuid).await?;
            let expansion = version.expand(ctx, force_new).await?;

            let mut sorted: Vec<&Code> = expansion.iter().collect();
            sorted.sort();
            if codes {
                for code in sorted {
                    println!(
                        "{}|{}|{}|{}",
                        code.system(),
                        code.version(),
                        code.code(),
                        code.display()
                    );
                }
            } else {
                let contains: Vec<_> = sorted.into_iter().map(|c| c.serialize(true)).collect();
                println!("{}", serde_json::to_string_pretty(&contains)?);
            }
            Ok(())
        }
        Commands::Serialize {
            version_uuid,
            expand,
        } => {
            let mut version = ValueSetVersion::load(ctx, version_uuid).await?;
            version.load_definition(ctx).await?;
            if expand {
                version.expand(ctx, false).await?;
            }
            println!("{}", serde_json::to_string_pretty(&version.serialize()?)?);
            Ok(())
        }
        Commands::Validate { version_uuid } => {
            let mut version = ValueSetVersion::load(ctx, version_uuid).await?;
            version.load_rules(ctx).await?;

            let mut problems = Vec::new();
            if let Err(e) = version.validate_rules() {
                problems.push(e.to_string());
            }
            for rule in version.rules().values().flatten() {
                if let Err(e) = rule.operation() {
                    problems.push(e.to_string());
                }
            }

            if problems.is_empty() {
                println!("{} rules OK", version.rules().values().map(Vec::len).sum::<usize>());
                Ok(())
            } else {
                for problem in &problems {
                    println!("{problem}");
                }
                anyhow::bail!("{} problem(s) found", problems.len())
            }
        }
        Commands::Snapshots { version_uuid } => {
            for snapshot in ctx.expansions.list_snapshots(version_uuid).await? {
                println!(
                    "{}  {}  {} codes",
                    snapshot.uuid,
                    snapshot.timestamp.to_rfc3339(),
                    snapshot.size
                );
            }
            Ok(())
        }
    }
}
