//! CLI for Vitrine — offline-first kiosk catalogue store.
//!
//! ```bash
//! vitrine run local /srv/kiosk-sync --db kiosk.redb
//! vitrine run api https://kiosk.example.com/api/snapshot --api-key SECRET
//! vitrine run shared https://cdn.example.com/kiosk/database.json
//! vitrine export backup.json
//! vitrine import backup.json
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vitrine_core::{Catalog, NoopEventHandler, ProviderKind, StateStore, SyncConfig, SyncEngine};

/// Vitrine — offline-first kiosk catalogue store.
///
/// Runs the durable store with an optional sync provider, and manages
/// backup files.
#[derive(Parser)]
#[command(name = "vitrine", version, about)]
struct Cli {
  /// Verbose output (repeatable: -v, -vv).
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  /// Command.
  #[command(subcommand)]
  command: Commands
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
  /// Run the store with a sync provider.
  Run {
    /// Provider to sync with.
    #[command(subcommand)]
    provider: RunProvider
  },

  /// Write the current state to a backup file.
  Export {
    /// Output file.
    file: PathBuf,

    /// State database file.
    #[arg(long, default_value = "vitrine.redb")]
    db: PathBuf
  },

  /// Restore state from a backup file.
  Import {
    /// Backup file to restore.
    file: PathBuf,

    /// State database file.
    #[arg(long, default_value = "vitrine.redb")]
    db: PathBuf
  },

  /// Print an example configuration.
  GenConfig
}

/// Sync provider for `run`.
#[derive(Subcommand)]
enum RunProvider {
  /// No provider; the local store is the only copy.
  Standalone {
    /// State database file.
    #[arg(long, default_value = "vitrine.redb")]
    db: PathBuf
  },

  /// Sync through a snapshot file in a local directory.
  Local {
    /// The sync directory (shared with other kiosk devices).
    dir: PathBuf,

    /// State database file.
    #[arg(long, default_value = "vitrine.redb")]
    db: PathBuf,

    /// Interval for polling the directory (seconds).
    #[arg(long, default_value = "5")]
    poll_interval: u64,

    /// Debounce window before a push (milliseconds).
    #[arg(long, default_value = "2500")]
    debounce_ms: u64
  },

  /// Sync through a custom snapshot API.
  Api {
    /// Snapshot endpoint URL.
    url: String,

    /// Shared secret sent as x-api-key.
    #[arg(long, env = "VITRINE_API_KEY")]
    api_key: Option<String>,

    /// State database file.
    #[arg(long, default_value = "vitrine.redb")]
    db: PathBuf,

    /// Interval for polling the endpoint (seconds).
    #[arg(long, default_value = "5")]
    poll_interval: u64,

    /// Debounce window before a push (milliseconds).
    #[arg(long, default_value = "2500")]
    debounce_ms: u64
  },

  /// Follow a public read-only snapshot URL.
  Shared {
    /// Public snapshot URL.
    url: String,

    /// State database file.
    #[arg(long, default_value = "vitrine.redb")]
    db: PathBuf,

    /// Interval for polling the URL (seconds).
    #[arg(long, default_value = "5")]
    poll_interval: u64,

    /// Debounce window before a push (milliseconds).
    #[arg(long, default_value = "2500")]
    debounce_ms: u64
  }
}

fn init_tracing(verbose: u8) {
  let filter = match verbose {
    0 => "info",
    1 => "debug",
    _ => "trace"
  };

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
    )
    .compact()
    .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match cli.command {
    Commands::Run { provider } => cmd_run(provider).await,
    Commands::Export { file, db } => cmd_export(&file, &db).await,
    Commands::Import { file, db } => cmd_import(&file, &db).await,
    Commands::GenConfig => cmd_gen_config()
  }
}

/// Open the store and load the catalog.
async fn open_catalog(db: &Path) -> anyhow::Result<Arc<Catalog>> {
  let store = StateStore::open(db).context("opening state database")?;
  Ok(Arc::new(Catalog::load(store).await))
}

/// Command `run`.
async fn cmd_run(provider: RunProvider) -> anyhow::Result<()> {
  match provider {
    RunProvider::Standalone { db } => {
      let catalog = open_catalog(&db).await?;
      catalog
        .set_provider_selection(ProviderKind::None, None)
        .await;

      info!("running without a sync provider, ctrl-c to stop");
      tokio::signal::ctrl_c().await?;
      Ok(())
    }
    RunProvider::Local {
      dir,
      db,
      poll_interval,
      debounce_ms
    } => {
      let catalog = open_catalog(&db).await?;

      let provider = vitrine_fs::LocalDirProvider::new(vitrine_fs::LocalDirConfig {
        root: dir.clone(),
        poll_interval_secs: poll_interval
      });

      let (engine, handle) = vitrine_core::start_sync(
        SyncConfig { debounce_ms },
        catalog.clone(),
        Arc::new(provider),
        Arc::new(NoopEventHandler)
      )
      .await
      .context("connecting to the sync directory")?;

      catalog
        .set_provider_selection(ProviderKind::Local, Some(dir))
        .await;

      run_until_ctrl_c(&catalog, &engine, handle).await
    }
    RunProvider::Api {
      url,
      api_key,
      db,
      poll_interval,
      debounce_ms
    } => {
      let catalog = open_catalog(&db).await?;

      let provider = vitrine_http::HttpApiProvider::new(&vitrine_http::HttpConfig {
        url,
        api_key,
        poll_interval_secs: poll_interval
      })
      .context("building the api client")?;

      let (engine, handle) = vitrine_core::start_sync(
        SyncConfig { debounce_ms },
        catalog.clone(),
        Arc::new(provider),
        Arc::new(NoopEventHandler)
      )
      .await
      .context("connecting to the snapshot api")?;

      catalog
        .set_provider_selection(ProviderKind::CustomApi, None)
        .await;

      run_until_ctrl_c(&catalog, &engine, handle).await
    }
    RunProvider::Shared {
      url,
      db,
      poll_interval,
      debounce_ms
    } => {
      let catalog = open_catalog(&db).await?;

      let provider = vitrine_http::SharedUrlProvider::new(&vitrine_http::HttpConfig {
        url,
        api_key: None,
        poll_interval_secs: poll_interval
      })
      .context("building the shared url client")?;

      let (engine, handle) = vitrine_core::start_sync(
        SyncConfig { debounce_ms },
        catalog.clone(),
        Arc::new(provider),
        Arc::new(NoopEventHandler)
      )
      .await
      .context("connecting to the shared url")?;

      catalog
        .set_provider_selection(ProviderKind::SharedUrl, None)
        .await;

      run_until_ctrl_c(&catalog, &engine, handle).await
    }
  }
}

/// Wait for ctrl-c, then flush pending mutations and stop the engine.
async fn run_until_ctrl_c(
  catalog: &Arc<Catalog>,
  engine: &SyncEngine,
  handle: tokio::task::JoinHandle<()>
) -> anyhow::Result<()> {
  info!("sync running, ctrl-c to stop");
  tokio::signal::ctrl_c().await?;

  info!("shutting down");
  catalog.detach_sync();
  engine.shutdown().await?;
  handle.await.context("waiting for the sync engine")?;

  Ok(())
}

/// Command `export`.
async fn cmd_export(file: &Path, db: &Path) -> anyhow::Result<()> {
  let catalog = open_catalog(db).await?;
  let snapshot = catalog.snapshot().await;

  let json = serde_json::to_vec_pretty(&snapshot).context("encoding backup")?;
  tokio::fs::write(file, &json)
    .await
    .with_context(|| format!("writing {}", file.display()))?;

  info!(
    file = %file.display(),
    bytes = json.len(),
    clock = snapshot.settings.last_updated,
    "backup exported"
  );
  Ok(())
}

/// Command `import`.
async fn cmd_import(file: &Path, db: &Path) -> anyhow::Result<()> {
  let raw = tokio::fs::read(file)
    .await
    .with_context(|| format!("reading {}", file.display()))?;
  let value: serde_json::Value =
    serde_json::from_slice(&raw).context("backup file is not JSON")?;

  let catalog = open_catalog(db).await?;
  catalog.restore_backup(value).await;

  info!(file = %file.display(), "backup imported");
  Ok(())
}

/// Command `gen-config` — example configuration.
#[allow(clippy::unnecessary_wraps)]
fn cmd_gen_config() -> anyhow::Result<()> {
  let example = r#"# Vitrine — example invocations
#
# One provider is active at a time. Switching providers disconnects the
# previous one; the local database stays the source of truth either way.

# Shared directory on a NAS, two kiosks converging through it:
#   vitrine run local /srv/kiosk-sync --db /var/lib/vitrine/kiosk.redb

# Self-hosted snapshot API:
#   VITRINE_API_KEY=secret vitrine run api https://kiosk.example.com/api/snapshot

# Read-mostly mirror of a published catalogue:
#   vitrine run shared https://cdn.example.com/kiosk/database.json --poll-interval 30

# Nightly backup:
#   vitrine export /backups/kiosk-$(date +%F).json
"#;

  println!("{example}");
  Ok(())
}
