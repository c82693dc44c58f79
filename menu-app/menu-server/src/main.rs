use std::io::BufRead;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use menu_api::{build_router, AppState};
use menu_core::{migrate_catalog, CatalogStore, MenuService};
use menu_infrastructure::{open_catalog_store, DocumentStore};
use menu_security::{AdminCredentials, PasswordService, SessionGuard, SessionPolicy};
use menu_shared::config::AppConfig;
use menu_shared::StorageBackend;

#[derive(Parser)]
#[command(name = "menu-server")]
#[command(about = "Menu persistence and administration server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding default.toml and <APP_ENV>.toml
    #[arg(short, long, env = "APP_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server - Default
    Serve,
    /// Print an Argon2 hash for ADMIN_PASSWORD_HASH
    HashPassword {
        /// Read from stdin when omitted
        #[arg(long, env = "MENU_ADMIN_PASSWORD")]
        password: Option<String>,
    },
    /// Copy the JSON document into the relational store
    Migrate,
    /// Record a named copy of the current menu
    Snapshot {
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir);
    let _log_guard = menu_shared::telemetry::init_telemetry(
        config.as_ref().ok().and_then(|c| c.app.log_dir.as_deref()),
    );
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::HashPassword { password } => hash_password(&config, password),
        Commands::Migrate => migrate(&config).await,
        Commands::Snapshot { name } => snapshot(&config, name).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!("{} starting ({})", config.app.name, config.app.env);
    config.validate()?;

    let store = open_catalog_store(&config.storage).await?;
    if let Err(e) = store.initialize().await {
        error!("Failed to initialize {} storage: {}", store.backend(), e);
        return Err(e.into());
    }
    info!("Storage ready ({})", store.backend());

    let menu = Arc::new(MenuService::new(store, config.storage.lock_timeout()));
    let guard = Arc::new(SessionGuard::new(
        AdminCredentials {
            username: config.admin.username.clone(),
            password_hash: config.admin.password_hash.clone(),
        },
        SessionPolicy::from(&config.admin),
    ));
    let app = build_router(AppState::new(menu, guard));

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn hash_password(config: &AppConfig, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("reading password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    if PasswordService::check_strength(&password, &config.admin.username).is_err() {
        warn!("Password is weak; consider a longer passphrase");
    }

    let hash = PasswordService::hash(&password)?;
    println!("ADMIN_PASSWORD_HASH='{}'", hash);
    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let source = DocumentStore::from_settings(&config.storage);

    let mut target_settings = config.storage.clone();
    target_settings.backend = StorageBackend::Relational;
    let target = open_catalog_store(&target_settings).await?;
    target.initialize().await?;

    let report = migrate_catalog(&source, target.as_ref()).await?;
    info!(
        "Migrated {} categories and {} items from {}",
        report.categories,
        report.items,
        source.path().display()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn snapshot(config: &AppConfig, name: Option<String>) -> anyhow::Result<()> {
    let store = open_catalog_store(&config.storage).await?;
    store
        .initialize()
        .await
        .with_context(|| format!("Failed to prepare {} storage", store.backend()))?;
    let menu = MenuService::new(store, config.storage.lock_timeout());
    let snapshot = menu.create_snapshot(name).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
