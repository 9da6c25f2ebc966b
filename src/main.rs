use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use pantry_raider::access::validation::validate_email;
use pantry_raider::auth::TokenGenerator;
use pantry_raider::config::ServerConfig;
use pantry_raider::server::{AppState, create_router};
use pantry_raider::store::{SqliteStore, Store, normalize_email};
use pantry_raider::types::User;

const NOT_INITIALIZED: &str =
    "Server not initialized. Run 'pantry-raider admin init' first to create the database and admin token.";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "pantry-raider")]
#[command(about = "A shared pantry inventory server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags below override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to [default: 127.0.0.1]
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to [default: 8080]
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database [default: ./data]
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Timeout for a single store call in milliseconds [default: 5000]
        #[arg(long)]
        store_timeout_ms: Option<u64>,

        /// Public base URL for external access (e.g., "https://pantry.example.com")
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Create a user and print a token for them
    AddUser {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Email address of the new user
        #[arg(long)]
        email: String,
    },
}

fn open_store(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    let config = ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..ServerConfig::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    Ok(store)
}

fn run_init(data_dir: PathBuf, non_interactive: bool) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let store = open_store(&data_dir)?;
    let token_file = data_dir.join(".admin_token");

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new();
    let (_, raw_token) = generator.issue(&store, None, None)?;

    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_first_user_prompt(&store, &generator)?;
    }

    Ok(())
}

fn create_first_user_prompt(store: &SqliteStore, generator: &TokenGenerator) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create a first user?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let email = inquire::Text::new("Email:")
        .with_validator(|input: &str| match validate_email(input) {
            Ok(()) => Ok(inquire::validator::Validation::Valid),
            Err(e) => Ok(inquire::validator::Validation::Invalid(e.to_string().into())),
        })
        .prompt()?;

    create_user_with_token(store, generator, &email)
}

fn create_user_with_token(
    store: &dyn Store,
    generator: &TokenGenerator,
    email: &str,
) -> anyhow::Result<()> {
    validate_email(email)?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: normalize_email(email),
        created_at: Utc::now(),
    };
    store
        .create_user(&user)
        .with_context(|| format!("failed to create user '{}'", user.email))?;

    let (_, raw_token) = generator.issue(store, Some(&user.id), None)?;

    println!();
    println!("========================================");
    println!("Created user '{}' ({}) with token:", user.email, user.id);
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();

    Ok(())
}

fn run_add_user(data_dir: PathBuf, email: String) -> anyhow::Result<()> {
    let store = open_store(&data_dir)?;
    if !store.has_admin_token()? {
        bail!(NOT_INITIALIZED);
    }

    create_user_with_token(&store, &TokenGenerator::new(), &email)
}

async fn run_serve(
    config_file: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    store_timeout_ms: Option<u64>,
    public_base_url: Option<String>,
) -> anyhow::Result<()> {
    let mut config = match &config_file {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(ms) = store_timeout_ms {
        config.store_timeout_ms = ms;
    }
    if public_base_url.is_some() {
        config.public_base_url = public_base_url;
    }
    config.validate()?;

    let token_file = config.admin_token_path();
    if !token_file.exists() {
        bail!(NOT_INITIALIZED);
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(NOT_INITIALIZED);
    }

    info!("Admin token available at {}", token_file.display());

    let state = Arc::new(AppState::new(Arc::new(store), &config));
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!(
        store_timeout_ms = config.store_timeout_ms,
        "Starting server on {}", addr
    );
    if let Some(url) = &config.public_base_url {
        info!("Public URL: {url}");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("pantry_raider=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => run_init(data_dir, non_interactive)?,
            AdminCommands::AddUser { data_dir, email } => run_add_user(data_dir, email)?,
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            store_timeout_ms,
            public_base_url,
        } => {
            run_serve(
                config,
                host,
                port,
                data_dir,
                store_timeout_ms,
                public_base_url,
            )
            .await?;
        }
    }

    Ok(())
}
