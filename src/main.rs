use std::{net::SocketAddr, path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use gatehouse::{
    adapters::{HttpClientAdapter, HttpHandler, RedisCounterStore, build_router},
    config::{GatewayConfig, GatewayConfigValidator},
    core::{Pipeline, RateLimiter, TokenValidator},
    metrics,
    ports::{counter_store::CounterStore, http_client::HttpClient},
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "gatehouse.yaml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "gatehouse.yaml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "gatehouse.yaml")]
        config: String,
    },
    /// Issue a signed bearer token for a subject
    Token {
        /// Configuration file holding the signing secret
        #[clap(short, long, default_value = "gatehouse.yaml")]
        config: String,
        /// Subject to issue the token for
        #[clap(short, long)]
        subject: String,
    },
    /// Start the gateway server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "gatehouse.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Token { config, subject }) => token_command(&config, &subject).await,
        Some(Commands::Serve { config }) => serve_command(&config).await,
        None => serve_command(&args.config).await,
    }
}

async fn serve_command(config_path: &str) -> Result<()> {
    tracing_setup::init_tracing().map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    metrics::init_metrics().map_err(|e| eyre!("Failed to initialize metrics: {}", e))?;

    tracing::info!("Loading configuration from {config_path}");

    let config: GatewayConfig = gatehouse::config::load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    GatewayConfigValidator::validate(&config).map_err(|e| eyre!("Invalid configuration:\n{e}"))?;

    // Parsed once here; validation already vetted the duration strings
    let window = config.rate_limit.window()?;
    let store_timeout = config.rate_limit.store_timeout()?;
    let upstream_timeout = config.upstream.timeout()?;

    let store: Arc<dyn CounterStore> = Arc::new(
        RedisCounterStore::connect(&config.rate_limit.store_url, store_timeout)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to counter store at {}",
                    config.rate_limit.store_url
                )
            })?,
    );

    let validator = Arc::new(TokenValidator::new(&config.auth));
    let limiter = RateLimiter::new(store, config.rate_limit.requests, window);
    let http_client: Arc<dyn HttpClient> = Arc::new(HttpClientAdapter::new());

    let handlers = Pipeline::build(
        &config.routes,
        validator,
        limiter,
        http_client,
        upstream_timeout,
    );

    for route in &config.routes {
        tracing::info!("Configured route: {} -> {}", route.path, route.authority());
    }

    let http_handler = Arc::new(HttpHandler::new(handlers));
    let app = build_router(http_handler);

    // Create graceful shutdown manager
    let graceful_shutdown = Arc::new(GracefulShutdown::new());

    // Start signal handler for graceful shutdown
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(
        "Gatehouse API Gateway listening on {} ({} routes, limit {}/{})",
        addr,
        config.routes.len(),
        config.rate_limit.requests,
        config.rate_limit.window
    );

    tokio::select! {
        result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        ) => {
            result.context("Server error")
        },
        shutdown_reason = graceful_shutdown.wait_for_shutdown_signal() => {
            tracing::info!("Shutdown signal received: {:?}", shutdown_reason);
            tracing::info!("Graceful shutdown completed");
            Ok(())
        }
    }
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    use gatehouse::config::loader::load_config;

    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match GatewayConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Routes: {}", config.routes.len());
            println!("   • Counter Store: {}", config.rate_limit.store_url);
            println!(
                "   • Rate Limit: {} requests per {}",
                config.rate_limit.requests, config.rate_limit.window
            );
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Verify listen address format (e.g., '127.0.0.1:8080')");
            println!("   • Ensure auth.secret is set and non-empty");
            println!("   • Ensure durations use valid units (s, m, h)");
            println!("   • Check that route paths start with '/' and are unique");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Gatehouse API Gateway Configuration

# The address to listen on
listen_addr: "127.0.0.1:8080"

# Bearer token signing
auth:
  secret: "change-me"
  token_ttl: "24h"

# Per-client quota against the shared counter store
rate_limit:
  store_url: "redis://127.0.0.1:6379"
  requests: 100
  window: "60s"

# Backend call settings
upstream:
  timeout: "30s"

# Route table: exact path -> backend
routes:
  - path: "/users"
    backend_host: "svc-users"
    backend_port: 9000
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'gatehouse serve --config {config_path}' to start the server");
    Ok(())
}

/// Issue a token signed with the configured secret
async fn token_command(config_path: &str, subject: &str) -> Result<()> {
    if subject.is_empty() {
        eprintln!("❌ Error: subject must be non-empty");
        std::process::exit(1);
    }

    let config: GatewayConfig = gatehouse::config::load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    if config.auth.secret.is_empty() {
        eprintln!("❌ Error: auth.secret is empty in '{config_path}'");
        std::process::exit(1);
    }

    let validator = TokenValidator::new(&config.auth);
    let token = validator
        .generate(subject)
        .map_err(|e| eyre!("Failed to issue token: {e}"))?;

    println!("{token}");
    Ok(())
}
