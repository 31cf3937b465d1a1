//! Content Resolver
//!
//! HTTP service registering video content under wildcard-aware URL
//! patterns and resolving request URLs to it, with a popularity-tiered hot
//! cache in front of a file-per-origin store.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use content_resolver::{
    ApiServer, CacheBackendKind, ContentRepositoryRef, ContentService, FileContentStore,
    HotCache, MemoryContentStore, Prewarmer, ResolverConfig, ResolverMetrics,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Persistent store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// JSON file per origin
    File,
    /// In-process, lost on exit
    Memory,
}

/// Hot cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CacheBackendArg {
    /// In-process, lost on exit
    Memory,
    /// Shared Redis-compatible server
    Redis,
}

impl From<CacheBackendArg> for CacheBackendKind {
    fn from(arg: CacheBackendArg) -> Self {
        match arg {
            CacheBackendArg::Memory => CacheBackendKind::Memory,
            CacheBackendArg::Redis => CacheBackendKind::Redis,
        }
    }
}

/// Content Resolver - wildcard-aware content lookup with a hot cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "RESOLVER_CONFIG")]
    config: Option<PathBuf>,

    /// REST API bind address
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<SocketAddr>,

    /// Root directory of the file store
    #[arg(long, env = "STORE_ROOT")]
    store_root: Option<PathBuf>,

    /// Persistent store implementation
    #[arg(long, env = "STORE_KIND", value_enum, default_value = "file")]
    store: StoreKind,

    /// Disable the hot cache tier
    #[arg(long, env = "NO_CACHE")]
    no_cache: bool,

    /// Hot cache backend (defaults to the configured one, else memory)
    #[arg(long, env = "CACHE_BACKEND", value_enum)]
    cache_backend: Option<CacheBackendArg>,

    /// Redis URL for the hot cache; selects the redis backend
    #[arg(long, env = "CACHE_URL")]
    cache_url: Option<String>,

    /// Maximum entries kept by the in-memory cache backend
    #[arg(long, env = "CACHE_MAX_ENTRIES")]
    cache_max_entries: Option<usize>,

    /// Number of popular paths refilled per prewarm run
    #[arg(long, env = "PREWARM_TOP_K")]
    prewarm_top_k: Option<usize>,

    /// Seconds between prewarm runs
    #[arg(long, env = "PREWARM_INTERVAL")]
    prewarm_interval_secs: Option<u64>,

    /// Disable periodic prewarming
    #[arg(long, env = "NO_PREWARM")]
    no_prewarm: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// Apply CLI/env overrides on top of the file configuration
    fn apply(&self, config: &mut ResolverConfig) {
        if let Some(addr) = self.listen_addr {
            config.api.listen_addr = addr;
        }
        if let Some(root) = &self.store_root {
            config.store.root_path = root.clone();
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        if let Some(url) = &self.cache_url {
            config.cache.redis.url = url.clone();
            config.cache.backend = CacheBackendKind::Redis;
        }
        if let Some(backend) = self.cache_backend {
            config.cache.backend = backend.into();
        }
        if let Some(max_entries) = self.cache_max_entries {
            config.cache.max_entries = max_entries;
        }
        if let Some(top_k) = self.prewarm_top_k {
            config.prewarm.top_k = top_k;
        }
        if let Some(interval) = self.prewarm_interval_secs {
            config.prewarm.interval_secs = interval;
        }
        if self.no_prewarm {
            config.prewarm.enabled = false;
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let mut config = match &args.config {
        Some(path) => ResolverConfig::load(path)
            .await
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ResolverConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    info!("Starting Content Resolver");
    info!("  Version: {}", content_resolver::VERSION);
    info!("  REST API: {}", config.api.listen_addr);
    info!("  Store: {:?} ({})", args.store, config.store.root_path.display());
    info!(
        "  Hot cache: {} ({})",
        config.cache.enabled, config.cache.backend
    );

    // Create persistent store
    let repository: ContentRepositoryRef = match args.store {
        StoreKind::File => Arc::new(
            FileContentStore::with_config(config.store.clone())
                .await
                .context("initializing file store")?,
        ),
        StoreKind::Memory => {
            warn!("Using in-memory store; registrations are lost on exit");
            Arc::new(MemoryContentStore::new())
        }
    };

    // Create hot cache
    let cache = if config.cache.enabled {
        let cache = HotCache::connect(config.cache.clone())
            .await
            .context("connecting hot cache backend")?;
        Some(Arc::new(cache))
    } else {
        None
    };

    let shutdown = CancellationToken::new();
    let metrics = ResolverMetrics::new().context("registering metrics")?;
    let service = Arc::new(
        ContentService::new(repository, cache.clone(), metrics).with_shutdown(shutdown.clone()),
    );

    // Start prewarm task
    let prewarm_handle = cache.map(|cache| {
        Prewarmer::new(cache, Arc::new(service.resolver()), config.prewarm.clone())
            .spawn(shutdown.clone())
    });

    // Stop on Ctrl-C
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let server = ApiServer::new(config.api.clone(), service);
    let result = server.run(shutdown.clone()).await;

    shutdown.cancel();
    if let Some(handle) = prewarm_handle {
        let _ = handle.await;
    }

    result.context("API server failed")?;
    info!("Content Resolver shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "tower=warn", "tower_http=info", "axum=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
