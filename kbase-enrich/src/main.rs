//! kbase - knowledge-base enrichment and reconciliation
//!
//! `kbase enrich` runs one enrichment pass over the catalog file.
//! `kbase serve` starts the local reconciliation service (default port 8765).
//! `kbase overlay ...` edits the local overlay of pending additions/removals
//! and commits it, either to a file or to a running service.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use kbase_common::config::{load_toml_config, resolve_catalog_path, resolve_overlay_dir, TomlConfig};
use kbase_common::{CatalogStore, ItemDraft, ItemKind, OverlayCache};
use kbase_enrich::extract::{extract_arxiv_id, title_from_url};
use kbase_enrich::reconcile::{
    CommitTransport, Delivery, LocalExport, ReconciliationService, ServerPush,
};
use kbase_enrich::sources::ArxivClient;
use kbase_enrich::{build_router, AppState, Enricher, EnrichmentSummary};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Upper bound for a push: the server runs a whole enrichment pass before answering
const PUSH_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Parser)]
#[command(name = "kbase", version, about = "Knowledge-base enrichment and reconciliation")]
struct Cli {
    /// TOML config file (default: <config dir>/kbase/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog JSON document (overrides KBASE_CATALOG and the config file)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one enrichment pass over the catalog
    Enrich,

    /// Serve the reconciliation API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Edit or commit pending changes
    #[command(subcommand)]
    Overlay(OverlayCommand),
}

#[derive(Debug, Subcommand)]
enum OverlayCommand {
    /// Queue an item for addition
    Add {
        #[arg(long)]
        url: String,
        /// Looked up from arXiv, or guessed from the url, when omitted
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: String,
        #[arg(long = "type", default_value = "paper")]
        kind: String,
        #[arg(long)]
        summary: Option<String>,
    },

    /// Toggle removal of an item by url
    Remove { url: String },

    /// Drop every pending removal
    ClearRemovals,

    /// Show pending changes
    Status,

    /// Commit by writing the merged catalog to a file
    Export { path: PathBuf },

    /// Commit by saving to a running service and enriching there
    Push {
        /// Service base url (default: from [server] config)
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_toml_config(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "kbase v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let store = CatalogStore::new(resolve_catalog_path(cli.catalog.as_deref(), &config));
    info!("Catalog: {}", store.path().display());

    match cli.command.unwrap_or(Command::Enrich) {
        Command::Enrich => run_enrich(&config, &store).await,
        Command::Serve { host, port } => run_serve(&config, store, host, port).await,
        Command::Overlay(command) => run_overlay(&config, &store, command).await,
    }
}

async fn run_enrich(config: &TomlConfig, store: &CatalogStore) -> Result<()> {
    let enricher = Enricher::from_config(&config.enrichment)?;
    let summary = enricher.run(store).await?;
    log_summary(&summary);
    Ok(())
}

async fn run_serve(
    config: &TomlConfig,
    store: CatalogStore,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let enricher = Enricher::from_config(&config.enrichment)?;
    if let Some(page) = &config.page_path {
        info!("Serving page: {}", page.display());
    }
    let state = AppState::new(store, enricher, config.page_path.clone());
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("kbase listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_overlay(config: &TomlConfig, store: &CatalogStore, command: OverlayCommand) -> Result<()> {
    let cache = OverlayCache::new(resolve_overlay_dir(config));
    let mut service = ReconciliationService::open_default(cache);

    match command {
        OverlayCommand::Add {
            url,
            title,
            category,
            kind,
            summary,
        } => {
            let title = match title {
                Some(title) => title,
                None => lookup_title(config, &url).await?,
            };
            let draft = ItemDraft::new(title, url.as_str(), ItemKind::from(kind), category)
                .with_summary(summary);
            service.add_pending(draft)?;
            info!("Queued {}", url);
            print_status(&service);
        }
        OverlayCommand::Remove { url } => {
            if service.toggle_removal(&url)? {
                info!("Marked for removal: {}", url);
            } else {
                info!("Unmarked: {}", url);
            }
            print_status(&service);
        }
        OverlayCommand::ClearRemovals => {
            let cleared = service.clear_removals()?;
            info!("Cleared {} pending removals", cleared);
            print_status(&service);
        }
        OverlayCommand::Status => {
            print_status(&service);
            let overlay = service.overlay();
            for draft in &overlay.pending_additions {
                println!("  + [{}] {} <{}>", draft.category, draft.item.title(), draft.item.url());
            }
            for url in &overlay.pending_removals {
                println!("  - {}", url);
            }
        }
        OverlayCommand::Export { path } => {
            commit(&mut service, store, &LocalExport::new(path)).await?;
        }
        OverlayCommand::Push { server } => {
            let base_url = server.unwrap_or_else(|| {
                format!("http://{}:{}", config.server.host, config.server.port)
            });
            info!("Pushing to {}", base_url);
            commit(&mut service, store, &ServerPush::new(base_url, PUSH_TIMEOUT)?).await?;
        }
    }

    Ok(())
}

async fn commit(
    service: &mut ReconciliationService,
    store: &CatalogStore,
    transport: &dyn CommitTransport,
) -> Result<()> {
    if service.overlay().is_empty() {
        info!("Nothing pending");
        return Ok(());
    }

    let catalog = store.load()?;
    let report = service.commit(&catalog, transport).await?;
    info!(
        "Committed {} additions and {} removals",
        report.additions, report.removals
    );
    match report.delivery {
        Delivery::Exported { path } => info!("Wrote {}", path.display()),
        Delivery::Saved { summary } => log_summary(&summary),
    }
    Ok(())
}

/// arXiv title for arXiv urls, otherwise a guess from the url path
async fn lookup_title(config: &TomlConfig, url: &str) -> Result<String> {
    if let Some(id) = extract_arxiv_id(url) {
        info!("Looking up title for arXiv {}", id);
        let client = ArxivClient::new(&config.enrichment)?;
        match client.fetch_title(&id).await {
            Ok(Some(title)) => {
                info!("Title: {}", title);
                return Ok(title);
            }
            Ok(None) => warn!("arXiv has no entry for {}", id),
            Err(e) => warn!("Title lookup failed: {}", e),
        }
    }

    let title = title_from_url(url).ok_or_else(|| anyhow!("No title found for {}; pass --title", url))?;
    info!("Title (from url): {}", title);
    Ok(title)
}

fn print_status(service: &ReconciliationService) {
    let overlay = service.overlay();
    println!(
        "{} to add, {} to remove",
        overlay.pending_additions.len(),
        overlay.pending_removals.len()
    );
}

fn log_summary(summary: &EnrichmentSummary) {
    info!("Papers processed: {}", summary.papers_processed);
    info!("ArXiv enriched: {}", summary.arxiv_enriched);
    info!("ACL enriched: {}", summary.acl_enriched);
    info!(
        "Items with summary: {}/{}",
        summary.items_with_summary, summary.total_items
    );
}
