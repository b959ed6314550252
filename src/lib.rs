pub mod agent_core;
pub mod api;
pub mod config;
pub mod inference;
pub mod workforce;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use agent_core::{
    DatasetStore, Dispatcher, IntentClassifier, MemoryDatasetStore, SqliteDatasetStore,
};
use config::{AppConfig, StorageBackend, StorageConfig};
use inference::{InferenceClient, LlmGenerator, TextGenerator};

/// Return the platform-standard data directory for AgentFlow.
///
/// - macOS: `~/Library/Application Support/agentflow/`
/// - Windows: `{FOLDERID_RoamingAppData}\agentflow\`
/// - Linux: `$XDG_DATA_HOME/agentflow/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.agentflow/` only if none of the above can be resolved.
pub(crate) fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("agentflow");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agentflow")
}

/// Environment variable selecting the log line format.
const LOG_FORMAT_ENV: &str = "AGENTFLOW_LOG_FORMAT";

/// Whether `AGENTFLOW_LOG_FORMAT` asks for one JSON object per line.
fn json_logs_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Initialize the tracing subscriber, writing to `<data_dir>/agentflow.log`.
///
/// Rotates existing logs first (keeps the last 3), then opens a fresh file
/// behind a line-flushing writer and logs a startup banner. Lines are plain
/// text unless `AGENTFLOW_LOG_FORMAT=json`.
fn init_tracing() -> std::io::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir();
    std::fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("agentflow.log");
    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agentflow=info,tower_http=info,warn"));

    let json = json_logs_requested(std::env::var(LOG_FORMAT_ENV).ok().as_deref());
    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(FlushingWriter::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        json,
        data_dir = %log_dir.display(),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== AgentFlow starting ==="
    );
    Ok(())
}

/// Rotate log files: `agentflow.log` → `agentflow.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    // Shift: .{n-1} → .{n}
    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write, so
/// each log line is on disk before the next request is handled.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Startup ────────────────────────────────────────────────────────────────

/// Load `agentflow.yaml`; the binary refuses to start without one.
fn load_app_config() -> anyhow::Result<AppConfig> {
    let (config, path) = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(
        path = %path.display(),
        bind = %config.server.bind,
        storage = ?config.storage.backend,
        active_model = %config.models.active_model,
        "configuration loaded"
    );
    Ok(config)
}

fn open_store(storage: &StorageConfig) -> anyhow::Result<Arc<dyn DatasetStore>> {
    match storage.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory dataset store");
            Ok(Arc::new(MemoryDatasetStore::new()))
        }
        StorageBackend::Sqlite => {
            let path = storage.sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let store = SqliteDatasetStore::open(&path.to_string_lossy())
                .context("failed to open dataset database")?;
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("shutdown requested");
}

/// Build every component and serve HTTP until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing FIRST, before any tracing::info!() calls
    init_tracing().context("failed to initialize logging")?;

    let config = load_app_config()?;
    let store = open_store(&config.storage)?;

    let client = InferenceClient::from_config(config.models.clone())
        .context("failed to build inference client")?;
    let llm = LlmGenerator::new(client);
    if llm.is_reachable().await {
        tracing::info!(model = %llm.model_name(), "model endpoint reachable");
    } else {
        tracing::warn!(
            model = %llm.model_name(),
            "model endpoint unreachable at startup; requests will use the fallback chain"
        );
    }

    let generator: Arc<dyn TextGenerator> = Arc::new(llm.clone());
    let dispatcher = Dispatcher::new(
        IntentClassifier::new(Arc::clone(&generator)),
        generator,
        store,
    );

    let state = Arc::new(api::ApiState::new(dispatcher, Some(llm), config.server.clone()));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("=== AgentFlow stopped ===");
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
