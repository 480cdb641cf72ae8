//! Sentinel - Command audit gateway.
//!
//! Interposes between an autonomous agent and the shell: every command is
//! normalized, run through the deterministic hard-kill filter and (when
//! configured) an LLM-backed semantic auditor, and either executed,
//! rejected, or parked for human approval. The HTTP surface is token-gated
//! except for the health probe.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod api;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use api::{AppState, AuthMode, router};
use sentinel_approval::ApprovalQueue;
use sentinel_audit::{AuditLog, AuditRuntime, JsonlAuditSink};
use sentinel_exec::Executor;
use sentinel_llm::{GeminiAuditor, SemanticAuditor, SemanticConfig};
use sentinel_policy::{Policy, PolicyHandle, load_constitution};

/// How often the expiry sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Sentinel - command audit gateway
#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the constitution (policy) file
    #[arg(long, default_value = "constitution.yaml")]
    constitution: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8787")]
    listen: SocketAddr,

    /// Shared-secret token required on protected endpoints
    #[arg(long, env = "SENTINEL_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Disable auth entirely (development only)
    #[arg(long, env = "SENTINEL_DISABLE_AUTH", default_value_t = false)]
    disable_auth: bool,

    /// Per-command execution timeout in seconds (clamped to 1-300)
    #[arg(long, env = "SENTINEL_EXEC_TIMEOUT_SECS", default_value_t = sentinel_exec::DEFAULT_TIMEOUT_SECS)]
    exec_timeout_secs: u64,

    /// Gemini API key; without one the service starts degraded
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model to consult
    #[arg(long, default_value = "gemini-2.0-flash")]
    gemini_model: String,

    /// Ceiling timeout for one semantic audit call, in seconds
    #[arg(long, default_value_t = 10)]
    semantic_timeout_secs: u64,

    /// Pending-approval TTL in seconds
    #[arg(long, default_value_t = 300)]
    approval_ttl_secs: u64,

    /// Append-only JSONL audit log path
    #[arg(long, default_value = "sentinel-audit.jsonl")]
    audit_log: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let constitution = load_constitution(&args.constitution)
        .with_context(|| format!("failed to load constitution {}", args.constitution.display()))?;
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let policy = Policy::from_constitution(&constitution, home.as_deref());
    info!(
        lockdown = policy.lockdown_mode,
        blocked_strings = policy.blocked_strings.len(),
        blocked_tools = policy.blocked_tools.len(),
        "policy loaded"
    );

    let sink = JsonlAuditSink::open(&args.audit_log)
        .with_context(|| format!("failed to open audit log {}", args.audit_log.display()))?;
    let log = AuditLog::new(Arc::new(sink));

    let queue = Arc::new(ApprovalQueue::new(Duration::from_secs(args.approval_ttl_secs)));

    let semantic = build_semantic(&args);
    let degraded = semantic.is_none();
    if degraded {
        warn!("no Gemini API key configured: starting degraded, semantic stage fails closed");
    }

    let mut runtime = AuditRuntime::new(
        Arc::new(PolicyHandle::new(policy)),
        Arc::clone(&queue),
        log,
    )
    .with_semantic_timeout(Duration::from_secs(args.semantic_timeout_secs));
    if let Some(semantic) = semantic {
        runtime = runtime.with_semantic(semantic);
    }
    let runtime = Arc::new(runtime);

    let state = AppState {
        runtime: Arc::clone(&runtime),
        queue: Arc::clone(&queue),
        executor: Executor::with_timeout_secs(args.exec_timeout_secs),
        auth: auth_mode(&args),
        degraded,
    };

    spawn_expiry_sweep(runtime, queue);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %args.listen, degraded, "sentinel listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn auth_mode(args: &Args) -> AuthMode {
    if args.disable_auth {
        warn!("auth disabled: every endpoint is open");
        return AuthMode::Disabled;
    }
    match args.auth_token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => AuthMode::Token(Arc::from(token)),
        _ => {
            warn!("auth enabled but no token configured: protected endpoints will answer 503");
            AuthMode::Unconfigured
        },
    }
}

fn build_semantic(args: &Args) -> Option<Arc<dyn SemanticAuditor>> {
    let key = args.gemini_api_key.as_deref()?.trim();
    if key.is_empty() {
        return None;
    }
    let config = SemanticConfig::new(key, args.gemini_model.clone())
        .timeout(Duration::from_secs(args.semantic_timeout_secs));
    Some(Arc::new(GeminiAuditor::new(config)))
}

/// Periodically expire stale requests; every expiry is a terminal decision
/// and gets its audit record here.
fn spawn_expiry_sweep(runtime: Arc<AuditRuntime>, queue: Arc<ApprovalQueue>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            for expired in queue.expire_stale() {
                runtime.record_resolution(&expired);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
}
