// src/lib.rs

pub mod backoff;
pub mod cli;
pub mod config;
pub mod controller;
pub mod errors;
pub mod filter;
pub mod logging;
pub mod mirror;
pub mod notifier;
pub mod object;
pub mod queue;
pub mod source;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_from_path, resolve_manifest_dir};
use crate::controller::{Controller, Factory};
use crate::notifier::{ChannelNotifier, Notification, Notifier};
use crate::source::ManifestDirSource;

const NOTIFICATION_BUFFER: usize = 256;
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - one manifest-directory source and one controller per watched kind
/// - the stdout sink draining the notification channel
/// - Ctrl-C handling, or exit-when-idle in `--dump-only` mode
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config_path();
    let mut raw = load_from_path(&config_path)?;
    args.apply_overrides(&mut raw);
    let cfg = ConfigFile::try_from(raw)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let root = resolve_manifest_dir(&config_path, &cfg.source.manifest_dir);
    let factory = Factory::new(cfg.factory_settings());

    let (notifier, rx) = ChannelNotifier::new(NOTIFICATION_BUFFER);
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);
    let sink = tokio::spawn(print_notifications(rx));

    let mut controllers = Vec::new();
    for kind in cfg.watched_kinds() {
        let source = ManifestDirSource::new(&root, kind, &cfg.source.include)?;
        tokio::fs::create_dir_all(source.dir()).await?;
        info!(kind, dir = %source.dir().display(), "mirroring kind");

        let controller = factory.new_controller(Arc::new(source), Arc::clone(&notifier), kind);
        controller.start();
        controllers.push(controller);
    }
    drop(notifier);

    if args.dump_only {
        tokio::select! {
            _ = wait_until_idle(&controllers) => info!("initial dump complete"),
            _ = tokio::signal::ctrl_c() => info!("interrupted"),
        }
    } else if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C; shutting down");
    } else {
        info!("shutdown requested");
    }

    for controller in &controllers {
        controller.stop().await;
    }
    // Last senders live in the controllers.
    drop(controllers);

    sink.await?;
    Ok(())
}

async fn wait_until_idle(controllers: &[Controller]) {
    let mut tick = tokio::time::interval(IDLE_POLL_INTERVAL);
    loop {
        tick.tick().await;
        if controllers.iter().all(Controller::is_idle) {
            return;
        }
    }
}

async fn print_notifications(mut rx: mpsc::Receiver<Notification>) {
    let mut emitted = 0usize;
    while let Some(notification) = rx.recv().await {
        let text = notification.render();
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
            warn!(key = %notification.key, error = %e, "failed to write notification");
        }
        emitted += 1;
    }
    debug!(emitted, "notification sink closed");
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("resmirror dry-run");
    println!("  source.manifest_dir = {}", cfg.source.manifest_dir.display());
    println!("  source.include = {:?}", cfg.source.include);
    if cfg.source.namespace.is_empty() {
        println!("  source.namespace = (all)");
    } else {
        println!("  source.namespace = {}", cfg.source.namespace);
    }
    println!("  sync.resync_interval = {}s", cfg.sync.resync_interval);
    println!("  sync.unabridged = {}", cfg.sync.unabridged);
    println!();

    let selector = cfg.selector();
    if selector.is_empty() {
        println!("selector: (everything)");
    } else {
        println!("selector: {selector}");
    }

    let exclusions = cfg.exclusions();
    println!("exclusions:");
    for pattern in exclusions.namespace_patterns() {
        println!("  namespace: {}", pattern.as_str());
    }
    for kind in exclusions.kinds() {
        println!("  kind: {kind}");
    }
    let mut keys: Vec<_> = exclusions.exact_keys().iter().collect();
    keys.sort();
    for key in keys {
        println!("  object: {key}");
    }
    if exclusions.exclude_if_has_owner_ref() {
        println!("  objects having owner references");
    }
    println!();

    let kinds = cfg.watched_kinds();
    println!("kinds ({}):", kinds.len());
    for kind in kinds {
        println!("  - {kind}");
    }

    debug!("dry-run complete (nothing mirrored)");
}
