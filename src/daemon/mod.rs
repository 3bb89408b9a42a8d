//! The watch daemon: initial build, event-debounced rebuilds, signals.
//!
//! One task owns every piece of mutable state — target states, the watcher,
//! the routing map, the debouncer. Filesystem events, debounce expiries, and
//! signals all arrive through a single `tokio::select!`, so rebuilds for
//! distinct targets interleave but never run in parallel, and a build+write
//! for one target is never re-entered.
//!
//! Per-target failures during a rebuild are logged and isolated: the
//! target's `last_hash` stays put and its previous output file is untouched.
//! A failed reload keeps the old configuration in effect.

mod debouncer;
mod hook;
pub mod pidfile;

pub use debouncer::Debouncer;
pub use hook::{run_on_change, HookError};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use crate::build::{build_target, BuildError};
use crate::config::{self, Config, ConfigError};
use crate::output::{write_atomic, WriteError};
use crate::plan::{self, Plan, PlanError};

/// How often pending debounce entries are polled.
const DEBOUNCE_TICK: Duration = Duration::from_millis(50);

/// Default quiet window before a rebuild.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Daemon options from the CLI.
#[derive(Debug, Clone)]
pub struct Options {
    pub debounce: Duration,
    /// Absolute path of the loaded configuration, re-read on SIGHUP.
    pub config_path: PathBuf,
}

/// Watch-mode state for one target, indexed in step with `config.targets`.
struct TargetState {
    plan: Plan,
    /// Hash of the last content written to the output file.
    last_hash: String,
    watch_dirs: HashSet<PathBuf>,
}

/// Fatal daemon errors. Everything recoverable is logged instead.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("initialize watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    #[error("create watch directory {}: {source}", path.display())]
    WatchDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("install signal handler: {0}")]
    Signal(std::io::Error),
}

type EventReceiver = mpsc::Receiver<notify::Result<notify::Event>>;
type RouteMap = HashMap<PathBuf, Vec<usize>>;

/// Build all targets once, then watch and rebuild until an exit signal.
pub async fn run(cfg: Config, opts: Options) -> Result<(), DaemonError> {
    let mut cfg = cfg;
    let mut states = build_states(&cfg)?;
    let (mut _watcher, mut event_rx, mut routes) = build_watcher(&states)?;
    let mut debouncer = Debouncer::new(opts.debounce);

    let mut sigint = signal(SignalKind::interrupt()).map_err(DaemonError::Signal)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(DaemonError::Signal)?;
    let mut sighup = signal(SignalKind::hangup()).map_err(DaemonError::Signal)?;

    crate::log_event!("daemon", "watching", "{} target(s)", states.len());

    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => match maybe_event {
                Some(Ok(event)) => route_event(&event, &routes, &mut debouncer),
                Some(Err(e)) => tracing::warn!("[daemon] watcher error: {e}"),
                None => {
                    tracing::warn!("[daemon] watch channel closed, exiting");
                    break;
                }
            },

            _ = tokio::time::sleep(DEBOUNCE_TICK) => {
                for idx in debouncer.take_ready() {
                    rebuild(&cfg, &mut states, idx);
                }
            }

            _ = sigint.recv() => {
                crate::log_event!("daemon", "received SIGINT, exiting");
                break;
            }

            _ = sigterm.recv() => {
                crate::log_event!("daemon", "received SIGTERM, exiting");
                break;
            }

            _ = sighup.recv() => {
                crate::log_event!("daemon", "received SIGHUP, reloading");
                debouncer.clear();
                match reload(&opts.config_path) {
                    Ok((new_cfg, new_states, new_watcher, new_rx, new_routes)) => {
                        cfg = new_cfg;
                        states = new_states;
                        _watcher = new_watcher;
                        event_rx = new_rx;
                        routes = new_routes;
                        crate::log_event!("daemon", "reload complete", "{} target(s)", states.len());
                    }
                    Err(e) => {
                        tracing::error!("[daemon] reload error: {e} (keeping old config)");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Initial phase: resolve, build, write, and hook every target, recording
/// its state for the event phase. Any failure here is fatal.
fn build_states(cfg: &Config) -> Result<Vec<TargetState>, DaemonError> {
    let mut states = Vec::with_capacity(cfg.targets.len());

    for target in &cfg.targets {
        let plan = plan::resolve(cfg, target, None)?;
        let built = build_target(target, &plan.files)?;
        write_atomic(&plan.output, &built.bytes)?;
        crate::log_event!(&target.name, "wrote", "{}", plan.output.display());

        if let Some(template) = &target.on_change {
            spawn_hook(&target.name, template, &plan.output);
        }

        let watch_dirs = plan::watch_dirs(cfg, target);
        for dir in &watch_dirs {
            tracing::debug!("[{}] watch dir {}", target.name, dir.display());
        }

        states.push(TargetState {
            plan,
            last_hash: built.hash,
            watch_dirs,
        });
    }
    Ok(states)
}

/// Register a watch on the union of all targets' watch directories and build
/// the directory-to-targets routing map. Missing directories are created.
fn build_watcher(
    states: &[TargetState],
) -> Result<(RecommendedWatcher, EventReceiver, RouteMap), DaemonError> {
    let (tx, rx) = mpsc::channel(100);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = tx.blocking_send(res);
    })?;

    let mut routes: RouteMap = HashMap::new();
    for (idx, state) in states.iter().enumerate() {
        for dir in &state.watch_dirs {
            routes.entry(dir.clone()).or_default().push(idx);
        }
    }

    for dir in routes.keys() {
        std::fs::create_dir_all(dir).map_err(|source| DaemonError::WatchDir {
            path: dir.clone(),
            source,
        })?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| DaemonError::Watch {
                path: dir.clone(),
                source,
            })?;
    }

    Ok((watcher, rx, routes))
}

/// Re-arm the debounce entry of every target watching the event's directory.
fn route_event(event: &notify::Event, routes: &RouteMap, debouncer: &mut Debouncer) {
    for path in &event.paths {
        let Some(dir) = path.parent() else { continue };
        let Some(indices) = routes.get(dir) else { continue };

        tracing::debug!(
            "[daemon] fs {:?} {} -> {} target(s)",
            event.kind,
            path.display(),
            indices.len()
        );
        for &idx in indices {
            debouncer.record(idx);
        }
    }
}

/// Debounce expiry: re-plan and rebuild one target, writing only when the
/// content hash moved. Errors are logged; the previous output file and
/// `last_hash` stay untouched.
fn rebuild(cfg: &Config, states: &mut [TargetState], idx: usize) {
    let Some(target) = cfg.targets.get(idx) else {
        return;
    };

    let plan = match plan::resolve(cfg, target, None) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::error!("[{}] plan error: {e}", target.name);
            return;
        }
    };

    let built = match build_target(target, &plan.files) {
        Ok(built) => built,
        Err(e) => {
            tracing::error!("[{}] build error: {e}", target.name);
            return;
        }
    };

    let state = &mut states[idx];
    if built.hash == state.last_hash {
        crate::debug_event!(&target.name, "unchanged", "sha={}", built.hash);
        return;
    }

    crate::log_event!(&target.name, "changed, rebuilding");
    if let Err(e) = write_atomic(&plan.output, &built.bytes) {
        tracing::error!("[{}] write error: {e}", target.name);
        return;
    }

    state.last_hash = built.hash;
    state.plan = plan;
    crate::log_event!(&target.name, "wrote", "{}", state.plan.output.display());

    if let Some(template) = &target.on_change {
        spawn_hook(&target.name, template, &state.plan.output);
    }
}

/// SIGHUP: load the configuration again and rebuild all daemon state. The
/// caller swaps everything in one step or keeps the old state on error.
fn reload(
    config_path: &Path,
) -> Result<(Config, Vec<TargetState>, RecommendedWatcher, EventReceiver, RouteMap), DaemonError> {
    tracing::info!("[daemon] reloading config from {}", config_path.display());
    let cfg = config::load(config_path)?;
    let states = build_states(&cfg)?;
    let (watcher, rx, routes) = build_watcher(&states)?;
    Ok((cfg, states, watcher, rx, routes))
}

/// Hooks are fire-and-forget; a rebuild never waits on one and concurrent
/// hook children are independent.
fn spawn_hook(name: &str, template: &str, output: &Path) {
    let name = name.to_string();
    let template = template.to_string();
    let output = output.to_path_buf();

    tokio::spawn(async move {
        if let Err(e) = hook::run_on_change(&name, &template, &output).await {
            tracing::warn!("[{name}] on_change error: {e}");
        }
    });
}
