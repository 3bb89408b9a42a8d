//! Compact timestamped logging for the CLI and daemon.
//!
//! The default filter follows the `--quiet`/`--verbose` flags; the
//! `RUST_LOG` environment variable takes precedence when set:
//!
//! ```bash
//! RUST_LOG=debug confb run
//! RUST_LOG=confb::daemon=trace confb run
//! ```

use std::sync::Once;

use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize logging once. `quiet` drops to warnings only, `verbose` raises
/// to debug; the default is info. All output goes to stderr so it never
/// mixes with piped command output.
pub fn init(quiet: bool, verbose: bool) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Log an event with target context.
///
/// # Examples
/// ```ignore
/// log_event!("web-cfg", "wrote", "{}", path.display());
/// log_event!("daemon", "reload complete");
/// ```
#[macro_export]
macro_rules! log_event {
    ($target:expr, $event:expr) => {
        tracing::info!("[{}] {}", $target, $event)
    };
    ($target:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $target, $event, format!($($arg)*))
    };
}

/// Debug-only event logging.
///
/// # Examples
/// ```ignore
/// debug_event!("web-cfg", "unchanged", "sha={}", hash);
/// ```
#[macro_export]
macro_rules! debug_event {
    ($target:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $target, $event)
    };
    ($target:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $target, $event, format!($($arg)*))
    };
}
