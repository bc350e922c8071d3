//! Tracing initialisation for apirun binaries.
//!
//! Call [`init_tracing`] once at program start. Later calls are ignored,
//! since the global subscriber can only be set once per process.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Crates whose logs follow the requested level. Everything else is held
/// at `warn` so executor dependencies stay quiet.
const APIRUN_TARGETS: [&str; 3] = ["apirun_core", "apirun_runner", "apirun"];

/// Filter directives used when `RUST_LOG` is not set.
fn default_directives(level: Level) -> String {
    let mut directives = String::from("warn");
    for target in APIRUN_TARGETS {
        directives.push_str(&format!(",{}={}", target, level.as_str().to_lowercase()));
    }
    directives
}

/// Initialise the global tracing subscriber.
///
/// `level` applies to the apirun crates; `RUST_LOG` overrides it entirely.
/// With `json`, each line is a JSON object. Output goes to stderr so
/// stdout stays free for progress lines.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let layer = if json { layer.json().boxed() } else { layer.boxed() };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_level_to_apirun() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("apirun_core=debug"));
        assert!(directives.contains("apirun_runner=debug"));
        assert!(directives.contains(",apirun=debug"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::DEBUG);
    }
}
