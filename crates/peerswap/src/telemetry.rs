//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set. Otherwise the peerswap crates log at `info`
//! (`debug` when verbose) and everything else at `warn`.

use peerswap_types::{PeerswapError, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const CRATES: [&str; 5] = [
    "peerswap",
    "peerswap_types",
    "peerswap_codec",
    "peerswap_directory",
    "peerswap_settlement",
];

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    let directives: Vec<String> = CRATES.iter().map(|name| format!("{name}={level}")).collect();
    EnvFilter::new(format!("{},warn", directives.join(",")))
}

/// Install the global subscriber.
///
/// # Errors
/// `Configuration` if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));
    let installed = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init(),
    };
    installed.map_err(|e| PeerswapError::Configuration(format!("tracing: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_names_every_crate() {
        let rendered = default_filter(true).to_string();
        for name in CRATES {
            assert!(rendered.contains(&format!("{name}=debug")), "{rendered}");
        }
        assert!(default_filter(false).to_string().contains("peerswap_directory=info"));
    }

    #[test]
    fn second_init_is_an_error() {
        let _ = init_tracing(false, LogFormat::Pretty);
        assert!(init_tracing(false, LogFormat::Json).is_err());
    }
}
