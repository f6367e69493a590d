//! Logging configuration

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSettings;

/// Level used when neither a flag nor a config file sets one
const FALLBACK_LEVEL: &str = "warn";

/// Crates whose events follow `--log-level` when `RUST_LOG` is unset
const VEIL_TARGETS: &[&str] = &["veil", "veil_fhe", "veil_registry", "veil_storage"];

/// Build the filter: `RUST_LOG` wins, otherwise VEIL crates log at `level`
/// and dependencies stay at `warn`
pub fn filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec!["warn".to_string()];
    directives.extend(VEIL_TARGETS.iter().map(|t| format!("{}={}", t, level)));
    EnvFilter::try_new(directives.join(","))
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", level, e))
}

/// Pick the level and format: command-line flags first, then the
/// deployment's `[logging]` section
pub fn resolve(
    flag_level: Option<&str>,
    flag_json: bool,
    settings: Option<&LoggingSettings>,
) -> (String, bool) {
    let level = flag_level
        .or(settings.map(|s| s.level.as_str()))
        .unwrap_or(FALLBACK_LEVEL)
        .to_string();
    let json = flag_json || settings.map(LoggingSettings::json).unwrap_or(false);
    (level, json)
}

/// Initialize logging with the specified level
pub fn init(level: &str, json: bool) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::registry().with(filter(level)?);

    if json {
        subscriber
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(filter(level).is_ok(), "level {}", level);
        }
    }

    #[test]
    fn test_resolve_prefers_flags() {
        let settings = LoggingSettings {
            level: "debug".to_string(),
            format: "json".to_string(),
        };

        assert_eq!(resolve(None, false, None), ("warn".to_string(), false));
        assert_eq!(resolve(None, false, Some(&settings)), ("debug".to_string(), true));
        assert_eq!(
            resolve(Some("error"), false, Some(&settings)),
            ("error".to_string(), true)
        );
        assert_eq!(resolve(Some("info"), true, None), ("info".to_string(), true));
    }

    #[test]
    fn test_filter_rejects_garbage() {
        if std::env::var("RUST_LOG").is_err() {
            assert!(filter("=[").is_err());
        }
    }
}
