use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// `RUST_LOG` wins when set, otherwise the configured level applies.
pub fn init(level: &str) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter(level).into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Accepts tracing level names and the Python-style `WARNING`, `CRITICAL`
/// and `FATAL`, case-insensitively. Anything else is `info`.
pub fn level_filter(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "warn" | "warning" => LevelFilter::WARN,
        "error" | "critical" | "fatal" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_level_names_map_to_tracing_levels() {
        assert_eq!(level_filter("INFO"), LevelFilter::INFO);
        assert_eq!(level_filter("warning"), LevelFilter::WARN);
        assert_eq!(level_filter("WARNING"), LevelFilter::WARN);
        assert_eq!(level_filter("CRITICAL"), LevelFilter::ERROR);
        assert_eq!(level_filter("debug"), LevelFilter::DEBUG);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(level_filter("garbage"), LevelFilter::INFO);
        assert_eq!(level_filter(""), LevelFilter::INFO);
    }

    #[test]
    fn error_events_survive_critical_level() {
        let filter = EnvFilter::builder()
            .with_default_directive(level_filter("CRITICAL").into())
            .parse_lossy("");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }
}
