use crate::config::Config;
use log::LevelFilter;
use simplelog::ConfigBuilder;

/// HTTP stack crates that log every request and connection. Hidden unless
/// the level is Trace, so poll and stream lifecycle messages stay readable.
const FILTERED_MODULES: &[&str] = &["hyper", "reqwest", "axum", "tower", "rustls", "h2"];

pub struct Logger {}

impl Logger {
    /// Initializes the global terminal logger at the configured level.
    pub fn init_logger(config: &Config) {
        let level = config.log_level_filter;

        simplelog::TermLogger::init(
            level,
            Self::build_log_config(level),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
        .expect("Failed to start simplelog");
    }

    /// Modules whose records are dropped at `level`.
    fn ignored_modules(level: LevelFilter) -> &'static [&'static str] {
        if level == LevelFilter::Trace {
            &[]
        } else {
            FILTERED_MODULES
        }
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        for module in Self::ignored_modules(level) {
            builder.add_filter_ignore_str(module);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_stack_is_hidden_below_trace() {
        for level in [LevelFilter::Info, LevelFilter::Debug] {
            let ignored = Logger::ignored_modules(level);
            assert!(ignored.contains(&"hyper"));
            assert!(ignored.contains(&"reqwest"));
            assert!(ignored.contains(&"axum"));
        }
    }

    #[test]
    fn test_trace_shows_everything() {
        assert!(Logger::ignored_modules(LevelFilter::Trace).is_empty());
    }

    #[test]
    fn test_workspace_crates_are_never_hidden() {
        let ignored = Logger::ignored_modules(LevelFilter::Info);
        for module in ["sse", "domain", "web", "service", "repo_pulse", "upstream"] {
            assert!(!ignored.contains(&module), "{module} should be logged");
        }
    }
}
