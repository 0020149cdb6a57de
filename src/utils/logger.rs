use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crate logs at `info` (or `debug`), everything else from `warn` up so
/// transport problems in reqwest / hyper still show.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "vitibrasil_etl=debug,info"
    } else {
        "vitibrasil_etl=info,warn"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// 結構化輸出，給排程或容器環境收集日誌用
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(env_filter(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .json(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_keep_dependency_warnings() {
        let quiet = default_directives(false);
        assert!(quiet.split(',').any(|d| d == "warn"));
        assert!(quiet.contains("vitibrasil_etl=info"));
        assert!(default_directives(true).contains("vitibrasil_etl=debug"));
    }

    #[test]
    fn test_default_directives_parse() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_directives(verbose)).is_ok());
        }
    }
}
