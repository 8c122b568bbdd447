//! Tracing setup shared by the service binaries

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::CommonArgs;

/// Default filter: the service and the auth core at `log_level`, everything else at info
pub fn default_filter(log_level: &str) -> String {
    let level = log_level.to_ascii_lowercase();
    format!("tollgate={level},tollgate_auth={level},info")
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(common: &CommonArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&common.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if common.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter("DEBUG"),
            "tollgate=debug,tollgate_auth=debug,info"
        );
        assert!(EnvFilter::try_new(default_filter("warn")).is_ok());
    }
}
