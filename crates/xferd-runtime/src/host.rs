//! Local host name resolution.

use xferd_core::ports::{ConfigPort, keys};

const FALLBACK_HOST: &str = "localhost";

/// Host name used in error reports and results.
///
/// A configured override wins; otherwise the OS host name, falling back
/// to a fixed default when even that is unavailable.
pub fn host_name(config: &dyn ConfigPort) -> String {
    config.get(keys::HOSTNAME).unwrap_or_else(os_host_name)
}

#[cfg(unix)]
fn os_host_name() -> String {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| FALLBACK_HOST.to_string())
}

#[cfg(not(unix))]
fn os_host_name() -> String {
    FALLBACK_HOST.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xferd_core::ports::MapConfig;

    #[test]
    fn configured_override_wins() {
        let config = MapConfig::new().with(keys::HOSTNAME, "node01.example.org");
        assert_eq!(host_name(&config), "node01.example.org");
    }

    #[test]
    fn fallback_is_never_empty() {
        let config = MapConfig::new();
        assert!(!host_name(&config).is_empty());
    }
}
