use crate::env::apply_env_overrides;
use crate::error::ConfigError;
use crate::schema::Config;
use std::path::{Path, PathBuf};

/// Load configuration: defaults < TOML file < environment overrides.
///
/// `path` is resolved in order: the argument, then `$KORR_CONFIG`, then
/// `./korrelator.toml`. A missing file at all three locations is not an
/// error — the defaults apply for every unset key.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let resolved = path
        .map(PathBuf::from)
        .or_else(|| std::env::var("KORR_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("korrelator.toml"));

    let mut config = if resolved.exists() {
        load_from_file(&resolved)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Validate cross-field invariants the TOML schema itself can't express:
/// cluster ranges must be non-inverted, and port/address classes must
/// stay within their namespace (spec.md §3's HierarchyNode invariant).
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    use crate::schema::ClusterClass;

    for node in &config.cluster {
        let (min, max) = node.range;
        if min > max {
            return Err(ConfigError::Validation {
                key: format!("cluster[{}].range", node.name),
                reason: format!("min ({min}) > max ({max})"),
            });
        }

        let namespace_max: u64 = match node.class {
            ClusterClass::SrcPort | ClusterClass::DstPort => u16::MAX as u64,
            ClusterClass::SrcIpv4 | ClusterClass::DstIpv4 => u32::MAX as u64,
        };

        if max > namespace_max {
            return Err(ConfigError::Validation {
                key: format!("cluster[{}].range", node.name),
                reason: format!("max ({max}) exceeds namespace bound ({namespace_max})"),
            });
        }
    }

    if config.correlation_threshold_coefficient < 0.0 {
        return Err(ConfigError::Validation {
            key: "correlation_threshold_coefficient".to_string(),
            reason: "must be non-negative".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ClusterClass, ClusterNodeSpec};

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_config(Some(Path::new("/nonexistent/korrelator.toml"))).unwrap();
        assert_eq!(cfg.webserv_port, Config::default().webserv_port);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("korrelator.toml");
        std::fs::write(&path, "webserv_port = 8080\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.webserv_port, 8080);
    }

    #[test]
    fn inverted_cluster_range_is_rejected() {
        let mut cfg = Config::default();
        cfg.cluster.push(ClusterNodeSpec {
            class: ClusterClass::SrcPort,
            name: "bad".to_string(),
            range: (100, 10),
        });
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn port_range_exceeding_namespace_is_rejected() {
        let mut cfg = Config::default();
        cfg.cluster.push(ClusterNodeSpec {
            class: ClusterClass::DstPort,
            name: "too-big".to_string(),
            range: (0, 100_000),
        });
        assert!(validate_config(&cfg).is_err());
    }
}
