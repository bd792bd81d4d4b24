use crate::error::ConfigError;
use crate::schema::Config;

/// Apply `KORR_<KEY>` environment overrides on top of a loaded config.
/// Only scalar, frequently-tuned keys are overridable this way; the
/// `database`/`output_database`/`cluster` tables are file-only, reserving
/// env overrides for simple settings and leaving structured config to
/// the file.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    macro_rules! override_parsed {
        ($env_key:literal, $field:expr) => {
            if let Ok(raw) = std::env::var($env_key) {
                $field = raw.parse().map_err(|_| ConfigError::Validation {
                    key: $env_key.to_string(),
                    reason: format!("cannot parse {:?} for {}", raw, $env_key),
                })?;
            }
        };
    }

    override_parsed!("KORR_WEBSERV_PORT", config.webserv_port);
    override_parsed!(
        "KORR_CORRELATION_THRESHOLD_COEFFICIENT",
        config.correlation_threshold_coefficient
    );
    override_parsed!("KORR_ALERT_CORRELATION_WEIGHT", config.alert_correlation_weight);
    override_parsed!(
        "KORR_BAYESIAN_CORRELATION_INTERVAL",
        config.bayesian_correlation_interval
    );
    override_parsed!(
        "KORR_NEURAL_NETWORK_TRAINING_INTERVAL",
        config.neural_network_training_interval
    );

    if let Ok(banner) = std::env::var("KORR_WEBSERV_BANNER") {
        config.webserv_banner = banner;
    }
    if let Ok(alertfile) = std::env::var("KORR_ALERTFILE") {
        config.alertfile = alertfile.into();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_override_parses() {
        std::env::set_var("KORR_WEBSERV_PORT", "9999");
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg).unwrap();
        assert_eq!(cfg.webserv_port, 9999);
        std::env::remove_var("KORR_WEBSERV_PORT");
    }

    #[test]
    fn invalid_override_is_a_validation_error() {
        std::env::set_var("KORR_WEBSERV_PORT", "not-a-port");
        let mut cfg = Config::default();
        let err = apply_env_overrides(&mut cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        std::env::remove_var("KORR_WEBSERV_PORT");
    }
}
