//! Service configuration, read from `CLINICALSETU_*` environment variables.
//!
//! Every value has a default; an unparsable value is logged and replaced by
//! its default rather than aborting startup.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::trials::MatchSettings;
use crate::pipeline::{PipelineSettings, MIN_RUN_TIMEOUT};

/// Application-level constants
pub const APP_NAME: &str = "ClinicalSetu";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "ClinicalSetu API";

pub const ENV_BIND_ADDR: &str = "CLINICALSETU_BIND_ADDR";
pub const ENV_OLLAMA_URL: &str = "CLINICALSETU_OLLAMA_URL";
pub const ENV_MODEL: &str = "CLINICALSETU_MODEL";
pub const ENV_TRIALS_PATH: &str = "CLINICALSETU_TRIALS_PATH";
pub const ENV_RUN_TIMEOUT_SECS: &str = "CLINICALSETU_RUN_TIMEOUT_SECS";
pub const ENV_STAGE_TIMEOUT_SECS: &str = "CLINICALSETU_STAGE_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "CLINICALSETU_MAX_RETRIES";
pub const ENV_MAX_TRIALS: &str = "CLINICALSETU_MAX_TRIALS";

pub const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3001);
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "medgemma";
pub const DEFAULT_TRIALS_PATH: &str = "data/clinical_trials.json";
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_MAX_TRIALS: usize = 5;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "clinicalsetu_lib=info,tower_http=info".to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub ollama_url: String,
    pub model: String,
    pub trials_path: PathBuf,
    pub run_timeout: Duration,
    pub stage_timeout: Duration,
    pub max_retries: u32,
    pub max_trials: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let bind_addr = parsed_or(ENV_BIND_ADDR, get(ENV_BIND_ADDR), DEFAULT_BIND_ADDR);

        let run_timeout_secs = parsed_or(ENV_RUN_TIMEOUT_SECS, get(ENV_RUN_TIMEOUT_SECS), DEFAULT_RUN_TIMEOUT_SECS);
        let run_timeout = Duration::from_secs(run_timeout_secs);
        if run_timeout < MIN_RUN_TIMEOUT {
            tracing::warn!(
                requested_secs = run_timeout_secs,
                minimum_secs = MIN_RUN_TIMEOUT.as_secs(),
                "Run timeout raised to minimum"
            );
        }

        Self {
            bind_addr,
            ollama_url: get(ENV_OLLAMA_URL).unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: get(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            trials_path: get(ENV_TRIALS_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TRIALS_PATH)),
            run_timeout: run_timeout.max(MIN_RUN_TIMEOUT),
            stage_timeout: Duration::from_secs(parsed_or(
                ENV_STAGE_TIMEOUT_SECS,
                get(ENV_STAGE_TIMEOUT_SECS),
                DEFAULT_STAGE_TIMEOUT_SECS,
            )),
            max_retries: parsed_or(ENV_MAX_RETRIES, get(ENV_MAX_RETRIES), DEFAULT_MAX_RETRIES),
            max_trials: parsed_or(ENV_MAX_TRIALS, get(ENV_MAX_TRIALS), DEFAULT_MAX_TRIALS),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            run_timeout: self.run_timeout,
            stage_timeout: self.stage_timeout,
            max_retries: self.max_retries,
            matching: MatchSettings {
                max_results: self.max_trials,
                ..MatchSettings::default()
            },
        }
        .with_run_timeout(self.run_timeout)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parsed_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Unparsable configuration value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3001");
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.trials_path, PathBuf::from(DEFAULT_TRIALS_PATH));
        assert_eq!(config.run_timeout, Duration::from_secs(120));
        assert_eq!(config.stage_timeout, Duration::from_secs(90));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_trials, 5);
    }

    #[test]
    fn values_are_read_from_source() {
        let config = config_from(&[
            (ENV_BIND_ADDR, "127.0.0.1:8080"),
            (ENV_MODEL, "medgemma:27b"),
            (ENV_MAX_TRIALS, "3"),
            (ENV_STAGE_TIMEOUT_SECS, "30"),
        ]);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.model, "medgemma:27b");
        assert_eq!(config.pipeline_settings().matching.max_results, 3);
        assert_eq!(config.pipeline_settings().stage_timeout, Duration::from_secs(30));
    }

    #[test]
    fn run_timeout_never_below_sixty_seconds() {
        let config = config_from(&[(ENV_RUN_TIMEOUT_SECS, "10")]);
        assert_eq!(config.run_timeout, MIN_RUN_TIMEOUT);
        assert_eq!(config.pipeline_settings().run_timeout, MIN_RUN_TIMEOUT);
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        let config = config_from(&[
            (ENV_MAX_RETRIES, "many"),
            (ENV_BIND_ADDR, "not-an-address"),
            (ENV_MODEL, "   "),
        ]);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn app_name_is_clinicalsetu() {
        assert_eq!(APP_NAME, "ClinicalSetu");
    }
}
