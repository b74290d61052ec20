use std::env;
use std::time::Duration;

use crate::health::DEFAULT_FAILURE_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThresholds {
    pub low_score: u8,
    pub critical_score: u8,
    pub consecutive_failures: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            low_score: 30,
            critical_score: 10,
            consecutive_failures: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_urls: Vec<String>,
    pub http_bind_addr: String,
    pub poll_interval: Duration,
    /// Per-call ceiling; slower calls count as failures.
    pub rpc_timeout: Duration,
    pub tx_sample_size: usize,
    pub thresholds: AlertThresholds,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing DA_RPC_URLS env var")]
    MissingRpcUrls,
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

impl Config {
    pub fn new(rpc_urls: Vec<String>) -> Self {
        Self {
            rpc_urls,
            http_bind_addr: "127.0.0.1:3001".to_string(),
            poll_interval: Duration::from_secs(10),
            rpc_timeout: Duration::from_millis(5000),
            tx_sample_size: 5,
            thresholds: AlertThresholds::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_urls = lookup("DA_RPC_URLS")
            .map(parse_rpc_urls)
            .filter(|urls| !urls.is_empty())
            .ok_or(ConfigError::MissingRpcUrls)?;

        let mut config = Self::new(rpc_urls);
        if let Some(bind) = lookup("HTTP_BIND") {
            config.http_bind_addr = bind;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "POLL_INTERVAL_SECS")? {
            config.poll_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "RPC_TIMEOUT_MS")? {
            config.rpc_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(n) = parse_var(&lookup, "TX_SAMPLE_SIZE")? {
            config.tx_sample_size = n;
        }
        if let Some(score) = parse_var(&lookup, "LOW_SCORE_THRESHOLD")? {
            config.thresholds.low_score = score;
        }
        if let Some(score) = parse_var(&lookup, "CRITICAL_SCORE_THRESHOLD")? {
            config.thresholds.critical_score = score;
        }
        if let Some(failures) = parse_var::<u32, _>(&lookup, "FAILURE_THRESHOLD")? {
            if failures == 0 {
                return Err(ConfigError::Invalid {
                    var: "FAILURE_THRESHOLD",
                    value: failures.to_string(),
                });
            }
            config.thresholds.consecutive_failures = failures;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

fn parse_rpc_urls(raw: String) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("DA_RPC_URLS", "http://a")])).unwrap();
        assert_eq!(config.rpc_urls, vec!["http://a"]);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.rpc_timeout, Duration::from_millis(5000));
        assert_eq!(config.tx_sample_size, 5);
        assert_eq!(config.thresholds, AlertThresholds::default());
    }

    #[test]
    fn rpc_urls_are_trimmed_and_deduplicated() {
        let config =
            Config::from_lookup(lookup(&[("DA_RPC_URLS", " http://a , ,http://b,http://a")]))
                .unwrap();
        assert_eq!(config.rpc_urls, vec!["http://a", "http://b"]);
    }

    #[test]
    fn missing_urls_is_an_error() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::MissingRpcUrls)
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("DA_RPC_URLS", " , ")])),
            Err(ConfigError::MissingRpcUrls)
        ));
    }

    #[test]
    fn overrides_and_invalid_numbers() {
        let config = Config::from_lookup(lookup(&[
            ("DA_RPC_URLS", "http://a"),
            ("POLL_INTERVAL_SECS", "2"),
            ("LOW_SCORE_THRESHOLD", "40"),
            ("FAILURE_THRESHOLD", "5"),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.thresholds.low_score, 40);
        assert_eq!(config.thresholds.consecutive_failures, 5);

        let err = Config::from_lookup(lookup(&[
            ("DA_RPC_URLS", "http://a"),
            ("RPC_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "RPC_TIMEOUT_MS", .. }));

        assert!(Config::from_lookup(lookup(&[
            ("DA_RPC_URLS", "http://a"),
            ("FAILURE_THRESHOLD", "0"),
        ]))
        .is_err());
    }
}
