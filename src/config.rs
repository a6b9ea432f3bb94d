use std::time::Duration;

use crate::error::{QaError, QaResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub http_timeout: Duration,
    pub role: Option<String>,
    pub reviewer: String,
    pub sampling_seed: Option<u64>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> QaResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> QaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let api_base_url = var_or("QA_API_BASE_URL", "http://localhost:8000")
            .trim_end_matches('/')
            .to_string();
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(QaError::Config(format!(
                "Invalid QA_API_BASE_URL '{api_base_url}': expected an http(s) URL"
            )));
        }

        let api_token = lookup("QA_API_TOKEN").filter(|v| !v.trim().is_empty());

        let timeout_secs: u64 = var_or("QA_HTTP_TIMEOUT_SECS", "30")
            .parse()
            .map_err(|e| QaError::Config(format!("Invalid QA_HTTP_TIMEOUT_SECS: {e}")))?;

        let role = lookup("QA_ROLE").filter(|v| !v.trim().is_empty());
        let reviewer = var_or("QA_REVIEWER", "IQA reviewer");

        let sampling_seed = match lookup("QA_SAMPLING_SEED").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|e| QaError::Config(format!("Invalid QA_SAMPLING_SEED: {e}")))?,
            ),
            None => None,
        };

        let log_level = var_or("QA_LOG_LEVEL", "info");

        Ok(Config {
            api_base_url,
            api_token,
            http_timeout: Duration::from_secs(timeout_secs.max(1)),
            role,
            reviewer,
            sampling_seed,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert!(config.api_token.is_none());
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.role.is_none());
        assert_eq!(config.reviewer, "IQA reviewer");
        assert!(config.sampling_seed.is_none());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn trailing_slash_is_trimmed_and_seed_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("QA_API_BASE_URL", "https://qa.example.org/"),
            ("QA_SAMPLING_SEED", "42"),
            ("QA_ROLE", "IQA_LEAD"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://qa.example.org");
        assert_eq!(config.sampling_seed, Some(42));
        assert_eq!(config.role.as_deref(), Some("IQA_LEAD"));
    }

    #[test]
    fn rejects_invalid_timeout() {
        let err = Config::from_lookup(lookup_from(&[("QA_HTTP_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, QaError::Config(_)));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err =
            Config::from_lookup(lookup_from(&[("QA_API_BASE_URL", "ftp://qa")])).unwrap_err();
        assert!(err.to_string().contains("QA_API_BASE_URL"));
    }
}
