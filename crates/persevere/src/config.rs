//! Loading retry policies from TOML, JSON and environment variables.
//!
//! All sources deserialize into [`PolicyConfig`], whose fields mirror
//! [`RetryPolicy`] with durations in milliseconds. Every field is optional;
//! missing fields keep the [`RetryPolicy`] defaults.
//!
//! ```toml
//! max_attempts = 3
//! initial_delay_ms = 1000
//! backoff_multiplier = 2.0
//! per_attempt_timeout_ms = 5000
//! max_delay_ms = 60000
//! jitter = 0.0
//! ```

use crate::error::ConfigError;
use crate::retry::{BackoffStrategy, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Prefix for the environment variables read by [`PolicyConfig::from_env`].
pub const ENV_PREFIX: &str = "PERSEVERE_";

/// Raw, unvalidated retry configuration.
///
/// Integer fields are signed so that negative values in a config file are
/// reported as [`ConfigError`]s rather than parse failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Total attempts, including the first one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<i64>,

    /// Delay before the second attempt, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<i64>,

    /// Factor applied to the delay after each retry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_multiplier: Option<f64>,

    /// Per-attempt timeout, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_attempt_timeout_ms: Option<i64>,

    /// Cap on any single delay, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<i64>,

    /// Jitter fraction in `[0.0, 1.0]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<f64>,
}

impl PolicyConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Parse a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read a `.toml` or `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&std::fs::read_to_string(path)?),
            Some("json") => Self::from_json_str(&std::fs::read_to_string(path)?),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `PERSEVERE_MAX_ATTEMPTS`
    /// - `PERSEVERE_INITIAL_DELAY_MS`
    /// - `PERSEVERE_BACKOFF_MULTIPLIER`
    /// - `PERSEVERE_PER_ATTEMPT_TIMEOUT_MS`
    /// - `PERSEVERE_MAX_DELAY_MS`
    /// - `PERSEVERE_JITTER`
    ///
    /// Unset variables stay `None`; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_attempts: env_var("MAX_ATTEMPTS")?,
            initial_delay_ms: env_var("INITIAL_DELAY_MS")?,
            backoff_multiplier: env_var("BACKOFF_MULTIPLIER")?,
            per_attempt_timeout_ms: env_var("PER_ATTEMPT_TIMEOUT_MS")?,
            max_delay_ms: env_var("MAX_DELAY_MS")?,
            jitter: env_var("JITTER")?,
        })
    }

    /// Merge this configuration with another, with the other taking precedence.
    pub fn merge(self, other: PolicyConfig) -> Self {
        Self {
            max_attempts: other.max_attempts.or(self.max_attempts),
            initial_delay_ms: other.initial_delay_ms.or(self.initial_delay_ms),
            backoff_multiplier: other.backoff_multiplier.or(self.backoff_multiplier),
            per_attempt_timeout_ms: other.per_attempt_timeout_ms.or(self.per_attempt_timeout_ms),
            max_delay_ms: other.max_delay_ms.or(self.max_delay_ms),
            jitter: other.jitter.or(self.jitter),
        }
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate and convert into a [`RetryPolicy`].
    pub fn into_policy(self) -> Result<RetryPolicy, ConfigError> {
        let mut builder = RetryPolicy::builder();

        if let Some(max_attempts) = self.max_attempts {
            let max_attempts = u32::try_from(max_attempts)
                .ok()
                .filter(|attempts| *attempts >= 1)
                .ok_or(ConfigError::InvalidMaxAttempts(max_attempts))?;
            builder = builder.max_attempts(max_attempts);
        }
        if let Some(ms) = self.initial_delay_ms {
            builder = builder.initial_delay(millis("initial_delay_ms", ms)?);
        }
        if let Some(multiplier) = self.backoff_multiplier {
            builder = builder.backoff_multiplier(multiplier);
        }
        if let Some(ms) = self.per_attempt_timeout_ms {
            builder = builder.per_attempt_timeout(millis("per_attempt_timeout_ms", ms)?);
        }
        if let Some(ms) = self.max_delay_ms {
            builder = builder.max_delay(millis("max_delay_ms", ms)?);
        }
        if let Some(jitter) = self.jitter {
            // The builder clamps; a config file asking for more is a mistake.
            if !(0.0..=1.0).contains(&jitter) {
                return Err(ConfigError::InvalidJitter(jitter));
            }
            builder = builder.jitter(jitter);
        }

        let policy = builder.build();
        policy.validate()?;
        Ok(policy)
    }
}

impl TryFrom<PolicyConfig> for RetryPolicy {
    type Error = ConfigError;

    fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
        config.into_policy()
    }
}

/// Durations are rounded up to whole milliseconds, so a valid policy always
/// reloads as a valid policy.
impl From<&RetryPolicy> for PolicyConfig {
    fn from(policy: &RetryPolicy) -> Self {
        Self {
            max_attempts: Some(i64::from(policy.max_attempts())),
            initial_delay_ms: Some(duration_ms(policy.initial_delay())),
            backoff_multiplier: Some(policy.backoff_multiplier()),
            per_attempt_timeout_ms: policy.per_attempt_timeout().map(duration_ms),
            max_delay_ms: policy.max_delay().map(duration_ms),
            jitter: Some(policy.jitter()),
        }
    }
}

impl RetryPolicy {
    /// Load and validate a policy from a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        PolicyConfig::from_toml_str(raw)?.into_policy()
    }

    /// Load and validate a policy from a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        PolicyConfig::from_json_str(raw)?.into_policy()
    }

    /// Load and validate a policy from a `.toml` or `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        PolicyConfig::from_path(path)?.into_policy()
    }

    /// Load and validate a policy from `PERSEVERE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        PolicyConfig::from_env()?.into_policy()
    }
}

fn env_var<T: FromStr>(suffix: &str) -> Result<Option<T>, ConfigError> {
    let var = format!("{ENV_PREFIX}{suffix}");
    match std::env::var(&var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(ConfigError::InvalidEnv {
            var,
            value: raw.to_string_lossy().into_owned(),
        }),
    }
}

fn millis(field: &'static str, value_ms: i64) -> Result<Duration, ConfigError> {
    u64::try_from(value_ms)
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::NegativeDuration { field, value_ms })
}

// Rounds up so sub-millisecond durations never collapse to zero.
fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_toml_full_document() {
        let policy = RetryPolicy::from_toml_str(
            r#"
            max_attempts = 4
            initial_delay_ms = 10
            backoff_multiplier = 3.0
            per_attempt_timeout_ms = 50
            max_delay_ms = 500
            jitter = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.initial_delay(), Duration::from_millis(10));
        assert_eq!(policy.backoff_multiplier(), 3.0);
        assert_eq!(policy.per_attempt_timeout(), Some(Duration::from_millis(50)));
        assert_eq!(policy.max_delay(), Some(Duration::from_millis(500)));
        assert_eq!(policy.jitter(), 0.1);
    }

    #[test]
    fn test_empty_document_keeps_defaults() {
        assert_eq!(RetryPolicy::from_toml_str("").unwrap(), RetryPolicy::default());
        assert_eq!(RetryPolicy::from_json_str("{}").unwrap(), RetryPolicy::default());
    }

    #[test]
    fn test_json_document() {
        let policy =
            RetryPolicy::from_json_str(r#"{"max_attempts": 2, "per_attempt_timeout_ms": 50}"#)
                .unwrap();

        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(policy.per_attempt_timeout(), Some(Duration::from_millis(50)));
    }

    #[rstest]
    #[case("max_attempts = 0", ConfigError::InvalidMaxAttempts(0))]
    #[case("max_attempts = -2", ConfigError::InvalidMaxAttempts(-2))]
    #[case(
        "initial_delay_ms = -5",
        ConfigError::NegativeDuration { field: "initial_delay_ms", value_ms: -5 }
    )]
    #[case(
        "per_attempt_timeout_ms = -1",
        ConfigError::NegativeDuration { field: "per_attempt_timeout_ms", value_ms: -1 }
    )]
    #[case("per_attempt_timeout_ms = 0", ConfigError::ZeroTimeout)]
    #[case("jitter = 1.5", ConfigError::InvalidJitter(1.5))]
    #[case("backoff_multiplier = -2.0", ConfigError::InvalidMultiplier(-2.0))]
    fn test_invalid_values_rejected(#[case] raw: &str, #[case] expected: ConfigError) {
        assert_eq!(RetryPolicy::from_toml_str(raw), Err(expected));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = RetryPolicy::from_toml_str("max_retries = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(msg) if msg.contains("max_retries")));
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("retry.toml");
        std::fs::write(&toml_path, "max_attempts = 5\n").unwrap();
        assert_eq!(RetryPolicy::from_path(&toml_path).unwrap().max_attempts(), 5);

        let json_path = dir.path().join("retry.JSON");
        let mut file = std::fs::File::create(&json_path).unwrap();
        writeln!(file, r#"{{"max_attempts": 6}}"#).unwrap();
        assert_eq!(RetryPolicy::from_path(&json_path).unwrap().max_attempts(), 6);

        let yaml_path = dir.path().join("retry.yaml");
        assert!(matches!(
            RetryPolicy::from_path(&yaml_path),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            RetryPolicy::from_path(&missing),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_from_env_variables() {
        temp_env::with_vars(
            [
                ("PERSEVERE_MAX_ATTEMPTS", Some("7")),
                ("PERSEVERE_INITIAL_DELAY_MS", Some("25")),
                ("PERSEVERE_BACKOFF_MULTIPLIER", Some("1.5")),
                ("PERSEVERE_PER_ATTEMPT_TIMEOUT_MS", Some("300")),
                ("PERSEVERE_MAX_DELAY_MS", None),
                ("PERSEVERE_JITTER", None),
            ],
            || {
                let policy = RetryPolicy::from_env().unwrap();

                assert_eq!(policy.max_attempts(), 7);
                assert_eq!(policy.initial_delay(), Duration::from_millis(25));
                assert_eq!(policy.backoff_multiplier(), 1.5);
                assert_eq!(policy.per_attempt_timeout(), Some(Duration::from_millis(300)));
                assert_eq!(policy.max_delay(), None);
            },
        );
    }

    #[test]
    fn test_from_env_rejects_garbage() {
        temp_env::with_var("PERSEVERE_MAX_ATTEMPTS", Some("many"), || {
            assert_eq!(
                PolicyConfig::from_env(),
                Err(ConfigError::InvalidEnv {
                    var: "PERSEVERE_MAX_ATTEMPTS".to_string(),
                    value: "many".to_string(),
                })
            );
        });
    }

    #[cfg(unix)]
    #[test]
    fn test_from_env_rejects_non_unicode() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(&[b'3', 0x80]);
        temp_env::with_var("PERSEVERE_MAX_ATTEMPTS", Some(raw), || {
            assert!(matches!(
                PolicyConfig::from_env(),
                Err(ConfigError::InvalidEnv { var, .. }) if var == "PERSEVERE_MAX_ATTEMPTS"
            ));
        });
    }

    #[test]
    fn test_merge_prefers_other() {
        let file = PolicyConfig {
            max_attempts: Some(3),
            initial_delay_ms: Some(100),
            ..Default::default()
        };
        let env = PolicyConfig {
            max_attempts: Some(9),
            ..Default::default()
        };

        let merged = file.merge(env);
        assert_eq!(merged.max_attempts, Some(9));
        assert_eq!(merged.initial_delay_ms, Some(100));
    }

    #[test]
    fn test_policy_written_back_as_toml() {
        let policy = RetryPolicy::builder()
            .max_attempts(2)
            .initial_delay(Duration::from_millis(10))
            .per_attempt_timeout(Duration::from_millis(50))
            .build();

        let raw = PolicyConfig::from(&policy).to_toml_string().unwrap();
        assert!(raw.contains("per_attempt_timeout_ms = 50"));
        assert_eq!(RetryPolicy::from_toml_str(&raw).unwrap(), policy);
    }

    #[test]
    fn test_sub_millisecond_durations_round_up_when_written() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_micros(1500))
            .per_attempt_timeout(Duration::from_micros(500))
            .max_delay(Duration::from_micros(2500))
            .build();

        let config = PolicyConfig::from(&policy);
        assert_eq!(config.initial_delay_ms, Some(2));
        assert_eq!(config.per_attempt_timeout_ms, Some(1));
        assert_eq!(config.max_delay_ms, Some(3));

        let reloaded = RetryPolicy::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(reloaded.per_attempt_timeout(), Some(Duration::from_millis(1)));
        assert_eq!(reloaded.initial_delay(), Duration::from_millis(2));
    }
}
