use std::{
    fs,
    path::{Path, PathBuf},
};

use advisor_core::AdvisorConfig;
use advisor_oracle::{OracleConfig, OracleNode};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConfigFormat {
    Auto,
    Toml,
    Yaml,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format:?} config: {details}")]
    Parse {
        format: ConfigFormat,
        details: String,
    },
    #[error("configuration invalid: {0}")]
    Validation(String),
}

/// Relayer configuration file.
///
/// `advisor.oracle.signers` may be left empty, in which case the advisor
/// trusts exactly the signer set derived from the `[oracle]` section.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub relayer: RelayerSection,
    pub oracle: OracleConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub profiles: Vec<ProfileInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerSection {
    /// Identity presented to the advisor's access policy.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_callback_timeout_ms")]
    pub callback_timeout_ms: u64,
    /// Bound on both the oracle job queue and the callback queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Run the reveal cycle after recommendations are generated.
    #[serde(default = "default_reveal")]
    pub reveal: bool,
}

impl Default for RelayerSection {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            callback_timeout_ms: default_callback_timeout_ms(),
            queue_capacity: default_queue_capacity(),
            reveal: default_reveal(),
        }
    }
}

fn default_client_id() -> String {
    "advisor-relayer".into()
}

const fn default_callback_timeout_ms() -> u64 {
    5_000
}

const fn default_queue_capacity() -> usize {
    64
}

const fn default_reveal() -> bool {
    true
}

/// Plaintext attributes the relayer encrypts before submission.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileInput {
    pub label: String,
    pub income: u32,
    pub assets: u32,
    pub risk_tolerance: u32,
    pub goals: u32,
}

impl ProfileInput {
    pub fn new(label: &str, income: u32, assets: u32, risk_tolerance: u32, goals: u32) -> Self {
        Self {
            label: label.to_owned(),
            income,
            assets,
            risk_tolerance,
            goals,
        }
    }

    pub fn values(&self) -> [u32; 4] {
        [self.income, self.assets, self.risk_tolerance, self.goals]
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relayer.callback_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "callback timeout must be greater than zero".into(),
            ));
        }
        if self.relayer.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "queue capacity must be greater than zero".into(),
            ));
        }
        if self.profiles.is_empty() {
            return Err(ConfigError::Validation(
                "at least one profile must be configured".into(),
            ));
        }
        // Every request of a cycle is queued before the first callback is read.
        if self.profiles.len() > self.relayer.queue_capacity {
            return Err(ConfigError::Validation(format!(
                "{} profiles exceed queue capacity {}",
                self.profiles.len(),
                self.relayer.queue_capacity
            )));
        }
        self.effective_advisor()?;
        Ok(())
    }

    /// Advisor settings with the trust section filled in from the oracle
    /// node when none was configured.
    pub fn effective_advisor(&self) -> Result<AdvisorConfig, ConfigError> {
        let mut advisor = self.advisor.clone();
        if advisor.oracle.signers.is_empty() {
            let node = OracleNode::from_config(&self.oracle)
                .map_err(|err| ConfigError::Validation(err.to_string()))?;
            advisor.oracle = node.trust_config();
        }
        advisor
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        Ok(advisor)
    }

    pub fn sample() -> Self {
        Self {
            relayer: RelayerSection::default(),
            oracle: OracleConfig::sample("coprocessor-a"),
            advisor: AdvisorConfig::default(),
            profiles: vec![
                ProfileInput::new("growth", 50_000, 600_000, 80, 1),
                ProfileInput::new("income", 150_000, 10_000, 10, 2),
                ProfileInput::new("starter", 10_000, 1_000, 5, 0),
            ],
        }
    }
}

pub fn load_config(path: &Path, format: ConfigFormat) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&contents, resolve_format(path, format))?;
    config.validate()?;
    Ok(config)
}

pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    match format {
        ConfigFormat::Toml | ConfigFormat::Auto => {
            toml::from_str(contents).map_err(|err| ConfigError::Parse {
                format: ConfigFormat::Toml,
                details: err.to_string(),
            })
        }
        ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
    }
}

fn resolve_format(path: &Path, format: ConfigFormat) -> ConfigFormat {
    match format {
        ConfigFormat::Auto => match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => ConfigFormat::Toml,
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        },
        _ => format,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const TOML: &str = r#"
[relayer]
client-id = "desk-7"
callback-timeout-ms = 250

[oracle]
node-id = "coprocessor-a"
secret-seed = "2222222222222222222222222222222222222222222222222222222222222222"

[advisor.requests]
pending-ttl-ms = 60000

[[profiles]]
label = "growth"
income = 50000
assets = 600000
risk-tolerance = 80
goals = 1
"#;

    const YAML: &str = r#"
oracle:
  node-id: coprocessor-a
  secret-seed: "2222222222222222222222222222222222222222222222222222222222222222"
  threshold: 3
profiles:
  - label: starter
    income: 10000
    assets: 1000
    risk-tolerance: 5
    goals: 0
"#;

    #[test]
    fn sample_config_is_valid() {
        Config::sample().validate().unwrap();
    }

    #[test]
    fn parses_toml_with_defaults() {
        let config = parse_config(TOML, ConfigFormat::Toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.relayer.client_id, "desk-7");
        assert_eq!(config.relayer.queue_capacity, 64);
        assert!(config.relayer.reveal);
        assert_eq!(config.advisor.requests.pending_ttl_ms, Some(60_000));
        assert_eq!(config.oracle.signer_count, 3);
        assert_eq!(
            config.profiles,
            vec![ProfileInput::new("growth", 50_000, 600_000, 80, 1)]
        );
    }

    #[test]
    fn parses_yaml_and_derives_trust() {
        let config = parse_config(YAML, ConfigFormat::Yaml).unwrap();
        let advisor = config.effective_advisor().unwrap();
        assert_eq!(advisor.oracle.signers.len(), 3);
        assert_eq!(advisor.oracle.threshold, 3);
    }

    #[test]
    fn resolves_format_from_extension() {
        assert_eq!(
            resolve_format(Path::new("a.yml"), ConfigFormat::Auto),
            ConfigFormat::Yaml
        );
        assert_eq!(
            resolve_format(Path::new("a.conf"), ConfigFormat::Auto),
            ConfigFormat::Toml
        );
        assert_eq!(
            resolve_format(Path::new("a.toml"), ConfigFormat::Yaml),
            ConfigFormat::Yaml
        );
    }

    #[test]
    fn rejects_invalid_sections() {
        let mut config = Config::sample();
        config.profiles.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::sample();
        config.oracle.threshold = 9;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::sample();
        config.advisor.oracle.signers = vec!["not-hex".into()];
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn reports_parse_errors_with_format() {
        assert!(matches!(
            parse_config("profiles = 3", ConfigFormat::Auto),
            Err(ConfigError::Parse {
                format: ConfigFormat::Toml,
                ..
            })
        ));
    }
}
