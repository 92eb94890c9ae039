use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use streamcap_core::PolicyConfig;
use streamcap_probe::{HttpUploadConfig, ProbeConfig, SpeedtestCliConfig};

use crate::Args;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub token: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:32400".to_string(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub policy: PolicyConfig,
    pub probe: ProbeConfig,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProbeKind {
    Speedtest,
    Http,
}

impl AppConfig {
    /// Defaults, then the config file, then command line flags.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(args);
        config
            .policy
            .validate()
            .context("invalid policy configuration")?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file failed: {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("parse config file failed: {}", path.display()))
    }

    fn apply_overrides(&mut self, args: &Args) {
        if let Some(url) = &args.server_url {
            self.server.url = url.clone();
        }
        if let Some(token) = &args.token {
            self.server.token = token.clone();
        }
        if args.no_idle_skip {
            self.policy.skip_when_idle = false;
        }
        if let Some(path) = &args.log_file {
            self.log_file = Some(path.clone());
        }
        match (args.probe, &self.probe) {
            (Some(ProbeKind::Speedtest), ProbeConfig::Http(_)) => {
                self.probe = ProbeConfig::Speedtest(SpeedtestCliConfig::default());
            }
            (Some(ProbeKind::Http), ProbeConfig::Speedtest(_)) => {
                self.probe = ProbeConfig::Http(HttpUploadConfig::default());
            }
            _ => {}
        }
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(home) = env::var("HOME") {
        return PathBuf::from(home).join(".config").join("streamcap");
    }
    PathBuf::from(".streamcap")
}

pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn temp_config(name: &str, body: &str) -> PathBuf {
        let path = env::temp_dir().join(format!(
            "streamcap-{name}-{}.toml",
            std::process::id()
        ));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn example_config_parses_and_validates() {
        let config: AppConfig = toml::from_str(include_str!("../../../streamcap.example.toml"))
            .expect("example config must parse");
        config.policy.validate().unwrap();
        assert_eq!(config.server.url, "http://localhost:32400");
        assert_eq!(config.policy.quality_table.floor().capacity_kbps, 3_000);
        assert!(matches!(config.probe, ProbeConfig::Speedtest(_)));
    }

    #[test]
    fn flags_override_file_values() {
        let path = temp_config(
            "override",
            r#"
            [server]
            url = "http://media.lan:32400"
            token = "from-file"

            [probe]
            kind = "speedtest"
            "#,
        );
        let args = Args::try_parse_from([
            "streamcap",
            "--config",
            path.to_str().unwrap(),
            "--token",
            "from-flag",
            "--probe",
            "http",
            "--no-idle-skip",
        ])
        .unwrap();

        let config = AppConfig::resolve(&args).unwrap();

        assert_eq!(config.server.url, "http://media.lan:32400");
        assert_eq!(config.server.token, "from-flag");
        assert!(!config.policy.skip_when_idle);
        assert_eq!(config.probe, ProbeConfig::Http(HttpUploadConfig::default()));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn matching_probe_flag_keeps_file_settings() {
        let path = temp_config(
            "probe",
            r#"
            [probe]
            kind = "http"
            url = "http://speed.lan/up"
            "#,
        );
        let args = Args::try_parse_from([
            "streamcap",
            "--config",
            path.to_str().unwrap(),
            "--probe",
            "http",
        ])
        .unwrap();

        let config = AppConfig::resolve(&args).unwrap();

        let ProbeConfig::Http(http) = config.probe else {
            panic!("expected http probe");
        };
        assert_eq!(http.url, "http://speed.lan/up");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn invalid_policy_is_reported() {
        let path = temp_config(
            "invalid",
            r#"
            [policy.peak_window]
            start_hour = 22
            end_hour = 2
            "#,
        );
        let args =
            Args::try_parse_from(["streamcap", "--config", path.to_str().unwrap()]).unwrap();

        let err = AppConfig::resolve(&args).unwrap_err();

        assert!(format!("{err:#}").contains("crosses midnight"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let args =
            Args::try_parse_from(["streamcap", "--config", "/nonexistent/streamcap.toml"]).unwrap();
        let err = AppConfig::resolve(&args).unwrap_err();
        assert!(err.to_string().contains("read config file failed"));
    }
}
