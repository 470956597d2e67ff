use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, ServiceConfig};

/// Energy reservoir simulator that tells training workloads when to wind down.
#[derive(Debug, Parser)]
#[command(name = "winddown-sim", version)]
pub struct Cli {
    /// Load service configuration from a TOML file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Use a built-in preset (in_cluster, local)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Override the listen address, e.g. 127.0.0.1:5001
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Override the capacity-factor series file
    #[arg(long, value_name = "PATH")]
    pub power_factors: Option<PathBuf>,

    /// Override the Prometheus base URL
    #[arg(long, value_name = "URL")]
    pub prometheus_url: Option<String>,

    /// Write the retained tick history as CSV on shutdown
    #[arg(long, value_name = "PATH")]
    pub telemetry_out: Option<PathBuf>,
}

impl Cli {
    /// Resolves the service configuration: `--config` file, else `--preset`,
    /// else the in-cluster default, with command-line overrides applied last.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be loaded or the preset is unknown.
    pub fn load_config(&self) -> Result<ServiceConfig, ConfigError> {
        let mut cfg = match (&self.config, &self.preset) {
            (Some(path), _) => ServiceConfig::from_toml_file(path)?,
            (None, Some(name)) => ServiceConfig::from_preset(name)?,
            (None, None) => ServiceConfig::default(),
        };

        if let Some(bind) = &self.bind {
            cfg.server.bind = bind.clone();
        }
        if let Some(path) = &self.power_factors {
            cfg.profile.power_factors_path = path.clone();
        }
        if let Some(url) = &self.prometheus_url {
            cfg.telemetry.prometheus_url = url.clone();
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("winddown-sim").chain(args.iter().copied()))
    }

    #[test]
    fn no_args_uses_in_cluster_defaults() {
        let cli = parse(&[]).expect("parse should succeed");
        let cfg = cli.load_config().expect("default config");
        assert_eq!(cfg.server.bind, "0.0.0.0:5001");
        assert!(cli.telemetry_out.is_none());
    }

    #[test]
    fn supports_preset_cli() {
        let cli = parse(&["--preset", "local"]).expect("parse should succeed");
        assert_eq!(cli.preset.as_deref(), Some("local"));
        let cfg = cli.load_config().expect("local preset");
        assert_eq!(cfg.telemetry.prometheus_url, "http://localhost:9090");
    }

    #[test]
    fn config_and_preset_are_mutually_exclusive() {
        assert!(parse(&["--config", "svc.toml", "--preset", "local"]).is_err());
    }

    #[test]
    fn overrides_apply_after_preset() {
        let cli = parse(&[
            "--preset",
            "local",
            "--bind",
            "127.0.0.1:9000",
            "--prometheus-url",
            "http://prom:9090",
            "--power-factors",
            "/tmp/pf.txt",
        ])
        .expect("parse should succeed");
        let cfg = cli.load_config().expect("local preset");
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.telemetry.prometheus_url, "http://prom:9090");
        assert_eq!(cfg.profile.power_factors_path, PathBuf::from("/tmp/pf.txt"));
    }

    #[test]
    fn unknown_preset_fails_on_load() {
        let cli = parse(&["--preset", "nowhere"]).expect("parse should succeed");
        assert!(cli.load_config().is_err());
    }
}
