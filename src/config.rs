use std::{
	fs, io,
	net::{IpAddr, SocketAddr},
	path::Path,
	time::Duration,
};

use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("could not read configuration: {0}")]
	Io(#[from] io::Error),
	#[error("invalid configuration: {0}")]
	Yaml(#[from] serde_yaml::Error),
	#[error("metrics_path must start with '/', got \"{0}\"")]
	InvalidMetricsPath(String),
	#[error("poll_interval_ms must be greater than 0")]
	InvalidPollInterval,
}

/// Where to reach apcupsd's network information server.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApcupsdOptions {
	pub address: String,
	pub port: u16,
	pub timeout_ms: u64,
}

impl Default for ApcupsdOptions {
	fn default() -> Self {
		Self {
			address: "127.0.0.1".into(),
			port: 3551,
			timeout_ms: 500,
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExporterOptions {
	pub listen_address: IpAddr,
	pub listen_port: u16,
	pub metrics_path: String,
	pub apcupsd: ApcupsdOptions,
	pub poll_interval_ms: u64,
}

impl Default for ExporterOptions {
	fn default() -> Self {
		Self {
			listen_address: [127, 0, 0, 1].into(),
			listen_port: 9175,
			metrics_path: "/metrics".into(),
			apcupsd: Default::default(),
			poll_interval_ms: 5000,
		}
	}
}

impl ExporterOptions {
	/// Reads the options from the YAML file at `path`, falling back to defaults when it does not exist.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		if fs::exists(path)? {
			Self::from_reader(fs::File::open(path)?)
		} else {
			info!("No configuration at {}, using defaults", path.display());
			Ok(Default::default())
		}
	}

	pub fn from_reader(reader: impl io::Read) -> Result<Self, ConfigError> {
		let options: Self = serde_ignored::deserialize(serde_yaml::Deserializer::from_reader(reader), |path| {
			warn!("Ignoring unknown configuration key {path}")
		})?;
		options.validate()
	}

	fn validate(self) -> Result<Self, ConfigError> {
		if !self.metrics_path.starts_with('/') {
			return Err(ConfigError::InvalidMetricsPath(self.metrics_path));
		}
		if self.poll_interval_ms == 0 {
			return Err(ConfigError::InvalidPollInterval);
		}
		Ok(self)
	}

	pub fn listen_addr(&self) -> SocketAddr {
		SocketAddr::new(self.listen_address, self.listen_port)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_file_uses_defaults() {
		let options = ExporterOptions::load(Path::new("/nonexistent/ups_exporter_config.yaml")).unwrap();
		assert_eq!(options, ExporterOptions::default());
		assert_eq!(options.listen_addr(), SocketAddr::from(([127, 0, 0, 1], 9175)));
		assert_eq!(options.poll_interval(), Duration::from_secs(5));
	}

	#[test]
	fn overrides_from_yaml() {
		let options = ExporterOptions::from_reader(
			"listen_address: 0.0.0.0\nlisten_port: 9162\nmetrics_path: /ups\napcupsd:\n  address: ups.lan\n  port: 3552\nunknown_key: 1\n".as_bytes(),
		)
		.unwrap();
		assert_eq!(options.listen_addr(), SocketAddr::from(([0, 0, 0, 0], 9162)));
		assert_eq!(options.metrics_path, "/ups");
		assert_eq!(
			options.apcupsd,
			ApcupsdOptions {
				address: "ups.lan".into(),
				port: 3552,
				timeout_ms: 500,
			}
		);
		assert_eq!(options.poll_interval_ms, 5000);
	}

	#[test]
	fn rejects_relative_metrics_path() {
		assert!(matches!(
			ExporterOptions::from_reader("metrics_path: metrics\n".as_bytes()),
			Err(ConfigError::InvalidMetricsPath(path)) if path == "metrics"
		));
	}

	#[test]
	fn rejects_zero_poll_interval() {
		assert!(matches!(ExporterOptions::from_reader("poll_interval_ms: 0\n".as_bytes()), Err(ConfigError::InvalidPollInterval)));
	}

	#[test]
	fn rejects_malformed_yaml() {
		assert!(matches!(ExporterOptions::from_reader("listen_port: not-a-port\n".as_bytes()), Err(ConfigError::Yaml(_))));
	}
}
