use std::{collections::HashMap, future::Future, io, time::Duration};

use apcaccess::{APCAccess, APCAccessConfig};
use log::debug;
use thiserror::Error;
use tokio::task::{spawn_blocking, JoinError};

use crate::{config::ApcupsdOptions, field::Field};

/// The recognized fields of one apcupsd status response, with their raw text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusRecord {
	values: HashMap<Field, String>,
}

impl StatusRecord {
	/// Keeps the keys that name a known field and drops the rest.
	pub fn from_raw(raw: HashMap<String, String>) -> Self {
		let mut values = HashMap::new();
		let mut unknown = Vec::new();
		for (key, value) in raw {
			match Field::from_key(&key) {
				Some(field) => {
					values.insert(field, value);
				},
				None => unknown.push(key),
			}
		}
		if !unknown.is_empty() {
			unknown.sort();
			debug!("Ignoring unknown keys: {unknown:?}");
		}
		Self { values }
	}

	pub fn get(&self, field: Field) -> Option<&str> {
		self.values.get(&field).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

#[derive(Error, Debug)]
pub enum TransportError {
	#[error("error fetching data from apcupsd: {0}")]
	Io(io::ErrorKind),
	#[error("apcupsd fetch task did not complete: {0}")]
	Interrupted(#[from] JoinError),
}

/// Something that can be asked for the current UPS status.
pub trait StatusSource: Send + Sync {
	fn fetch(&self) -> impl Future<Output = Result<StatusRecord, TransportError>> + Send;
}

/// Queries apcupsd over its network information server port.
pub struct ApcupsdSource {
	apc_access: APCAccess,
}

impl ApcupsdSource {
	pub fn new(options: &ApcupsdOptions) -> Self {
		Self {
			apc_access: APCAccess::new(Some(APCAccessConfig {
				host: options.address.clone(),
				port: options.port,
				timeout: Duration::from_millis(options.timeout_ms),
				..Default::default()
			})),
		}
	}
}

impl StatusSource for ApcupsdSource {
	async fn fetch(&self) -> Result<StatusRecord, TransportError> {
		let apc_access = self.apc_access.clone();
		let raw = spawn_blocking(move || apc_access.fetch().map_err(|e| e.kind())).await?.map_err(TransportError::Io)?;
		Ok(StatusRecord::from_raw(raw))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::field::{CategoricalField, NumericField};

	#[test]
	fn keeps_only_known_keys() {
		let record = StatusRecord::from_raw(HashMap::from([
			("STATUS".to_string(), "ONLINE".to_string()),
			("LINEV".to_string(), "232.0 Volts".to_string()),
			("STATFLAG".to_string(), "0x05000008".to_string()),
			("END APC".to_string(), "2024-03-12 21:32:50 +0300".to_string()),
		]));
		assert_eq!(record.len(), 2);
		assert_eq!(record.get(Field::Categorical(CategoricalField::Status)), Some("ONLINE"));
		assert_eq!(record.get(Field::Numeric(NumericField::LineVoltage)), Some("232.0 Volts"));
		assert_eq!(record.get(Field::Numeric(NumericField::BatteryCharge)), None);
	}

	#[tokio::test]
	async fn unreachable_daemon_is_a_transport_error() {
		let source = ApcupsdSource::new(&ApcupsdOptions {
			address: "127.0.0.1".into(),
			port: 1,
			timeout_ms: 200,
		});
		assert!(matches!(source.fetch().await, Err(TransportError::Io(_))));
	}
}
