use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::{
	sync::Mutex,
	time::{interval, MissedTickBehavior},
};

use crate::{
	field::Field,
	parser::{FieldParser, ParseError},
	registry::{MetricRegistry, RegistryState},
	source::{StatusRecord, StatusSource},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	Populated { fields_set: usize, fields_rejected: usize },
	/// The status could not be fetched; the registry was reset to baseline.
	SourceUnavailable,
	/// Another refresh was still running.
	Skipped,
}

/// One poll of the status source, applied to the registry as reset followed by populate.
///
/// Fields missing from the record or failing to parse are left at their baseline, so a value
/// the daemon stops reporting disappears instead of going stale.
pub struct RefreshCycle<S> {
	source: S,
	parser: FieldParser,
	registry: Arc<MetricRegistry>,
	in_flight: Mutex<()>,
}

impl<S: StatusSource> RefreshCycle<S> {
	pub fn new(source: S, parser: FieldParser, registry: Arc<MetricRegistry>) -> Self {
		Self {
			source,
			parser,
			registry,
			in_flight: Mutex::new(()),
		}
	}

	pub async fn run(&self) -> RefreshOutcome {
		let Ok(_in_flight) = self.in_flight.try_lock() else {
			debug!("Refresh already in progress, skipping");
			return RefreshOutcome::Skipped;
		};
		match self.source.fetch().await {
			Ok(record) => {
				let (fields_set, fields_rejected) = self.registry.update(|state| {
					state.reset();
					populate(&self.parser, state, &record)
				});
				debug!("Refreshed {fields_set} fields ({fields_rejected} rejected):\n{}", self.registry.snapshot());
				RefreshOutcome::Populated { fields_set, fields_rejected }
			},
			Err(e) => {
				warn!("{e}, resetting metrics to baseline");
				self.registry.reset();
				RefreshOutcome::SourceUnavailable
			},
		}
	}

	/// Refreshes every `period`. A tick that fires while a refresh is still running is dropped.
	pub async fn run_every(&self, period: Duration) {
		let mut ticker = interval(period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
		loop {
			ticker.tick().await;
			self.run().await;
		}
	}
}

/// Sets every field present in `record` that parses. Returns the number of fields set and rejected.
pub(crate) fn populate(parser: &FieldParser, state: &mut RegistryState, record: &StatusRecord) -> (usize, usize) {
	let (mut fields_set, mut fields_rejected) = (0, 0);
	for field in Field::all() {
		let Some(raw) = record.get(field) else {
			continue;
		};
		match parser.parse(field, raw) {
			Ok(value) => {
				state.set(value);
				fields_set += 1;
			},
			Err(ParseError::Empty) if matches!(field, Field::Categorical(_)) => debug!("{field} is empty, treating it as absent"),
			Err(e) => {
				warn!("{field}: {e}");
				fields_rejected += 1;
			},
		}
	}
	(fields_set, fields_rejected)
}
