use std::{
	collections::BTreeMap,
	fmt,
	sync::{Arc, Mutex, PoisonError},
};

use arc_swap::ArcSwap;

use crate::{
	field::{CategoricalField, Field, NumericField},
	parser::ParsedValue,
};

/// The single value a categorical field currently exposes.
#[derive(Clone, Debug, PartialEq)]
pub enum ActiveValue {
	Baseline,
	Reported(String),
}

impl ActiveValue {
	pub fn text(&self) -> &str {
		match self {
			ActiveValue::Baseline => CategoricalField::BASELINE,
			ActiveValue::Reported(text) => text,
		}
	}

	/// Sample value exposed alongside the label: 1 for reported data, 0 for the baseline.
	pub fn gauge(&self) -> f64 {
		match self {
			ActiveValue::Baseline => 0.,
			ActiveValue::Reported(_) => 1.,
		}
	}
}

static BASELINE: ActiveValue = ActiveValue::Baseline;

/// One complete set of metric values. Every field always has exactly one value.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryState {
	numeric: BTreeMap<NumericField, f64>,
	categorical: BTreeMap<CategoricalField, ActiveValue>,
}

impl RegistryState {
	pub fn baseline() -> Self {
		Self {
			numeric: NumericField::ALL.into_iter().map(|field| (field, 0.)).collect(),
			categorical: CategoricalField::ALL.into_iter().map(|field| (field, ActiveValue::Baseline)).collect(),
		}
	}

	pub fn reset(&mut self) {
		*self = Self::baseline();
	}

	pub fn set_numeric(&mut self, field: NumericField, value: f64) {
		self.numeric.insert(field, value);
	}

	/// Makes `value` the only exposed value of `field`, retiring the previous one.
	pub fn set_categorical(&mut self, field: CategoricalField, value: String) {
		let active = self.categorical.entry(field).or_insert(ActiveValue::Baseline);
		let next = ActiveValue::Reported(value);
		if *active != next {
			*active = next;
		}
	}

	pub fn set(&mut self, value: ParsedValue) {
		match value {
			ParsedValue::Numeric(field, value) => self.set_numeric(field, value),
			ParsedValue::Text(field, value) => self.set_categorical(field, value),
		}
	}

	pub fn numeric(&self, field: NumericField) -> f64 {
		self.numeric.get(&field).copied().unwrap_or(0.)
	}

	pub fn categorical(&self, field: CategoricalField) -> &ActiveValue {
		self.categorical.get(&field).unwrap_or(&BASELINE)
	}
}

impl fmt::Display for RegistryState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (index, field) in Field::all().enumerate() {
			if index > 0 {
				writeln!(f)?;
			}
			match field {
				Field::Categorical(categorical) => write!(f, "{field}: {}", self.categorical(categorical).text())?,
				Field::Numeric(numeric) => write!(f, "{field}: {}", self.numeric(numeric))?,
			}
		}
		Ok(())
	}
}

/// Process-wide holder of the current metric values.
///
/// Writers work on a private copy of the state and publish it with one pointer swap, so
/// [`MetricRegistry::snapshot`] always returns the result of a complete update. Updates are
/// serialized; readers never wait on them.
pub struct MetricRegistry {
	current: ArcSwap<RegistryState>,
	writer: Mutex<()>,
}

impl MetricRegistry {
	pub fn new() -> Self {
		Self {
			current: ArcSwap::from_pointee(RegistryState::baseline()),
			writer: Mutex::new(()),
		}
	}

	/// Applies `apply` to a copy of the current state and publishes the result.
	pub fn update<R>(&self, apply: impl FnOnce(&mut RegistryState) -> R) -> R {
		let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
		let mut next = (**self.current.load()).clone();
		let result = apply(&mut next);
		self.current.store(Arc::new(next));
		result
	}

	pub fn reset(&self) {
		self.update(RegistryState::reset)
	}

	pub fn set_numeric(&self, field: NumericField, value: f64) {
		self.update(|state| state.set_numeric(field, value))
	}

	pub fn set_categorical(&self, field: CategoricalField, value: impl Into<String>) {
		let value = value.into();
		self.update(|state| state.set_categorical(field, value))
	}

	pub fn snapshot(&self) -> Arc<RegistryState> {
		self.current.load_full()
	}
}

impl Default for MetricRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use std::{thread, time::Duration};

	use super::*;

	fn assert_baseline(state: &RegistryState) {
		for field in NumericField::ALL {
			assert_eq!(state.numeric(field), 0., "{field:?}");
		}
		for field in CategoricalField::ALL {
			assert_eq!(state.categorical(field), &ActiveValue::Baseline, "{field:?}");
			assert_eq!(state.categorical(field).text(), "UNKNOWN");
		}
	}

	#[test]
	fn starts_at_baseline() {
		assert_baseline(&MetricRegistry::new().snapshot());
	}

	#[test]
	fn reset_is_idempotent() {
		let registry = MetricRegistry::new();
		registry.set_numeric(NumericField::LineVoltage, 232.);
		registry.set_categorical(CategoricalField::Status, "ONLINE");
		registry.set_categorical(CategoricalField::AlarmDelay, "No alarm");
		for _ in 0..3 {
			registry.reset();
			assert_baseline(&registry.snapshot());
		}
	}

	#[test]
	fn categorical_field_exposes_only_latest_value() {
		let registry = MetricRegistry::new();
		registry.set_categorical(CategoricalField::Status, "ONLINE");
		registry.set_categorical(CategoricalField::Status, "ONBATT");
		let snapshot = registry.snapshot();
		assert_eq!(snapshot.categorical(CategoricalField::Status), &ActiveValue::Reported("ONBATT".into()));
		assert_eq!(snapshot.categorical(CategoricalField::Status).gauge(), 1.);
	}

	#[test]
	fn setting_the_same_value_keeps_it_active() {
		let mut state = RegistryState::baseline();
		state.set_categorical(CategoricalField::Hostname, "ups-host".into());
		state.set_categorical(CategoricalField::Hostname, "ups-host".into());
		assert_eq!(state.categorical(CategoricalField::Hostname), &ActiveValue::Reported("ups-host".into()));
	}

	#[test]
	fn reported_baseline_text_is_still_reported() {
		let mut state = RegistryState::baseline();
		state.set_categorical(CategoricalField::Hostname, CategoricalField::BASELINE.into());
		let active = state.categorical(CategoricalField::Hostname);
		assert_eq!(active, &ActiveValue::Reported("UNKNOWN".into()));
		assert_eq!(active.gauge(), 1.);
	}

	#[test]
	fn snapshots_are_immutable() {
		let registry = MetricRegistry::new();
		registry.set_numeric(NumericField::BatteryCharge, 99.);
		let before = registry.snapshot();
		registry.reset();
		assert_eq!(before.numeric(NumericField::BatteryCharge), 99.);
		assert_eq!(registry.snapshot().numeric(NumericField::BatteryCharge), 0.);
	}

	#[test]
	fn snapshots_never_observe_a_partial_update() {
		let registry = MetricRegistry::new();
		let cycle = |state: &mut RegistryState, volts: f64, status: &str| {
			state.reset();
			state.set_numeric(NumericField::LineVoltage, volts);
			thread::sleep(Duration::from_millis(2));
			state.set_categorical(CategoricalField::Status, status.to_string());
		};
		thread::scope(|scope| {
			scope.spawn(|| {
				for i in 0..20 {
					if i % 2 == 0 {
						registry.update(|state| cycle(state, 230., "ONLINE"));
					} else {
						registry.update(|state| cycle(state, 0., "ONBATT"));
					}
				}
			});
			scope.spawn(|| {
				for _ in 0..500 {
					let snapshot = registry.snapshot();
					let observed = (snapshot.numeric(NumericField::LineVoltage), snapshot.categorical(CategoricalField::Status).text());
					assert!(
						[(0., "UNKNOWN"), (230., "ONLINE"), (0., "ONBATT")].contains(&observed),
						"mixed snapshot {observed:?}"
					);
					thread::sleep(Duration::from_micros(100));
				}
			});
		});
	}
}
