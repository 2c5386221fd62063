//! The status keys reported by apcupsd that this exporter knows how to turn into metrics.

use std::fmt;

pub const NAMESPACE: &str = "ups";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subsystem {
	Power,
	Battery,
	Daemon,
}

impl Subsystem {
	fn as_str(self) -> &'static str {
		match self {
			Subsystem::Power => "power",
			Subsystem::Battery => "battery",
			Subsystem::Daemon => "daemon",
		}
	}
}

/// Unit apcupsd appends to a numeric value, and therefore the unit the parser expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
	Volts,
	Watts,
	Percent,
	Hertz,
	Seconds,
	Minutes,
	/// Bare number without a unit word.
	Count,
	/// Date and time, exported as seconds since the epoch.
	Timestamp,
}

impl Unit {
	/// Unit word as apcupsd prints it, `None` for bare values.
	pub fn word(self) -> Option<&'static str> {
		match self {
			Unit::Volts => Some("Volts"),
			Unit::Watts => Some("Watts"),
			Unit::Percent => Some("Percent"),
			Unit::Hertz => Some("Hz"),
			Unit::Seconds => Some("Seconds"),
			Unit::Minutes => Some("Minutes"),
			Unit::Count | Unit::Timestamp => None,
		}
	}
}

pub struct NumericDescriptor {
	pub key: &'static str,
	pub subsystem: Subsystem,
	pub name: &'static str,
	pub help: &'static str,
	pub unit: Unit,
	pub max: Option<f64>,
}

impl NumericDescriptor {
	fn new(key: &'static str, subsystem: Subsystem, name: &'static str, unit: Unit, help: &'static str) -> Self {
		Self {
			key,
			subsystem,
			name,
			help,
			unit,
			max: None,
		}
	}

	fn capped(self, max: f64) -> Self {
		Self { max: Some(max), ..self }
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericField {
	NominalInputVoltage,
	NominalPower,
	LineVoltage,
	LoadPercent,
	NominalBatteryVoltage,
	BatteryVoltage,
	TimeOnBattery,
	CumulativeTimeOnBattery,
	BatteryCharge,
	TimeLeft,
	MinimumBatteryCharge,
	MinimumTimeLeft,
	MaximumTime,
	TransferCount,
	StartTime,
	OutputVoltage,
	LineFrequency,
	TransferLowVoltage,
	TransferHighVoltage,
	UpdateTime,
}

impl NumericField {
	pub const ALL: [Self; 20] = [
		Self::NominalInputVoltage,
		Self::NominalPower,
		Self::LineVoltage,
		Self::LoadPercent,
		Self::NominalBatteryVoltage,
		Self::BatteryVoltage,
		Self::TimeOnBattery,
		Self::CumulativeTimeOnBattery,
		Self::BatteryCharge,
		Self::TimeLeft,
		Self::MinimumBatteryCharge,
		Self::MinimumTimeLeft,
		Self::MaximumTime,
		Self::TransferCount,
		Self::StartTime,
		Self::OutputVoltage,
		Self::LineFrequency,
		Self::TransferLowVoltage,
		Self::TransferHighVoltage,
		Self::UpdateTime,
	];

	pub fn descriptor(self) -> NumericDescriptor {
		use Subsystem::*;
		match self {
			Self::NominalInputVoltage => NumericDescriptor::new("NOMINV", Power, "input_expect_voltage", Unit::Volts, "Input voltage the UPS is configured to expect."),
			Self::NominalPower => NumericDescriptor::new("NOMPOWER", Power, "output_maximum_wattage", Unit::Watts, "Maximum power in watts the UPS is designed to supply."),
			Self::LineVoltage => NumericDescriptor::new("LINEV", Power, "line_voltage", Unit::Volts, "Current input line voltage."),
			Self::LoadPercent => NumericDescriptor::new("LOADPCT", Power, "load_percent", Unit::Percent, "Percentage of UPS load capacity used."),
			Self::NominalBatteryVoltage => NumericDescriptor::new("NOMBATTV", Battery, "output_expect_voltage", Unit::Volts, "Nominal battery voltage."),
			Self::BatteryVoltage => NumericDescriptor::new("BATTV", Battery, "output_actual_voltage", Unit::Volts, "Current battery voltage."),
			Self::TimeOnBattery => NumericDescriptor::new("TONBATT", Battery, "time_spent_latest_seconds", Unit::Seconds, "Seconds currently on battery, or 0."),
			Self::CumulativeTimeOnBattery => NumericDescriptor::new(
				"CUMONBATT",
				Battery,
				"time_spent_total_seconds",
				Unit::Seconds,
				"Cumulative seconds on battery since apcupsd startup.",
			),
			Self::BatteryCharge => NumericDescriptor::new("BCHARGE", Battery, "remaining_charge_percent", Unit::Percent, "Current battery capacity charge percentage.")
				.capped(100.),
			Self::TimeLeft => NumericDescriptor::new(
				"TIMELEFT",
				Battery,
				"remaining_time_minutes",
				Unit::Minutes,
				"Remaining runtime left on battery as estimated by the UPS, in minutes.",
			),
			Self::MinimumBatteryCharge => NumericDescriptor::new(
				"MBATTCHG",
				Daemon,
				"remaining_charge_percent",
				Unit::Percent,
				"Battery charge percentage below which apcupsd shuts the system down.",
			)
			.capped(100.),
			Self::MinimumTimeLeft => NumericDescriptor::new(
				"MINTIMEL",
				Daemon,
				"remaining_time_minutes",
				Unit::Minutes,
				"Remaining runtime in minutes at or below which apcupsd shuts the system down.",
			),
			Self::MaximumTime => NumericDescriptor::new(
				"MAXTIME",
				Daemon,
				"timeout_minutes",
				Unit::Minutes,
				"Minutes on battery after which apcupsd shuts the system down, 0 when disabled.",
			),
			Self::TransferCount => NumericDescriptor::new("NUMXFERS", Daemon, "transfer_count", Unit::Count, "Number of transfers to battery since apcupsd startup."),
			Self::StartTime => NumericDescriptor::new("STARTTIME", Daemon, "start_timestamp", Unit::Timestamp, "Date and time apcupsd was started."),
			Self::OutputVoltage => NumericDescriptor::new("OUTPUTV", Power, "output_voltage", Unit::Volts, "Current UPS output voltage."),
			Self::LineFrequency => NumericDescriptor::new("LINEFREQ", Power, "line_frequency_hertz", Unit::Hertz, "Current line frequency in Hertz."),
			Self::TransferLowVoltage => {
				NumericDescriptor::new("LOTRANS", Power, "transfer_low_voltage", Unit::Volts, "Input line voltage below which the UPS switches to battery.")
			},
			Self::TransferHighVoltage => {
				NumericDescriptor::new("HITRANS", Power, "transfer_high_voltage", Unit::Volts, "Input line voltage above which the UPS switches to battery.")
			},
			Self::UpdateTime => NumericDescriptor::new("DATE", Daemon, "update_timestamp", Unit::Timestamp, "Date and time of the last update from the UPS."),
		}
	}
}

pub struct CategoricalDescriptor {
	pub key: &'static str,
	pub subsystem: Option<Subsystem>,
	pub name: &'static str,
	pub help: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoricalField {
	Status,
	Hostname,
	Header,
	AlarmDelay,
	UpsName,
	Model,
	Version,
	LastTransferReason,
	SelfTestResult,
}

impl CategoricalField {
	pub const ALL: [Self; 9] = [
		Self::Status,
		Self::Hostname,
		Self::Header,
		Self::AlarmDelay,
		Self::UpsName,
		Self::Model,
		Self::Version,
		Self::LastTransferReason,
		Self::SelfTestResult,
	];

	/// Text exposed while no value has been reported this cycle.
	pub const BASELINE: &'static str = "UNKNOWN";

	pub fn descriptor(self) -> CategoricalDescriptor {
		let (key, subsystem, name, help) = match self {
			Self::Status => ("STATUS", None, "status", "Current status of the UPS (ONLINE, ONBATT, COMMLOST, ...)."),
			Self::Hostname => ("HOSTNAME", Some(Subsystem::Daemon), "hostname", "Name of the machine that collected the UPS data."),
			Self::Header => (
				"APC",
				Some(Subsystem::Daemon),
				"apc",
				"Header record: status format revision, number of records and number of bytes that follow.",
			),
			Self::AlarmDelay => ("ALARMDEL", Some(Subsystem::Daemon), "alarm", "Delay period for the UPS alarm."),
			Self::UpsName => ("UPSNAME", Some(Subsystem::Daemon), "ups_name", "Name of the UPS as configured in apcupsd."),
			Self::Model => ("MODEL", Some(Subsystem::Daemon), "model", "UPS model as reported by the UPS."),
			Self::Version => ("VERSION", Some(Subsystem::Daemon), "version", "apcupsd release, build date and platform."),
			Self::LastTransferReason => ("LASTXFER", Some(Subsystem::Power), "last_transfer_reason", "Reason for the last transfer to battery."),
			Self::SelfTestResult => ("SELFTEST", Some(Subsystem::Battery), "self_test_result", "Result of the last self test."),
		};
		CategoricalDescriptor { key, subsystem, name, help }
	}
}

/// A recognized status key, tagged with the kind of metric it becomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
	Categorical(CategoricalField),
	Numeric(NumericField),
}

impl Field {
	/// Every field, in exposition order.
	pub fn all() -> impl Iterator<Item = Field> {
		CategoricalField::ALL.into_iter().map(Field::Categorical).chain(NumericField::ALL.into_iter().map(Field::Numeric))
	}

	pub fn from_key(key: &str) -> Option<Field> {
		let key = key.trim();
		Self::all().find(|field| field.key() == key)
	}

	pub fn key(self) -> &'static str {
		match self {
			Field::Categorical(field) => field.descriptor().key,
			Field::Numeric(field) => field.descriptor().key,
		}
	}

	pub fn help(self) -> &'static str {
		match self {
			Field::Categorical(field) => field.descriptor().help,
			Field::Numeric(field) => field.descriptor().help,
		}
	}

	/// Full metric name, `<namespace>_<subsystem>_<name>` or `<namespace>_<name>` without a subsystem.
	pub fn metric_name(self) -> String {
		let (subsystem, name) = match self {
			Field::Categorical(field) => {
				let descriptor = field.descriptor();
				(descriptor.subsystem, descriptor.name)
			},
			Field::Numeric(field) => {
				let descriptor = field.descriptor();
				(Some(descriptor.subsystem), descriptor.name)
			},
		};
		match subsystem {
			Some(subsystem) => format!("{NAMESPACE}_{}_{name}", subsystem.as_str()),
			None => format!("{NAMESPACE}_{name}"),
		}
	}
}

impl fmt::Display for Field {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.key())
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("STATUS", "ups_status")]
	#[case("LINEV", "ups_power_line_voltage")]
	#[case("TIMELEFT", "ups_battery_remaining_time_minutes")]
	#[case("NUMXFERS", "ups_daemon_transfer_count")]
	#[case("ALARMDEL", "ups_daemon_alarm")]
	#[case(" BCHARGE ", "ups_battery_remaining_charge_percent")]
	fn metric_names(#[case] key: &str, #[case] expected: &str) {
		assert_eq!(Field::from_key(key).map(Field::metric_name).as_deref(), Some(expected));
	}

	#[test]
	fn unknown_keys_are_not_fields() {
		assert_eq!(Field::from_key("STATFLAG"), None);
		assert_eq!(Field::from_key("END APC"), None);
		assert_eq!(Field::from_key(""), None);
	}

	#[test]
	fn keys_and_metric_names_are_unique() {
		let keys: HashSet<_> = Field::all().map(Field::key).collect();
		let names: HashSet<_> = Field::all().map(Field::metric_name).collect();
		assert_eq!(keys.len(), Field::all().count());
		assert_eq!(names.len(), Field::all().count());
	}
}
