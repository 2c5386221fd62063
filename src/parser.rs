use chrono::DateTime;
use regex::Regex;
use thiserror::Error;

use crate::field::{CategoricalField, Field, NumericField, Unit};

/// A parsed value, tagged with the field it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedValue {
	Numeric(NumericField, f64),
	Text(CategoricalField, String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
	#[error("empty value")]
	Empty,
	#[error("invalid number \"{0}\"")]
	InvalidNumber(String),
	#[error("unexpected unit in \"{raw}\", expected {expected}")]
	UnexpectedUnit { raw: String, expected: &'static str },
	#[error("value \"{raw}\" outside of {min}..={max}")]
	OutOfRange { raw: String, min: f64, max: f64 },
	#[error("invalid timestamp \"{0}\" {1}")]
	InvalidTimestamp(String, String),
}

/// Turns the raw text apcupsd reports for a field into a typed value.
///
/// Numeric values are a leading number optionally followed by a unit word (`"232.0 Volts"`, `"2"`).
/// The unit word has to match the field's unit; it is dropped from the result, except that
/// minutes and seconds are converted into each other so the value matches the metric's unit.
pub struct FieldParser {
	numeric_value: Regex,
}

impl FieldParser {
	pub fn new() -> Result<Self, regex::Error> {
		Ok(Self {
			numeric_value: Regex::new(r"^([+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+))(?:\s+(\S.*))?$")?,
		})
	}

	pub fn parse(&self, field: Field, raw: &str) -> Result<ParsedValue, ParseError> {
		match field {
			Field::Numeric(field) => self.parse_numeric(field, raw).map(|value| ParsedValue::Numeric(field, value)),
			Field::Categorical(field) => parse_categorical(raw).map(|value| ParsedValue::Text(field, value)),
		}
	}

	pub fn parse_numeric(&self, field: NumericField, raw: &str) -> Result<f64, ParseError> {
		let descriptor = field.descriptor();
		let value = raw.trim();
		if value.is_empty() {
			return Err(ParseError::Empty);
		}
		let parsed = match descriptor.unit {
			Unit::Timestamp => parse_timestamp(value)?,
			unit => {
				let captures = self.numeric_value.captures(value).ok_or_else(|| ParseError::InvalidNumber(value.to_string()))?;
				let number = captures[1].parse::<f64>().map_err(|_| ParseError::InvalidNumber(value.to_string()))?;
				convert_unit(number, unit, captures.get(2).map(|m| m.as_str())).ok_or_else(|| ParseError::UnexpectedUnit {
					raw: value.to_string(),
					expected: unit.word().unwrap_or("no unit"),
				})?
			},
		};
		let max = descriptor.max.unwrap_or(f64::INFINITY);
		if !parsed.is_finite() || !(0.0..=max).contains(&parsed) {
			return Err(ParseError::OutOfRange {
				raw: value.to_string(),
				min: 0.0,
				max,
			});
		}
		Ok(parsed)
	}
}

fn convert_unit(number: f64, expected: Unit, word: Option<&str>) -> Option<f64> {
	match (expected, word) {
		(_, None) => Some(number),
		// apcupsd reports MAXTIME in seconds although it is configured in minutes
		(Unit::Minutes, Some("Seconds")) => Some(number / 60.),
		(Unit::Seconds, Some("Minutes")) => Some(number * 60.),
		(unit, Some(word)) if unit.word() == Some(word) => Some(number),
		_ => None,
	}
}

fn parse_timestamp(value: &str) -> Result<f64, ParseError> {
	DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z")
		.or_else(|_| DateTime::parse_from_str(value, "%a %b %d %X %z %Y")) // Historic apcupsd date format
		.map(|t| t.timestamp() as f64)
		.map_err(|e| ParseError::InvalidTimestamp(value.to_string(), e.to_string()))
}

fn parse_categorical(raw: &str) -> Result<String, ParseError> {
	match raw.trim() {
		"" => Err(ParseError::Empty),
		value => Ok(value.to_string()),
	}
}
