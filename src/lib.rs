//! Exports the status of an apcupsd-managed UPS as Prometheus gauges.
//!
//! A [`refresh::RefreshCycle`] polls the daemon, resets the [`registry::MetricRegistry`] and fills it
//! from the fields it recognizes; [`exporter::Exporter`] renders the latest complete snapshot on every
//! scrape.

pub mod config;
pub mod exporter;
pub mod field;
pub mod parser;
pub mod refresh;
pub mod registry;
pub mod source;
