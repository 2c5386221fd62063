use std::{env, path::Path, sync::Arc};

use env_logger::Env;
use log::info;
use prometheus_ups_exporter::{
	config::ExporterOptions,
	exporter::{Exporter, ExporterError},
	parser::FieldParser,
	refresh::RefreshCycle,
	registry::MetricRegistry,
	source::ApcupsdSource,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	let config_path = env::var("CONFIG_PATH").unwrap_or("/etc/prometheus/ups_exporter_config.yaml".to_owned());
	let options = ExporterOptions::load(Path::new(&config_path))?;

	let registry = Arc::new(MetricRegistry::new());
	let refresh = RefreshCycle::new(ApcupsdSource::new(&options.apcupsd), FieldParser::new()?, registry.clone());
	let exporter = Exporter::new(registry, options.metrics_path.clone());

	info!(
		"Polling apcupsd at {}:{} every {:?}",
		options.apcupsd.address,
		options.apcupsd.port,
		options.poll_interval()
	);
	futures::try_join!(exporter.serve(options.listen_addr()), async {
		refresh.run_every(options.poll_interval()).await;
		Ok::<_, ExporterError>(())
	})?;
	Ok(())
}
