use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use hyper::{
	header::{HeaderValue, CONTENT_TYPE},
	service::{make_service_fn, service_fn},
	Body, Method, Request, Response, Server, StatusCode,
};
use log::info;
use prometheus_exporter_base::{MetricType, MissingValue, PrometheusInstance, PrometheusMetric};
use thiserror::Error;

use crate::{
	field::Field,
	registry::{MetricRegistry, RegistryState},
};

/// Label carrying the active value of a categorical field.
pub const VALUE_LABEL: &str = "string";

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

#[derive(Error, Debug)]
pub enum ExporterError {
	#[error("could not bind {addr}: {source}")]
	Bind { addr: SocketAddr, source: hyper::Error },
	#[error("server error: {0}")]
	Server(hyper::Error),
}

fn gauge_instance<'a>(label: Option<&'a str>) -> PrometheusInstance<'a, f64, MissingValue> {
	let instance = PrometheusInstance::new();
	match label {
		Some(value) => instance.with_label(VALUE_LABEL, value),
		None => instance,
	}
}

/// Escapes a label value for the text exposition format.
fn escape_label_value(value: &str) -> String {
	value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Renders every field of `state` in the Prometheus text format, one gauge per field.
pub fn render_metrics(state: &RegistryState) -> String {
	let mut rendered = String::new();
	for field in Field::all() {
		let (label, value) = match field {
			Field::Numeric(numeric) => (None, state.numeric(numeric)),
			Field::Categorical(categorical) => {
				let active = state.categorical(categorical);
				(Some(escape_label_value(active.text())), active.gauge())
			},
		};
		rendered += &PrometheusMetric::build()
			.with_name(&field.metric_name())
			.with_help(field.help())
			.with_metric_type(MetricType::Gauge)
			.build()
			.render_and_append_instance(&gauge_instance(label.as_deref()).with_value(value))
			.render();
	}
	rendered
}

/// Serves the registry's latest snapshot on the metrics path.
pub struct Exporter {
	registry: Arc<MetricRegistry>,
	metrics_path: String,
}

impl Exporter {
	pub fn new(registry: Arc<MetricRegistry>, metrics_path: String) -> Self {
		Self { registry, metrics_path }
	}

	fn respond(&self, request: &Request<Body>) -> Response<Body> {
		if request.uri().path() != self.metrics_path {
			return status_response(StatusCode::NOT_FOUND);
		}
		let body = match *request.method() {
			Method::GET => Body::from(render_metrics(&self.registry.snapshot())),
			Method::HEAD => Body::empty(),
			_ => return status_response(StatusCode::METHOD_NOT_ALLOWED),
		};
		let mut response = Response::new(body);
		response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_FORMAT));
		response
	}

	pub async fn serve(self, addr: SocketAddr) -> Result<(), ExporterError> {
		let server = Server::try_bind(&addr).map_err(|source| ExporterError::Bind { addr, source })?;
		info!("Serving metrics on http://{addr}{}", self.metrics_path);
		let exporter = Arc::new(self);
		let make_service = make_service_fn(move |_| {
			let exporter = exporter.clone();
			async move {
				Ok::<_, Infallible>(service_fn(move |request| {
					let exporter = exporter.clone();
					async move { Ok::<_, Infallible>(exporter.respond(&request)) }
				}))
			}
		});
		server.serve(make_service).await.map_err(ExporterError::Server)
	}
}

fn status_response(status: StatusCode) -> Response<Body> {
	let mut response = Response::new(Body::empty());
	*response.status_mut() = status;
	response
}
