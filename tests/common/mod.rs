//! Shared fixtures for the integration suites: descriptor builders, an httpmock-compatible
//! transport, and an event-recording sink.

// std
use std::sync::Arc;
// crates.io
use httpmock::MockServer;
use parking_lot::Mutex;
// self
use statline::{
	http::ReqwestTransport,
	obs::{EventSink, PipelineEvent},
	pipeline::Pipeline,
	reqwest,
	service::{ServiceDescriptor, ServiceDescriptorBuilder},
	url::Url,
};

/// Token endpoint response shared across suites.
pub const TOKEN_BODY: &str =
	"{\"token_type\":\"Bearer\",\"access_token\":\"abc\",\"expires_in\":3600}";

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse mock service URL.")
}

/// Descriptor builder seeded with the mock server's endpoints.
pub fn descriptor_builder(server: &MockServer) -> ServiceDescriptorBuilder {
	ServiceDescriptor::builder("123", "secret")
		.base_endpoint(url(&server.url("/api/v2")))
		.token_endpoint(url(&server.url("/oauth/token")))
		.revocation_endpoint(url(&server.url("/oauth/tokens/current")))
}

pub fn build_descriptor(server: &MockServer) -> ServiceDescriptor {
	descriptor_builder(server).build().expect("Mock service descriptor should validate.")
}

/// Reqwest transport that accepts httpmock's self-signed certificates; redirect following
/// stays disabled, matching production behavior.
pub fn test_transport() -> ReqwestTransport {
	let client = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestTransport::with_client(client)
}

/// Event sink that records every pipeline event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink(Mutex<Vec<PipelineEvent>>);
impl RecordingSink {
	pub fn events(&self) -> Vec<PipelineEvent> {
		self.0.lock().clone()
	}
}
impl EventSink for RecordingSink {
	fn record(&self, event: PipelineEvent) {
		self.0.lock().push(event);
	}
}

/// Pipeline wired to the insecure test transport and a recording sink.
pub fn build_pipeline(
	descriptor: ServiceDescriptor,
) -> (Pipeline<ReqwestTransport>, Arc<RecordingSink>) {
	let sink = Arc::new(RecordingSink::default());
	let pipeline = Pipeline::with_transport(descriptor, test_transport())
		.with_event_sink(sink.clone() as Arc<dyn EventSink>);

	(pipeline, sink)
}
