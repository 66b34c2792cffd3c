//! Request pipeline orchestration: token freshness, gate, build, send, validate, decode.
//!
//! One [`Pipeline`] instance is shared by many concurrent logical callers. Per call the
//! sequence is: ensure the token is fresh → gate on the endpoint's rate-limit bucket → build
//! the wire request → send → update the bucket from the response headers → validate the
//! status → decode the body and report drift. Waits suspend only the calling operation, every
//! suspension point honors the caller's cancellation signal, and nothing is retried
//! automatically—retry/backoff is the caller's responsibility.

pub use tokio_util::sync::CancellationToken;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{Token, TokenStore},
	decode::{self, Decoded, FieldCatalog},
	http::{Method, Transport, WireRequest},
	limit::{BucketRegistry, EndpointKey, GateDecision, LimitPolicy},
	obs::{self, EventSink, GateOutcome, NullSink, PipelineEvent, RequestOutcome, RequestSpan},
	service::ServiceDescriptor,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Pipeline specialized for the crate's default reqwest transport.
pub type ReqwestPipeline = Pipeline<ReqwestTransport>;

/// One pipeline call: target route, method, and ordered parameters.
///
/// Transient—built per call and not retained after the call completes. The endpoint key is
/// derived from the route with the query string stripped, so paginated calls to the same
/// resource share one rate-limit bucket.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Route relative to the service's base endpoint.
	pub route: String,
	/// Ordered key/value parameters (query string for GET, form body otherwise).
	pub params: Vec<(String, String)>,
	endpoint: EndpointKey,
}
impl RequestDescriptor {
	/// Creates a descriptor for the given method and route.
	pub fn new(method: Method, route: impl Into<String>) -> Self {
		let route = route.into();
		let endpoint = EndpointKey::new(&route);

		Self { method, route, params: Vec::new(), endpoint }
	}

	/// Creates a `GET` descriptor.
	pub fn get(route: impl Into<String>) -> Self {
		Self::new(Method::Get, route)
	}

	/// Creates a `POST` descriptor.
	pub fn post(route: impl Into<String>) -> Self {
		Self::new(Method::Post, route)
	}

	/// Appends one parameter, preserving insertion order.
	pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}

	/// Normalized endpoint key used for rate-limit bucketing.
	pub fn endpoint(&self) -> &EndpointKey {
		&self.endpoint
	}
}

/// Authenticated, rate-limited request pipeline for one service.
///
/// Owns the token store, bucket registry, and transport slot; all three hold process-wide
/// mutable state for the lifetime of the pipeline and serialize their mutations internally.
/// The transport is acquired once at construction and released by [`Pipeline::close`]; any
/// operation invoked afterwards fails with
/// [`Error::ClosedResource`](crate::error::Error::ClosedResource).
pub struct Pipeline<C>
where
	C: ?Sized + Transport,
{
	/// Service endpoints, credentials, and rate-limit defaults.
	pub descriptor: ServiceDescriptor,
	tokens: TokenStore,
	buckets: BucketRegistry,
	transport: RwLock<Option<Arc<C>>>,
	policy: LimitPolicy,
	sink: Arc<dyn EventSink>,
}
impl<C> Pipeline<C>
where
	C: ?Sized + Transport,
{
	/// Creates a pipeline that reuses the caller-provided transport.
	pub fn with_transport(descriptor: ServiceDescriptor, transport: impl Into<Arc<C>>) -> Self {
		let tokens = TokenStore::new(descriptor.clone());
		let buckets = BucketRegistry::new(descriptor.window, descriptor.default_limit);

		Self {
			descriptor,
			tokens,
			buckets,
			transport: RwLock::new(Some(transport.into())),
			policy: LimitPolicy::default(),
			sink: Arc::new(NullSink),
		}
	}

	/// Overrides the gate policy applied when a bucket is exhausted (defaults to `Wait`).
	pub fn with_policy(mut self, policy: LimitPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Replaces the event sink receiving gate, bucket, and drift events.
	pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
		self.sink = sink;

		self
	}

	/// Token store owned by this pipeline; exposes [`TokenStore::set_manual`] and reads.
	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	/// Bucket registry owned by this pipeline; useful for snapshots and diagnostics.
	pub fn buckets(&self) -> &BucketRegistry {
		&self.buckets
	}

	/// Executes one call and decodes the response into `T`.
	pub async fn execute<T>(&self, request: RequestDescriptor) -> Result<Decoded<T>>
	where
		T: DeserializeOwned + FieldCatalog,
	{
		self.execute_cancellable(request, CancellationToken::new()).await
	}

	/// Executes one call, honoring the caller's cancellation signal at every suspension point.
	///
	/// Cancellation during the token exchange, the rate-limit wait, or the network send
	/// resolves promptly with [`Error::Cancelled`](crate::error::Error::Cancelled).
	pub async fn execute_cancellable<T>(
		&self,
		request: RequestDescriptor,
		cancel: CancellationToken,
	) -> Result<Decoded<T>>
	where
		T: DeserializeOwned + FieldCatalog,
	{
		let endpoint = request.endpoint().clone();
		let span = RequestSpan::new(&endpoint, "execute");

		obs::record_request_outcome(&endpoint, RequestOutcome::Attempt);

		let result = match cancel.run_until_cancelled(span.instrument(self.run(&request))).await {
			Some(result) => result,
			None => Err(Error::Cancelled),
		};

		match &result {
			Ok(_) => obs::record_request_outcome(&endpoint, RequestOutcome::Success),
			Err(_) => obs::record_request_outcome(&endpoint, RequestOutcome::Failure),
		}

		result
	}

	/// Revokes the current token server-side and locally.
	pub async fn revoke_token(&self) -> Result<()> {
		let transport = self.active_transport()?;

		self.tokens.revoke(transport.as_ref()).await
	}

	/// Shuts the pipeline down, releasing the transport.
	///
	/// In-flight calls holding a transport handle finish undisturbed; every call entered
	/// afterwards fails with [`Error::ClosedResource`](crate::error::Error::ClosedResource).
	pub fn close(&self) {
		self.transport.write().take();
	}

	/// Returns `true` once [`Pipeline::close`] has been called.
	pub fn is_closed(&self) -> bool {
		self.transport.read().is_none()
	}

	fn active_transport(&self) -> Result<Arc<C>> {
		self.transport.read().clone().ok_or(Error::ClosedResource)
	}

	async fn run<T>(&self, request: &RequestDescriptor) -> Result<Decoded<T>>
	where
		T: DeserializeOwned + FieldCatalog,
	{
		let transport = self.active_transport()?;
		let token = self.tokens.get_or_refresh(transport.as_ref()).await?;
		let endpoint = request.endpoint();

		match self.buckets.gate_at(endpoint, OffsetDateTime::now_utc()) {
			GateDecision::Proceed => {
				self.sink.record(PipelineEvent::Gate {
					endpoint: endpoint.clone(),
					outcome: GateOutcome::Proceed,
					wait: None,
				});
			},
			GateDecision::Deny { wait } => match self.policy {
				LimitPolicy::Throw => {
					self.sink.record(PipelineEvent::Gate {
						endpoint: endpoint.clone(),
						outcome: GateOutcome::Throw,
						wait: Some(wait),
					});

					return Err(Error::PreemptiveRateLimit { wait });
				},
				LimitPolicy::Wait => {
					self.sink.record(PipelineEvent::Gate {
						endpoint: endpoint.clone(),
						outcome: GateOutcome::Wait,
						wait: Some(wait),
					});

					// The registry lock is not held here; only this caller suspends.
					tokio::time::sleep(
						std::time::Duration::try_from(wait)
							.unwrap_or(std::time::Duration::ZERO),
					)
					.await;
				},
			},
		}

		let wire = self.build_wire_request(request, &token)?;
		let response = transport.send(wire).await?;
		let (limit, remaining) = BucketRegistry::parse_headers(&response);
		let bucket = self.buckets.update_at(endpoint, limit, remaining, OffsetDateTime::now_utc());

		self.sink.record(PipelineEvent::BucketUpdate {
			endpoint: endpoint.clone(),
			used: bucket.used(),
			limit: bucket.limit,
		});

		if response.is_redirect() {
			return Err(Error::Redirect {
				status: response.status,
				location: response.header("Location").map(str::to_owned),
			});
		}
		if !response.is_success() {
			return Err(Error::Api {
				status: response.status,
				reason: response.reason(),
				body: response.body_text(),
			});
		}

		let decoded = decode::decode::<T>(&response.body, endpoint)?;

		if let Some(drift) = decoded.drift.as_ref() {
			self.sink.record(PipelineEvent::Drift {
				type_name: drift.type_name,
				endpoint: endpoint.clone(),
				fields: drift.field_names(),
			});
		}

		Ok(decoded)
	}

	fn build_wire_request(&self, request: &RequestDescriptor, token: &Token) -> Result<WireRequest> {
		let mut url = self.descriptor.route(&request.route)?;

		if request.method.carries_query() && !request.params.is_empty() {
			url.query_pairs_mut()
				.extend_pairs(request.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		let mut wire = WireRequest::new(request.method, url)
			.header("Authorization", token.authorization_value())
			.header("Accept", "application/json");

		if !request.method.carries_query() && !request.params.is_empty() {
			wire = wire.form(request.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		Ok(wire)
	}
}
#[cfg(feature = "reqwest")]
impl Pipeline<ReqwestTransport> {
	/// Creates a pipeline with a fresh reqwest transport (redirect following disabled).
	pub fn new(descriptor: ServiceDescriptor) -> Result<Self> {
		let transport = ReqwestTransport::new()?;

		Ok(Self::with_transport(descriptor, transport))
	}
}
impl<C> Debug for Pipeline<C>
where
	C: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline")
			.field("descriptor", &self.descriptor)
			.field("policy", &self.policy)
			.field("closed", &self.is_closed())
			.finish()
	}
}
