//! Service descriptor: endpoints, credentials, and rate-limit defaults for one API origin.

// self
use crate::{_prelude::*, error::ConfigError};

/// Errors raised while constructing or validating service descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ServiceDescriptorError {
	/// Base endpoint is mandatory.
	#[error("Missing base endpoint.")]
	MissingBaseEndpoint,
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Rate-limit windows must have positive length.
	#[error("The rate-limit window must be positive.")]
	NonPositiveWindow,
	/// The conservative default limit must allow at least one call.
	#[error("The default rate limit must be at least one.")]
	ZeroDefaultLimit,
}

/// Endpoint set for one service origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoints {
	/// Base origin all routes are resolved against.
	pub base: Url,
	/// Token exchange endpoint (form-encoded POST).
	pub token: Url,
	/// Optional revocation endpoint (DELETE with the bearer token).
	pub revocation: Option<Url>,
}

/// Immutable description of one game-statistics service: endpoints, client credentials, and
/// the rate-limit defaults applied before the service reports its own numbers.
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
	/// Validated endpoint set.
	pub endpoints: ServiceEndpoints,
	/// OAuth2 client identifier sent with every exchange.
	pub client_id: String,
	/// OAuth2 client secret sent with every exchange.
	pub client_secret: String,
	/// Scope requested by client-credentials exchanges.
	pub default_scope: String,
	/// Fixed rate-limit window length.
	pub window: Duration,
	/// Conservative per-window capacity assumed until headers say otherwise.
	pub default_limit: u32,
}
impl ServiceDescriptor {
	/// Returns a builder seeded with the provided client credentials.
	pub fn builder(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> ServiceDescriptorBuilder {
		ServiceDescriptorBuilder::new(client_id, client_secret)
	}

	/// Resolves a route against the base endpoint.
	pub fn route(&self, path: &str) -> Result<Url, ConfigError> {
		let mut base = self.endpoints.base.as_str().to_owned();

		if !base.ends_with('/') {
			base.push('/');
		}

		Url::parse(&base)
			.and_then(|base| base.join(path.trim_start_matches('/')))
			.map_err(|source| ConfigError::InvalidRoute { source })
	}
}

/// Builder for [`ServiceDescriptor`] values.
#[derive(Debug)]
pub struct ServiceDescriptorBuilder {
	/// OAuth2 client identifier.
	pub client_id: String,
	/// OAuth2 client secret.
	pub client_secret: String,
	/// Base origin all routes are resolved against.
	pub base_endpoint: Option<Url>,
	/// Token exchange endpoint.
	pub token_endpoint: Option<Url>,
	/// Optional revocation endpoint.
	pub revocation_endpoint: Option<Url>,
	/// Scope requested by client-credentials exchanges.
	pub default_scope: String,
	/// Fixed rate-limit window length.
	pub window: Duration,
	/// Conservative per-window capacity.
	pub default_limit: u32,
}
impl ServiceDescriptorBuilder {
	const DEFAULT_LIMIT: u32 = 60;
	const DEFAULT_SCOPE: &'static str = "public";
	const DEFAULT_WINDOW: Duration = Duration::seconds(60);

	/// Creates a new builder seeded with the provided client credentials.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			base_endpoint: None,
			token_endpoint: None,
			revocation_endpoint: None,
			default_scope: Self::DEFAULT_SCOPE.into(),
			window: Self::DEFAULT_WINDOW,
			default_limit: Self::DEFAULT_LIMIT,
		}
	}

	/// Sets the base endpoint.
	pub fn base_endpoint(mut self, url: Url) -> Self {
		self.base_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the optional revocation endpoint.
	pub fn revocation_endpoint(mut self, url: Url) -> Self {
		self.revocation_endpoint = Some(url);

		self
	}

	/// Overrides the scope requested by client-credentials exchanges.
	pub fn default_scope(mut self, scope: impl Into<String>) -> Self {
		self.default_scope = scope.into();

		self
	}

	/// Overrides the rate-limit window length (defaults to 60 seconds).
	pub fn window(mut self, window: Duration) -> Self {
		self.window = window;

		self
	}

	/// Overrides the conservative default capacity (defaults to 60 per window).
	pub fn default_limit(mut self, limit: u32) -> Self {
		self.default_limit = limit;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ServiceDescriptor, ServiceDescriptorError> {
		let base = self.base_endpoint.ok_or(ServiceDescriptorError::MissingBaseEndpoint)?;
		let token = self.token_endpoint.ok_or(ServiceDescriptorError::MissingTokenEndpoint)?;
		let descriptor = ServiceDescriptor {
			endpoints: ServiceEndpoints { base, token, revocation: self.revocation_endpoint },
			client_id: self.client_id,
			client_secret: self.client_secret,
			default_scope: self.default_scope,
			window: self.window,
			default_limit: self.default_limit,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ServiceDescriptor {
	fn validate(&self) -> Result<(), ServiceDescriptorError> {
		validate_endpoint("base", &self.endpoints.base)?;
		validate_endpoint("token", &self.endpoints.token)?;

		if let Some(revocation) = self.endpoints.revocation.as_ref() {
			validate_endpoint("revocation", revocation)?;
		}
		if !self.window.is_positive() {
			return Err(ServiceDescriptorError::NonPositiveWindow);
		}
		if self.default_limit == 0 {
			return Err(ServiceDescriptorError::ZeroDefaultLimit);
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ServiceDescriptorError> {
	if url.scheme() != "https" {
		Err(ServiceDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

/// Descriptor fixture shared by unit tests across the crate.
#[cfg(test)]
pub(crate) fn test_descriptor() -> ServiceDescriptor {
	let url = |value: &str| Url::parse(value).expect("Static descriptor fixture should parse.");

	ServiceDescriptor::builder("123", "secret")
		.base_endpoint(url("https://service.test/api/v2"))
		.token_endpoint(url("https://service.test/oauth/token"))
		.revocation_endpoint(url("https://service.test/oauth/tokens/current"))
		.build()
		.expect("Descriptor fixture should validate.")
}
