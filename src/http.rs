//! Transport primitives for the request pipeline.
//!
//! The module exposes the [`Transport`] trait alongside [`WireRequest`] and [`WireResponse`]
//! so downstream crates can integrate custom HTTP stacks. The trait is the pipeline's only
//! dependency on an HTTP implementation. Transports must not follow redirects: the pipeline
//! reasons about 3xx statuses explicitly and surfaces them as
//! [`Error::Redirect`](crate::error::Error::Redirect).

// self
use crate::_prelude::*;
use crate::error::TransportError;

/// HTTP methods used by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET` request; parameters travel in the query string.
	Get,
	/// `POST` request; parameters travel as a form-encoded body.
	Post,
	/// `PUT` request; parameters travel as a form-encoded body.
	Put,
	/// `DELETE` request; parameters travel as a form-encoded body.
	Delete,
}
impl Method {
	/// Returns the wire-level method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}

	/// Returns `true` for methods whose parameters belong in the query string.
	pub const fn carries_query(self) -> bool {
		matches!(self, Method::Get)
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One outbound HTTP request, fully assembled by the pipeline.
#[derive(Clone, Debug)]
pub struct WireRequest {
	/// HTTP method.
	pub method: Method,
	/// Fully resolved target URL, query string included.
	pub url: Url,
	/// Ordered request headers.
	pub headers: Vec<(String, String)>,
	/// Form-encoded body for non-GET requests.
	pub form_body: Option<String>,
}
impl WireRequest {
	/// Creates a new request for the given method and URL.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), form_body: None }
	}

	/// Appends a request header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Attaches a form-encoded body and the matching `Content-Type` header.
	pub fn form<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let mut serializer = url::form_urlencoded::Serializer::new(String::new());

		for (key, value) in pairs {
			serializer.append_pair(key.as_ref(), value.as_ref());
		}

		self.form_body = Some(serializer.finish());

		self.header("Content-Type", "application/x-www-form-urlencoded")
	}
}

/// One HTTP response as observed by the pipeline: status, headers, raw body.
#[derive(Clone, Debug)]
pub struct WireResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers as received.
	pub headers: Vec<(String, String)>,
	/// Raw response body bytes.
	pub body: Vec<u8>,
}
impl WireResponse {
	/// Creates a response with the given status and body and no headers.
	pub fn new(status: u16, body: Vec<u8>) -> Self {
		Self { status, headers: Vec::new(), body }
	}

	/// Appends a response header; useful for transport implementations and tests.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Case-insensitive header lookup returning the first matching value.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for 3xx statuses.
	pub fn is_redirect(&self) -> bool {
		(300..400).contains(&self.status)
	}

	/// Body decoded as lossy UTF-8, for error payloads and diagnostics.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Reason phrase for the status code, empty when unknown.
	pub const fn reason(&self) -> &'static str {
		match self.status {
			200 => "OK",
			201 => "Created",
			204 => "No Content",
			301 => "Moved Permanently",
			302 => "Found",
			304 => "Not Modified",
			307 => "Temporary Redirect",
			308 => "Permanent Redirect",
			400 => "Bad Request",
			401 => "Unauthorized",
			403 => "Forbidden",
			404 => "Not Found",
			405 => "Method Not Allowed",
			408 => "Request Timeout",
			410 => "Gone",
			422 => "Unprocessable Entity",
			429 => "Too Many Requests",
			500 => "Internal Server Error",
			502 => "Bad Gateway",
			503 => "Service Unavailable",
			504 => "Gateway Timeout",
			_ => "",
		}
	}
}

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<WireResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing pipeline requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared across all
/// concurrent callers of a pipeline, and must disable automatic redirect following so the
/// pipeline can surface 3xx responses explicitly. Network failures are passed through as
/// [`TransportError`] values, never swallowed or retried.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Executes one request and resolves with the raw response.
	fn send(&self, request: WireRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// [`ReqwestTransport::new`] builds its client with redirect following disabled; configure any
/// custom [`ReqwestClient`] the same way, because the pipeline relies on seeing 3xx statuses.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with a fresh reqwest client that never follows redirects.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: WireRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(
				reqwest::Method::from_bytes(request.method.as_str().as_bytes())
					.map_err(TransportError::network)?,
				request.url,
			);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.form_body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.map(|(name, value)| {
					(name.as_str().to_owned(), String::from_utf8_lossy(value.as_bytes()).into_owned())
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(WireResponse { status, headers, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn header_lookup_is_case_insensitive() {
		let response = WireResponse::new(200, Vec::new())
			.with_header("X-RateLimit-Remaining", "5")
			.with_header("x-ratelimit-limit", "60");

		assert_eq!(response.header("x-ratelimit-remaining"), Some("5"));
		assert_eq!(response.header("X-RATELIMIT-LIMIT"), Some("60"));
		assert_eq!(response.header("Retry-After"), None);
	}

	#[test]
	fn form_body_is_urlencoded() {
		let url = Url::parse("https://service.test/oauth/token")
			.expect("Static URL fixture should parse.");
		let request =
			WireRequest::new(Method::Post, url).form([("grant_type", "client_credentials")]);

		assert_eq!(request.form_body.as_deref(), Some("grant_type=client_credentials"));
		assert!(request
			.headers
			.iter()
			.any(|(name, value)| name == "Content-Type"
				&& value == "application/x-www-form-urlencoded"));
	}

	#[test]
	fn status_classes_cover_redirects() {
		let redirect = WireResponse::new(302, Vec::new());
		let success = WireResponse::new(204, Vec::new());

		assert!(redirect.is_redirect());
		assert!(!redirect.is_success());
		assert!(success.is_success());
		assert_eq!(redirect.reason(), "Found");
	}
}
