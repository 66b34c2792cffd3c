//! Pipeline-level error types shared across the token store, bucket registry, and decoder.
//!
//! Every variant propagates to the immediate caller; nothing is caught and converted into a
//! default value, and nothing is retried automatically. Schema drift is the one condition that
//! is reported instead of failed—see [`crate::decode`].

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical pipeline error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); passed through unmodified.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Successful response body could not be decoded into the target shape.
	#[error(transparent)]
	Decode(#[from] crate::decode::DecodeError),

	/// Token exchange failed; carries the transport or status detail.
	#[error("Token exchange failed: {reason}.")]
	Authentication {
		/// Human-readable failure summary.
		reason: String,
		/// HTTP status of the exchange response, when one was received.
		status: Option<u16>,
	},
	/// The rate-limit gate denied the call before it was sent.
	#[error("Rate limit would be exceeded; retry in {wait}.")]
	PreemptiveRateLimit {
		/// Remaining window duration the caller would otherwise have waited.
		wait: Duration,
	},
	/// The service answered with a non-2xx status.
	#[error("API responded with {status} {reason}.")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Reason phrase associated with the status.
		reason: &'static str,
		/// Raw response body, verbatim.
		body: String,
	},
	/// The service answered with a 3xx status; redirects are never followed.
	#[error("API responded with redirect status {status}.")]
	Redirect {
		/// HTTP status code.
		status: u16,
		/// `Location` header value, when present.
		location: Option<String>,
	},
	/// The caller's cancellation signal fired at a suspension point.
	#[error("Operation was cancelled.")]
	Cancelled,
	/// Operation was invoked after the pipeline was shut down.
	#[error("Pipeline has been closed.")]
	ClosedResource,
}

/// Configuration and validation failures raised by the pipeline.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Service descriptor contains an invalid URL.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::service::ServiceDescriptorError),
	/// A request route could not be joined onto the base endpoint.
	#[error("Route could not be resolved against the base endpoint.")]
	InvalidRoute {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
