//! Token store with single-flight exchanges, manual installation, and revocation.
//!
//! The store owns the one [`Token`] shared by every caller of a pipeline instance. The fast
//! path reads the current record under a sync mutex; the slow path serializes exchanges behind
//! an async guard and re-checks after acquisition, so N concurrent callers racing an expired or
//! absent token trigger exactly one network exchange and all observe its result.

// self
use crate::{
	_prelude::*,
	auth::{GrantKind, Token, TokenSecret},
	error::ConfigError,
	http::{Method, Transport, WireRequest, WireResponse},
	service::ServiceDescriptor,
};

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
	token_type: String,
	access_token: String,
	expires_in: Option<i64>,
	refresh_token: Option<String>,
}

/// Owns the current token and performs OAuth2 exchanges on demand.
///
/// Exchange failures are never retried; they surface as [`Error::Authentication`] carrying the
/// transport or status detail.
#[derive(Debug)]
pub struct TokenStore {
	descriptor: ServiceDescriptor,
	current: Mutex<Option<Token>>,
	exchange_guard: AsyncMutex<()>,
}
impl TokenStore {
	pub(crate) fn new(descriptor: ServiceDescriptor) -> Self {
		Self { descriptor, current: Mutex::new(None), exchange_guard: AsyncMutex::new(()) }
	}

	/// Returns a clone of the current token record, if any, without touching the network.
	pub fn current(&self) -> Option<Token> {
		self.current.lock().clone()
	}

	/// Installs a token obtained out-of-band (e.g. an authorization-code flow result).
	///
	/// Bypasses the exchange call entirely; the installed record is returned.
	pub fn set_manual(
		&self,
		access_token: impl Into<String>,
		refresh_token: Option<String>,
		expires_in: Duration,
	) -> Token {
		let token = Token {
			grant: GrantKind::Manual,
			token_type: "Bearer".into(),
			access_token: TokenSecret::new(access_token),
			refresh_token: refresh_token.map(TokenSecret::new),
			created_at: OffsetDateTime::now_utc(),
			expires_in,
			revoked: false,
		};

		*self.current.lock() = Some(token.clone());

		token
	}

	/// Returns the current token when still usable, otherwise performs a grant exchange.
	///
	/// Grant selection: `refresh_token` when the current record carries a non-empty refresh
	/// token and has not been revoked, else `client_credentials` with the descriptor's default
	/// scope. Single-flight under concurrency.
	pub async fn get_or_refresh<C>(&self, transport: &C) -> Result<Token>
	where
		C: ?Sized + Transport,
	{
		if let Some(token) = self.usable_current(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let _singleflight = self.exchange_guard.lock().await;

		// Another caller may have finished an exchange while this one waited on the guard.
		if let Some(token) = self.usable_current(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let refresh_secret = self
			.current()
			.filter(|token| !token.revoked)
			.and_then(|token| token.usable_refresh_token().map(|s| s.expose().to_owned()));
		let token = match refresh_secret {
			Some(secret) => {
				self.exchange(transport, GrantKind::RefreshToken, &[
					("grant_type", "refresh_token"),
					("refresh_token", secret.as_str()),
				])
				.await?
			},
			None => {
				self.exchange(transport, GrantKind::ClientCredentials, &[
					("grant_type", "client_credentials"),
					("scope", self.descriptor.default_scope.as_str()),
				])
				.await?
			},
		};

		*self.current.lock() = Some(token.clone());

		Ok(token)
	}

	/// Marks the current token revoked and invalidates it server-side.
	///
	/// Local revocation is applied before the network call so a transport failure can never
	/// leave a locally-live revoked token. The token fields are kept so callers can still
	/// inspect what was revoked; the next gated call performs a fresh exchange.
	pub async fn revoke<C>(&self, transport: &C) -> Result<()>
	where
		C: ?Sized + Transport,
	{
		let revoked = {
			let mut guard = self.current.lock();

			match guard.as_mut() {
				Some(token) => {
					token.revoked = true;

					Some(token.clone())
				},
				None => None,
			}
		};
		let (Some(token), Some(revocation)) =
			(revoked, self.descriptor.endpoints.revocation.as_ref())
		else {
			return Ok(());
		};
		let request = WireRequest::new(Method::Delete, revocation.clone())
			.header("Authorization", token.authorization_value())
			.header("Accept", "application/json");
		let response = transport.send(request).await?;

		if !response.is_success() {
			return Err(Error::Api {
				status: response.status,
				reason: response.reason(),
				body: response.body_text(),
			});
		}

		Ok(())
	}

	fn usable_current(&self, now: OffsetDateTime) -> Option<Token> {
		self.current.lock().as_ref().filter(|token| token.is_usable_at(now)).cloned()
	}

	async fn exchange<C>(
		&self,
		transport: &C,
		grant: GrantKind,
		grant_fields: &[(&str, &str)],
	) -> Result<Token>
	where
		C: ?Sized + Transport,
	{
		let mut form = vec![
			("client_id", self.descriptor.client_id.as_str()),
			("client_secret", self.descriptor.client_secret.as_str()),
		];

		form.extend_from_slice(grant_fields);

		let request = WireRequest::new(Method::Post, self.descriptor.endpoints.token.clone())
			.header("Accept", "application/json")
			.form(form.iter().map(|(k, v)| (*k, *v)));
		let response = transport.send(request).await.map_err(|err| Error::Authentication {
			reason: format!("transport failure during {grant} exchange: {err}"),
			status: None,
		})?;

		if !response.is_success() {
			return Err(Error::Authentication {
				reason: format!("{grant} exchange was rejected: {}", response.body_text()),
				status: Some(response.status),
			});
		}

		Self::parse_exchange_response(grant, &response)
	}

	fn parse_exchange_response(grant: GrantKind, response: &WireResponse) -> Result<Token> {
		let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
		let parsed: TokenEndpointResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|err| Error::Authentication {
				reason: format!("{grant} exchange returned malformed JSON: {err}"),
				status: Some(response.status),
			})?;
		let expires_in = parsed.expires_in.ok_or(ConfigError::MissingExpiresIn)?;

		if expires_in <= 0 {
			return Err(ConfigError::NonPositiveExpiresIn.into());
		}

		Ok(Token {
			grant,
			token_type: parsed.token_type,
			access_token: TokenSecret::new(parsed.access_token),
			refresh_token: parsed.refresh_token.map(TokenSecret::new),
			created_at: OffsetDateTime::now_utc(),
			expires_in: Duration::seconds(expires_in),
			revoked: false,
		})
	}
}
