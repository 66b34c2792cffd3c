//! Token record struct, grant kinds, and lifetime helpers.

// self
use crate::_prelude::*;

/// OAuth2 grant that produced a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantKind {
	/// `grant_type=client_credentials` exchange.
	ClientCredentials,
	/// `grant_type=refresh_token` exchange.
	RefreshToken,
	/// Token installed out-of-band (e.g. an authorization-code flow result).
	Manual,
}
impl GrantKind {
	/// Returns the wire-level `grant_type` value, or a stable label for manual tokens.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantKind::ClientCredentials => "client_credentials",
			GrantKind::RefreshToken => "refresh_token",
			GrantKind::Manual => "manual",
		}
	}
}
impl Display for GrantKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` if the wrapped secret is the empty string.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access token issued by the service, together with its lifetime bookkeeping.
///
/// Records are created by the token store on grant exchange or installed manually via
/// [`TokenStore::set_manual`](crate::auth::TokenStore::set_manual), and are only ever mutated
/// by the owning store. A revoked record keeps its fields so callers can still inspect what
/// was revoked, but never passes [`Token::is_usable_at`] again.
#[derive(Clone, Serialize, Deserialize)]
pub struct Token {
	/// Grant that produced this token.
	pub grant: GrantKind,
	/// `token_type` reported by the exchange (typically `Bearer`).
	pub token_type: String,
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the exchange issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the token was created locally.
	pub created_at: OffsetDateTime,
	/// Relative lifetime reported by the exchange.
	pub expires_in: Duration,
	/// Set once the token has been revoked locally.
	pub revoked: bool,
}
impl Token {
	/// Remaining lifetime at the given instant; negative once expired.
	pub fn remaining_lifetime_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_in - (now - self.created_at)
	}

	/// Remaining lifetime relative to the current clock.
	pub fn remaining_lifetime(&self) -> Duration {
		self.remaining_lifetime_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` once the remaining lifetime has reached zero.
	pub fn has_expired_at(&self, now: OffsetDateTime) -> bool {
		self.remaining_lifetime_at(now) <= Duration::ZERO
	}

	/// Convenience helper that checks expiry against the current clock.
	pub fn has_expired(&self) -> bool {
		self.has_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` while the token is neither expired nor revoked.
	pub fn is_usable_at(&self, now: OffsetDateTime) -> bool {
		!self.revoked && !self.has_expired_at(now)
	}

	/// Returns the refresh token when one is present and non-empty.
	pub fn usable_refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref().filter(|secret| !secret.is_empty())
	}

	/// Value for the `Authorization` header: `<token_type> <access_token>`.
	pub fn authorization_value(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("grant", &self.grant)
			.field("token_type", &self.token_type)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("created_at", &self.created_at)
			.field("expires_in", &self.expires_in)
			.field("revoked", &self.revoked)
			.finish()
	}
}
