//! Storage capabilities standing in for session-scoped storage and the cookie jar.

pub mod memory;

pub use memory::{MemoryCookieJar, MemoryStore};

// self
use crate::_prelude::*;

/// Session-scoped key/value slots (cleared when the user agent session ends).
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`.
	fn get(&self, key: &str) -> Option<String>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: String);

	/// Removes and returns the value stored under `key`.
	fn remove(&self, key: &str) -> Option<String>;
}

/// Cookie jar visible to the engine.
pub trait CookieJar
where
	Self: Send + Sync,
{
	/// Returns the cookie named `name`.
	fn get(&self, name: &str) -> Option<Cookie>;

	/// Sets (or replaces) a cookie.
	fn set(&self, cookie: Cookie);

	/// Removes and returns the cookie named `name`.
	fn remove(&self, name: &str) -> Option<Cookie>;
}

/// `SameSite` cookie attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SameSite {
	/// Sent only on same-site requests.
	#[default]
	Strict,
	/// Sent on same-site requests and top-level navigations.
	Lax,
	/// Sent on every request (requires `Secure`).
	None,
}
impl SameSite {
	/// Returns the attribute value.
	pub const fn as_str(self) -> &'static str {
		match self {
			SameSite::Strict => "Strict",
			SameSite::Lax => "Lax",
			SameSite::None => "None",
		}
	}
}

/// A cookie and its attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
	/// Cookie name.
	pub name: String,
	/// Cookie value.
	pub value: String,
	/// `Secure` attribute.
	pub secure: bool,
	/// `SameSite` attribute.
	pub same_site: SameSite,
	/// `HttpOnly` attribute.
	pub http_only: bool,
	/// `Max-Age` attribute.
	pub max_age: Option<Duration>,
}
impl Cookie {
	/// Creates a `Secure; SameSite=Strict` cookie readable by page scripts.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			secure: true,
			same_site: SameSite::Strict,
			http_only: false,
			max_age: None,
		}
	}

	/// Sets `Max-Age`.
	pub fn with_max_age(mut self, max_age: Duration) -> Self {
		self.max_age = Some(max_age);

		self
	}
}
impl Display for Cookie {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}={}; Path=/; SameSite={}", self.name, self.value, self.same_site.as_str())?;

		if let Some(max_age) = self.max_age {
			write!(f, "; Max-Age={}", max_age.whole_seconds())?;
		}
		if self.secure {
			f.write_str("; Secure")?;
		}
		if self.http_only {
			f.write_str("; HttpOnly")?;
		}

		Ok(())
	}
}
