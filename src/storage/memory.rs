//! Thread-safe in-memory storage capabilities for servers, tests, and demos.

// self
use crate::{
	_prelude::*,
	storage::{Cookie, CookieJar, KeyValueStore},
};

/// In-memory [`KeyValueStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<HashMap<String, String>>>);
impl MemoryStore {
	/// Number of stored slots.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no slot is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Option<String> {
		self.0.read().get(key).cloned()
	}

	fn set(&self, key: &str, value: String) {
		self.0.write().insert(key.to_owned(), value);
	}

	fn remove(&self, key: &str) -> Option<String> {
		self.0.write().remove(key)
	}
}

/// In-memory [`CookieJar`]; cookies past their `Max-Age` are treated as absent.
#[derive(Clone, Debug, Default)]
pub struct MemoryCookieJar(Arc<RwLock<HashMap<String, (Cookie, Option<OffsetDateTime>)>>>);
impl MemoryCookieJar {
	fn live(entry: &(Cookie, Option<OffsetDateTime>)) -> bool {
		entry.1.is_none_or(|expires_at| OffsetDateTime::now_utc() < expires_at)
	}
}
impl CookieJar for MemoryCookieJar {
	fn get(&self, name: &str) -> Option<Cookie> {
		self.0.read().get(name).filter(|e| Self::live(e)).map(|(cookie, _)| cookie.clone())
	}

	fn set(&self, cookie: Cookie) {
		let expires_at = cookie.max_age.map(|max_age| OffsetDateTime::now_utc() + max_age);

		self.0.write().insert(cookie.name.clone(), (cookie, expires_at));
	}

	fn remove(&self, name: &str) -> Option<Cookie> {
		self.0.write().remove(name).filter(Self::live).map(|(cookie, _)| cookie)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_slots_are_taken_once() {
		let store = MemoryStore::default();

		store.set("slot", "value".into());

		assert_eq!(store.get("slot").as_deref(), Some("value"));
		assert_eq!(store.remove("slot").as_deref(), Some("value"));
		assert_eq!(store.remove("slot"), None);
		assert!(store.is_empty());
	}

	#[test]
	fn expired_cookies_are_absent() {
		let jar = MemoryCookieJar::default();

		jar.set(Cookie::new("expired", "x").with_max_age(Duration::seconds(-1)));
		jar.set(Cookie::new("live", "y").with_max_age(Duration::minutes(5)));

		assert_eq!(jar.get("expired"), None);
		assert_eq!(jar.get("live").map(|c| c.value), Some("y".to_owned()));
		assert!(jar.remove("live").is_some());
		assert_eq!(jar.get("live"), None);
	}
}
