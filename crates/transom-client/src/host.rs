//! Host-page action surface.
//!
//! The bootstrap needs a handful of things only the embedding page can do:
//! write cookies, mirror values into local storage, post observability
//! messages to the parent window, and submit the final redirect form. The
//! [`HostPage`] trait is that surface; the protocol side never touches a
//! document directly.

use std::time::Duration;

use serde_json::Value;

use crate::login::RedirectForm;

/// Lifetime of the fallback cookies.
pub const FALLBACK_COOKIE_TTL: Duration = Duration::from_secs(300);

/// One fallback cookie write.
///
/// Rendered with the attributes cross-site launches require: the cookie
/// must survive inside a third-party iframe, so it is `SameSite=None;
/// Secure` with site-wide path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Time until expiry.
    pub max_age: Duration,
}

impl Cookie {
    /// A state/nonce fallback cookie with the standard TTL.
    pub fn fallback(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), max_age: FALLBACK_COOKIE_TTL }
    }

    /// The `document.cookie` assignment string.
    pub fn header_value(&self) -> String {
        format!(
            "{}={}; path=/; samesite=none; secure; max-age={}",
            self.name,
            self.value,
            self.max_age.as_secs()
        )
    }
}

/// What the embedding page does on the protocol's behalf.
///
/// All methods are synchronous: each maps onto an immediate DOM operation.
pub trait HostPage: Send + Sync {
    /// Write a cookie.
    fn set_cookie(&self, cookie: Cookie);

    /// Current cookies as name/value pairs, as a `document.cookie` split
    /// would yield them.
    fn cookie_pairs(&self) -> Vec<(String, String)>;

    /// Mirror a storage response into local persistent storage.
    fn store_local(&self, key: &str, value: &Value);

    /// Post an observability payload to the parent window.
    fn post_to_parent(&self, payload: Value, target_origin: &str);

    /// Build and submit the transient redirect form.
    fn submit_form(&self, form: &RedirectForm);
}
