//! Launch bootstrap sequencer.
//!
//! Parks `state` and `nonce` where the post-launch page can find them, then
//! hands the host page the redirect form for the platform's authorization
//! endpoint. Platform storage is strictly best-effort: any failure along
//! that path — probe timeout, missing capability, platform error, a torn
//! down channel — falls through to the cookie branch instead of surfacing.
//! The only user-visible consequence of a degraded environment is the
//! redirect opening in a new tab when nothing could be persisted at all.
//!
//! ```text
//! Start
//!   └─ AttemptingPlatformStorage   (only when the platform advertises storage)
//!        ├─ StoredViaPostMessage ──┐
//!        └─ FallbackCookies ───────┤
//!   └─ FallbackCookies ────────────┤
//!                                  └─ Redirecting ── Terminal
//! ```

use serde_json::Value;
use transom_core::Environment;

use crate::channel::CrossWindowChannel;
use crate::error::ClientError;
use crate::host::{Cookie, HostPage};
use crate::login::{LoginContext, RedirectForm, RedirectTarget, nonce_key, state_key};
use crate::storage::PlatformStorage;

/// Where the bootstrap currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// Nothing attempted yet.
    Start,
    /// Waiting on the platform-storage put exchanges.
    AttemptingPlatformStorage,
    /// Both values stored in the platform window.
    StoredViaPostMessage,
    /// Cookie branch taken (by flag or by storage failure).
    FallbackCookies,
    /// Redirect form built.
    Redirecting,
    /// Form submitted; this instance is spent.
    Terminal,
}

/// One launch bootstrap.
///
/// Not reusable: after [`ToolLogin::init_tool_login`] the instance is
/// terminal. The read path ([`ToolLogin::validate_state_and_nonce`]) belongs
/// to a fresh instance on the post-launch page.
pub struct ToolLogin<E, C, H> {
    storage: PlatformStorage<E, C>,
    host: H,
    state: SequencerState,
}

impl<E, C, H> ToolLogin<E, C, H>
where
    E: Environment,
    C: CrossWindowChannel,
    H: HostPage,
{
    /// Build a sequencer over a storage client and a host page.
    pub fn new(storage: PlatformStorage<E, C>, host: H) -> Self {
        Self { storage, host, state: SequencerState::Start }
    }

    /// Current state, for observation.
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// The full write path: park state and nonce, then submit the redirect.
    ///
    /// Returns the submitted form for observation.
    pub async fn init_tool_login(
        &mut self,
        ctx: &LoginContext,
        has_platform_storage: bool,
    ) -> RedirectForm {
        let form = self.set_state_and_nonce(ctx, has_platform_storage).await;
        self.host.submit_form(&form);
        self.state = SequencerState::Terminal;
        form
    }

    /// Park state and nonce, and build the redirect form.
    ///
    /// `has_platform_storage` is the host page's flag saying the platform
    /// advertised storage support at launch; without it the storage attempt
    /// is skipped entirely.
    pub async fn set_state_and_nonce(
        &mut self,
        ctx: &LoginContext,
        has_platform_storage: bool,
    ) -> RedirectForm {
        let has_state = if has_platform_storage {
            self.state = SequencerState::AttemptingPlatformStorage;
            match self.attempt_platform_storage(ctx).await {
                Ok(()) => {
                    self.state = SequencerState::StoredViaPostMessage;
                    true
                },
                Err(error) => {
                    tracing::debug!(
                        target: "transom::login",
                        %error,
                        "platform storage unavailable, falling back to cookies"
                    );
                    self.state = SequencerState::FallbackCookies;
                    self.set_state_and_nonce_cookies(ctx)
                },
            }
        } else {
            self.state = SequencerState::FallbackCookies;
            self.set_state_and_nonce_cookies(ctx)
        };

        self.state = SequencerState::Redirecting;
        RedirectForm {
            url: ctx.platform_oidc_login_url.clone(),
            params: ctx.form_params(),
            target: if has_state { RedirectTarget::SameFrame } else { RedirectTarget::NewTab },
        }
    }

    /// The read path: verify a returned state/nonce pair.
    ///
    /// Cookies are checked first; only on a miss does this go back to
    /// platform storage. Resolves `false` on any missing or mismatched
    /// value — never an error.
    pub async fn validate_state_and_nonce(&mut self, state: &str, nonce: &str) -> bool {
        let pairs = self.host.cookie_pairs();
        let cookie_has = |name: &str, value: &str| {
            pairs.iter().any(|(cookie_name, cookie_value)| {
                cookie_name == name && cookie_value == value
            })
        };
        if cookie_has(&state_key(state), state) && cookie_has(&nonce_key(nonce), nonce) {
            return true;
        }

        match self.storage.get_data(&state_key(state)).await {
            Ok(Some(stored)) if stored == state => {},
            _ => return false,
        }
        matches!(
            self.storage.get_data(&nonce_key(nonce)).await,
            Ok(Some(stored)) if stored == nonce
        )
    }

    /// Store both values in the platform window, mirroring each success.
    async fn attempt_platform_storage(&mut self, ctx: &LoginContext) -> Result<(), ClientError> {
        let origin = ctx.platform_origin();

        let response = self.storage.put_data(&state_key(&ctx.state), &ctx.state).await?;
        self.mirror("state", &response, &origin);

        let response = self.storage.put_data(&nonce_key(&ctx.nonce), &ctx.nonce).await?;
        self.mirror("nonce", &response, &origin);

        Ok(())
    }

    /// Mirror a stored value into local storage and the parent window.
    fn mirror(&self, key: &str, response: &transom_proto::ResponseMessage, origin: &str) {
        let payload = serde_json::to_value(response).unwrap_or(Value::Null);
        self.host.store_local(key, &payload);
        self.host.post_to_parent(payload, origin);
    }

    /// Cookie branch: set both cookies, then verify by reading them back.
    fn set_state_and_nonce_cookies(&self, ctx: &LoginContext) -> bool {
        let state_name = state_key(&ctx.state);
        let nonce_name = nonce_key(&ctx.nonce);
        self.host.set_cookie(Cookie::fallback(&state_name, &ctx.state));
        self.host.set_cookie(Cookie::fallback(&nonce_name, &ctx.nonce));

        let pairs = self.host.cookie_pairs();
        let present = |name: &str, value: &str| {
            pairs.iter().any(|(cookie_name, cookie_value)| {
                cookie_name == name && cookie_value == value
            })
        };
        let verified = present(&state_name, &ctx.state) && present(&nonce_name, &ctx.nonce);
        if !verified {
            tracing::debug!(
                target: "transom::login",
                "cookie verification failed, redirect will open a new tab"
            );
        }
        verified
    }
}
