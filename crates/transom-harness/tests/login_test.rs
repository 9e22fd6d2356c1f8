//! Launch bootstrap integration tests.
//!
//! Drive the sequencer end to end — platform storage, cookie fallback,
//! redirect target selection, and the validate read path — against the
//! simulated platform and host page.

use transom_client::{
    ExchangeConfig, LoginContext, PlatformStorage, RedirectTarget, SequencerState, ToolLogin,
    nonce_key, state_key,
};
use transom_harness::{PlatformConfig, SimChannel, SimEnv, SimHostPage, SimPlatform, sim_channel};
use url::Url;

const ORIGIN: &str = "https://lms.example";

fn context() -> LoginContext {
    LoginContext {
        platform_oidc_login_url: Url::parse("https://lms.example/oidc/auth").expect("static url"),
        state: "state-1f6a".to_owned(),
        nonce: "nonce-9c2d".to_owned(),
        client_id: Some("tool-client".to_owned()),
        login_hint: "instructor-7".to_owned(),
        lti_message_hint: None,
        redirect_uri: "https://tool.example/lti3".to_owned(),
        lti_storage_target: None,
        extra_params: vec![],
    }
}

fn login_over(
    config: PlatformConfig,
    host: SimHostPage,
    seed: u64,
) -> (ToolLogin<SimEnv, SimChannel, SimHostPage>, SimChannel) {
    let env = SimEnv::new(seed);
    let (channel, events) = sim_channel(SimPlatform::new(config));
    let storage = PlatformStorage::new(
        env,
        channel.clone(),
        events,
        ORIGIN,
        ExchangeConfig::default(),
        false,
    );
    (ToolLogin::new(storage, host), channel)
}

#[tokio::test(flavor = "current_thread")]
async fn storage_success_redirects_in_place() {
    let host = SimHostPage::new();
    let (mut login, channel) = login_over(PlatformConfig::modern(ORIGIN), host.clone(), 1);
    let ctx = context();

    let form = login.init_tool_login(&ctx, true).await;

    assert_eq!(form.target, RedirectTarget::SameFrame);
    assert_eq!(login.state(), SequencerState::Terminal);

    // Both values parked in the platform window.
    assert_eq!(channel.platform_stored(&state_key(&ctx.state)).as_deref(), Some(ctx.state.as_str()));
    assert_eq!(channel.platform_stored(&nonce_key(&ctx.nonce)).as_deref(), Some(ctx.nonce.as_str()));

    // Each success mirrored locally and posted to the parent for observability.
    assert!(host.local("state").is_some());
    assert!(host.local("nonce").is_some());
    let parent_posts = host.parent_posts();
    assert_eq!(parent_posts.len(), 2);
    assert!(parent_posts.iter().all(|(_, origin)| origin == ORIGIN));

    // No cookie fallback on the storage path.
    assert!(host.cookies().is_empty());

    // The submitted form is the one returned.
    assert_eq!(host.submitted_forms(), vec![form]);
}

#[tokio::test(flavor = "current_thread")]
async fn redirect_form_carries_login_and_fixed_oidc_params() {
    let host = SimHostPage::new();
    let (mut login, _channel) = login_over(PlatformConfig::modern(ORIGIN), host.clone(), 2);
    let ctx = context();

    let form = login.init_tool_login(&ctx, true).await;

    let get = |name: &str| {
        form.params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    };
    assert_eq!(form.url.as_str(), "https://lms.example/oidc/auth");
    assert_eq!(get("state"), Some("state-1f6a"));
    assert_eq!(get("nonce"), Some("nonce-9c2d"));
    assert_eq!(get("scope"), Some("openid"));
    assert_eq!(get("response_type"), Some("id_token"));
    assert_eq!(get("response_mode"), Some("form_post"));
    assert_eq!(get("prompt"), Some("none"));
}

#[tokio::test(flavor = "current_thread")]
async fn no_storage_flag_sets_verified_cookies_and_stays_in_frame() {
    let host = SimHostPage::new();
    let (mut login, channel) = login_over(PlatformConfig::modern(ORIGIN), host.clone(), 3);
    let ctx = context();

    let form = login.set_state_and_nonce(&ctx, false).await;

    // Storage never attempted: the platform saw no posts at all.
    assert!(channel.posts().is_empty());

    let cookies = host.cookies();
    assert!(cookies.contains(&(state_key(&ctx.state), ctx.state.clone())));
    assert!(cookies.contains(&(nonce_key(&ctx.nonce), ctx.nonce.clone())));

    // Both cookies verified present, so the redirect stays put.
    assert_eq!(form.target, RedirectTarget::SameFrame);
    assert_eq!(login.state(), SequencerState::Redirecting);
}

#[tokio::test(flavor = "current_thread")]
async fn storage_failure_falls_back_to_cookies_silently() {
    let mut config = PlatformConfig::modern(ORIGIN);
    config.silent = true;
    let host = SimHostPage::new();
    let (mut login, channel) = login_over(config, host.clone(), 4);
    let ctx = context();

    let form = login.init_tool_login(&ctx, true).await;

    // The storage attempt went out and died; cookies picked up the slack
    // and nothing surfaced as an error.
    assert!(!channel.posts().is_empty());
    assert!(channel.platform_stored(&state_key(&ctx.state)).is_none());
    assert!(host.cookies().contains(&(state_key(&ctx.state), ctx.state.clone())));
    assert_eq!(form.target, RedirectTarget::SameFrame);
}

#[tokio::test(flavor = "current_thread")]
async fn nothing_persisted_opens_a_new_tab() {
    let mut config = PlatformConfig::modern(ORIGIN);
    config.silent = true;
    let host = SimHostPage::with_blocked_cookies();
    let (mut login, _channel) = login_over(config, host.clone(), 5);
    let ctx = context();

    let form = login.init_tool_login(&ctx, true).await;

    assert!(host.cookies().is_empty());
    assert_eq!(form.target, RedirectTarget::NewTab);
    // The redirect still happens; degraded environments are the user's
    // problem to click through, not a hard failure.
    assert_eq!(host.submitted_forms().len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn validate_prefers_cookies_over_storage() {
    let host = SimHostPage::new();
    host.preset_cookie(&state_key("s1"), "s1");
    host.preset_cookie(&nonce_key("n1"), "n1");
    let (mut login, channel) = login_over(PlatformConfig::modern(ORIGIN), host, 6);

    assert!(login.validate_state_and_nonce("s1", "n1").await);
    // Cookie hit: the platform was never consulted.
    assert!(channel.posts().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn validate_falls_back_to_platform_storage() {
    let host = SimHostPage::new();
    let (mut login, channel) = login_over(PlatformConfig::modern(ORIGIN), host, 7);
    channel.platform_insert(&state_key("s1"), "s1");
    channel.platform_insert(&nonce_key("n1"), "n1");

    assert!(login.validate_state_and_nonce("s1", "n1").await);
    assert!(!channel.posts().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn validate_rejects_missing_or_mismatched_values() {
    let host = SimHostPage::new();
    let (mut login, channel) = login_over(PlatformConfig::modern(ORIGIN), host, 8);

    // Nothing stored anywhere.
    assert!(!login.validate_state_and_nonce("s1", "n1").await);

    // State present but nonce wrong.
    channel.platform_insert(&state_key("s1"), "s1");
    channel.platform_insert(&nonce_key("n1"), "different");
    assert!(!login.validate_state_and_nonce("s1", "n1").await);
}

#[tokio::test(flavor = "current_thread")]
async fn legacy_platform_still_bootstraps_via_storage() {
    let host = SimHostPage::new();
    let (mut login, channel) = login_over(PlatformConfig::legacy_only(ORIGIN), host.clone(), 9);
    let ctx = context();

    let form = login.init_tool_login(&ctx, true).await;

    assert_eq!(form.target, RedirectTarget::SameFrame);
    assert_eq!(channel.platform_stored(&state_key(&ctx.state)).as_deref(), Some(ctx.state.as_str()));
    assert!(host.cookies().is_empty());
}
