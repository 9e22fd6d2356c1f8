//! Simulated launch walkthrough.
//!
//! Runs the full OIDC bootstrap against the in-process platform model and
//! reports what happened, for eyeballing protocol behavior under the
//! various fault knobs.
//!
//! # Usage
//!
//! ```bash
//! # Happy path: modern platform, storage advertised
//! transom-sim
//!
//! # Pre-release platform, debug exchange logs
//! transom-sim --legacy-only --debug --log-level debug
//!
//! # Worst case: no storage, cookies blocked
//! transom-sim --no-storage --blocked-cookies
//! ```

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use transom_client::{ExchangeConfig, LoginContext, PlatformStorage, ToolLogin};
use transom_harness::{PlatformConfig, SimEnv, SimHostPage, SimPlatform, sim_channel};
use url::Url;

/// Platform-storage negotiation walkthrough
#[derive(Parser, Debug)]
#[command(name = "transom-sim")]
#[command(about = "Simulated LTI platform-storage launch")]
#[command(version)]
struct Args {
    /// RNG seed for the simulation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Enable per-exchange diagnostic logs
    #[arg(long)]
    debug: bool,

    /// Platform only implements the legacy subject namespace
    #[arg(long)]
    legacy_only: bool,

    /// Platform does not advertise storage support
    #[arg(long)]
    no_storage: bool,

    /// Platform never answers (forces the cookie fallback)
    #[arg(long)]
    silent: bool,

    /// Browser refuses cookie writes
    #[arg(long)]
    blocked_cookies: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let origin = "https://lms.example";
    let mut config = if args.legacy_only {
        PlatformConfig::legacy_only(origin)
    } else {
        PlatformConfig::modern(origin)
    };
    config.silent = args.silent;

    let env = SimEnv::new(args.seed);
    let (channel, events) = sim_channel(SimPlatform::new(config));
    let storage = PlatformStorage::new(
        env,
        channel.clone(),
        events,
        origin,
        ExchangeConfig::default(),
        args.debug,
    );
    let host =
        if args.blocked_cookies { SimHostPage::with_blocked_cookies() } else { SimHostPage::new() };

    let ctx = LoginContext {
        platform_oidc_login_url: Url::parse("https://lms.example/oidc/auth")?,
        state: "state-1f6a".to_owned(),
        nonce: "nonce-9c2d".to_owned(),
        client_id: Some("tool-client".to_owned()),
        login_hint: "instructor-7".to_owned(),
        lti_message_hint: Some("deep-link".to_owned()),
        redirect_uri: "https://tool.example/lti3".to_owned(),
        lti_storage_target: None,
        extra_params: vec![("lti_deployment_id".to_owned(), "deployment-1".to_owned())],
    };

    let mut login = ToolLogin::new(storage, host.clone());
    let form = login.init_tool_login(&ctx, !args.no_storage).await;

    tracing::info!(window_target = form.target.as_str(), url = %form.url, "redirect submitted");
    tracing::info!(count = channel.posts().len(), "window posts made");
    for (name, _) in host.cookies() {
        tracing::info!(cookie = %name, "cookie present");
    }
    if let Some(stored) = channel.platform_stored(&transom_client::state_key(&ctx.state)) {
        tracing::info!(value = %stored, "state held in platform storage");
    }

    Ok(())
}
