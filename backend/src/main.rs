//! Storefront entry-point: loads settings, wires adapters, and serves the API.

mod server;

use std::ffi::OsString;

use actix_web::cookie::SameSite;
use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use storefront::config::{BuildMode, PolicySettings, ServerSettings};
use storefront::inbound::http::health::HealthState;

use server::{DomainPolicies, ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load()
        .map_err(|e| std::io::Error::other(format!("failed to load server settings: {e}")))?;
    // Policies come from the environment and config files only; the command
    // line belongs to the server settings.
    let program = std::env::args_os()
        .next()
        .unwrap_or_else(|| OsString::from("storefront"));
    let policy_settings = PolicySettings::load_from_iter([program])
        .map_err(|e| std::io::Error::other(format!("failed to load policy settings: {e}")))?;
    let policies = DomainPolicies::from_settings(&policy_settings)
        .map_err(|e| std::io::Error::other(format!("invalid policy settings: {e}")))?;

    let key = settings
        .session_key(BuildMode::from_debug_assertions())
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    if !settings.cookie_secure() {
        warn!("session cookies are issued without the Secure attribute");
    }

    let config = ServerConfig::new(key, settings.cookie_secure(), SameSite::Lax, bind_addr)
        .with_policies(policies);
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(Some(server::build_metrics()?));

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    let result = server.await;
    health_state.mark_unhealthy();
    info!("storefront stopped");
    result
}
