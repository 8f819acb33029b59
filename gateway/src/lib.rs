//! The visitor-facing web endpoint.
//!
//! `/login` sends the visitor to the identity provider, `/callback` finishes
//! the exchange, records the visit and hands notifications to the relay.

pub mod api;
pub mod client_info;
pub mod config;
pub mod errors;
pub mod message;
pub mod metrics_defs;
pub mod oauth;
pub mod recorder;

use api::AppState;
use errors::GatewayError;
use geo::GeoResolver;
use oauth::OAuthClient;
use recorder::Recorder;
use relay::RelayHandle;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

pub async fn run(
    config: config::Config,
    resolver: GeoResolver,
    relay: RelayHandle,
) -> Result<(), GatewayError> {
    recorder::ensure_parent_dir(&config.access_log)?;

    let readiness = relay.clone();
    let admin_service =
        AdminService::<_, GatewayError>::new(move || !readiness.is_closed());

    let state = AppState {
        oauth: Arc::new(OAuthClient::new(config.oauth.clone())?),
        resolver: Arc::new(resolver),
        recorder: Arc::new(Recorder::new(config.access_log.clone())),
        relay,
        join_guild: config.join_guild,
    };

    let gateway_task = api::serve(&config.listener, state);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(gateway_task, admin_task)?;
    Ok(())
}
