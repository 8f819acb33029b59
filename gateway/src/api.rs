use crate::client_info::{ClientInfo, client_ip};
use crate::config::Listener;
use crate::errors::GatewayError;
use crate::message::log_message;
use crate::metrics_defs::VERIFICATIONS;
use crate::oauth::{OAuthClient, User};
use crate::recorder::{AccessRecord, Recorder};
use axum::{
    Router,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use geo::GeoResolver;
use relay::RelayHandle;
use serde::Deserialize;
use shared::counter;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct AppState {
    pub oauth: Arc<OAuthClient>,
    pub resolver: Arc<GeoResolver>,
    pub recorder: Arc<Recorder>,
    pub relay: RelayHandle,
    pub join_guild: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .with_state(state)
}

pub async fn serve(listener: &Listener, state: AppState) -> Result<(), GatewayError> {
    let addr = format!("{}:{}", listener.host, listener.port);
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state).await
}

pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<(), GatewayError> {
    tracing::info!(addr = ?listener.local_addr()?, "Gateway listening");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[derive(Deserialize, Debug)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

async fn login(State(state): State<AppState>) -> Response {
    let location = state.oauth.authorize_url().to_string();
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

async fn callback(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, GatewayError> {
    match verify(&state, peer, &headers, params).await {
        Ok(user) => {
            counter!(VERIFICATIONS, "outcome" => "success").increment(1);
            Ok(Html(success_page(&user)))
        }
        Err(e) => {
            counter!(VERIFICATIONS, "outcome" => "failure").increment(1);
            tracing::warn!(error = %e, "Verification failed");
            Err(e)
        }
    }
}

async fn verify(
    state: &AppState,
    peer: SocketAddr,
    headers: &HeaderMap,
    params: CallbackParams,
) -> Result<User, GatewayError> {
    if let Some(error) = params.error {
        return Err(GatewayError::Denied(error));
    }
    let code = params
        .code
        .filter(|code| !code.trim().is_empty())
        .ok_or(GatewayError::MissingCode)?;

    let token = state.oauth.exchange_code(&code).await?;
    let user = state.oauth.fetch_user(&token.access_token).await?;

    let ip = client_ip(headers, Some(peer));
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let client = ClientInfo::from_user_agent(user_agent);

    let geo = state.resolver.resolve(&ip).await;
    let record = AccessRecord::new(&user, geo, client);
    let message = log_message(&record);

    // The visitor's response does not depend on the log being written.
    let recorder = state.recorder.clone();
    let visitor_id = user.id.clone();
    match tokio::task::spawn_blocking(move || recorder.append(&visitor_id, record)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(visitor_id = %user.id, error = %e, "Failed to record visit"),
        Err(e) => tracing::error!("Task panicked: {}", e),
    }

    let join_token = state.join_guild.then_some(token.access_token);
    if let Err(e) = state
        .relay
        .enqueue_verification(message, user.id.clone(), join_token)
    {
        tracing::error!(error = %e, "Could not queue notifications");
    }

    tracing::info!(visitor_id = %user.id, ip = %ip, "Visitor verified");
    Ok(user)
}

fn success_page(user: &User) -> String {
    let name = escape_html(user.global_name.as_deref().unwrap_or(&user.username));
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Verified</title></head>\
         <body><h1>Verification complete</h1><p>Thanks, {name}. You can close this page.</p></body></html>"
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
