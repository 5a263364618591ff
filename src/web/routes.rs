use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::get,
};
use serde::Serialize;
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use super::AppState;
use super::ctx::Ctx;
use super::mw_session::mw_session_reviver;
use crate::auth::csrf::CSRF_HEADER;
use crate::auth::identity::Identity;
use crate::db::ProfileFilter;
use crate::db::contributor::Contributor;
use crate::gateway::{Credentials, LogoutOutcome};
use crate::permit_roles;
use crate::prelude::*;
use crate::role::registry::DEFAULT_ROLE;
use crate::role::selector::RoleBinding;

fn v1(path: &str) -> String {
    format!("/v1/{path}")
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub identity: Option<Identity>,
}

#[derive(Debug, Serialize)]
pub struct LoginReply {
    pub contributor: Contributor,
    pub roles: Vec<String>,
}

fn csrf_header(token: Option<String>) -> AppendHeaders<Option<(&'static str, String)>> {
    AppendHeaders(token.map(|token| (CSRF_HEADER, token)))
}

/// The gateway's own routes, without the session layers.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let contributor_routes = Router::new()
        .route(&v1("contributors/{user_name}"), get(get_contributor))
        .route_layer(permit_roles!(
            state.gateway.clone(),
            ["contributors", DEFAULT_ROLE]
        ));

    let session_routes = Router::new().route(
        &v1("session"),
        get(get_session).post(login).delete(logout),
    );

    Router::new().merge(session_routes).merge(contributor_routes)
}

/// Wraps `routes` in the session, CORS and tracing layers.
///
/// Applications add their own role-guarded routes by merging them into
/// [`api_routes`] before calling this.
pub fn app(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw_session_reviver,
        ))
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

pub fn router(state: AppState) -> Router {
    app(api_routes(&state), state)
}

async fn get_session(
    State(state): State<AppState>,
    cookies: Cookies,
    ctx: Ctx,
) -> Result<impl IntoResponse> {
    let established = state
        .gateway
        .establish_session(ctx.revival().clone())
        .await?;
    if established.created {
        state.cookie.set(&cookies, &established.session.id);
    }

    let status = SessionStatus {
        authenticated: !established.session.is_anonymous(),
        identity: established.session.identity,
    };
    Ok((csrf_header(established.csrf_token), Json(status)))
}

async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    ctx: Ctx,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse> {
    let outcome = state.gateway.login(ctx.claims(), &credentials).await?;
    state.cookie.set(&cookies, &outcome.session.id);

    let mut roles: Vec<String> = outcome.identity.roles.into_iter().collect();
    roles.sort();
    let reply = LoginReply {
        contributor: outcome.contributor,
        roles,
    };
    Ok((csrf_header(outcome.csrf_token), Json(reply)))
}

async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    ctx: Ctx,
) -> Result<StatusCode> {
    match state.gateway.logout(ctx.claims()).await? {
        LogoutOutcome::ResetContent { session_destroyed } => {
            if session_destroyed {
                state.cookie.remove(&cookies);
            }
            Ok(StatusCode::RESET_CONTENT)
        }
        LogoutOutcome::SessionNotFound => Ok(StatusCode::NO_CONTENT),
    }
}

async fn get_contributor(
    binding: RoleBinding,
    Path(user_name): Path<String>,
) -> Result<Json<Contributor>> {
    let filter = ProfileFilter::by_user_name(&user_name);
    Ok(Json(binding.store.get_unique_profile(&filter).await?))
}
