use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;
use tracing::debug;

use super::AppState;
use super::ctx::Ctx;
use crate::auth::csrf::CSRF_HEADER;
use crate::gateway::Revival;
use crate::prelude::*;

/// Revives the session the request claims and stores the resulting [`Ctx`].
///
/// A failed CSRF check ends the request here. A cookie naming a session the
/// store no longer has is removed from the client.
pub async fn mw_session_reviver(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let claims = state.claims(&cookies, req.method(), req.headers());
    let mut revival = state.gateway.revive_session(&claims).await?;
    let mut issued_token = None;

    if state.create_unconditionally && !matches!(revival, Revival::Revived(_)) {
        let established = state.gateway.establish_session(revival).await?;
        state.cookie.set(&cookies, &established.session.id);
        issued_token = established.csrf_token;
        revival = Revival::Revived(established.session);
    } else if revival == Revival::Stale {
        debug!("Dropping cookie of unknown session");
        state.cookie.remove(&cookies);
    }

    req.extensions_mut().insert(Ctx::new(claims, revival));
    let mut response = next.run(req).await;

    if let Some(token) = issued_token {
        if !response.headers().contains_key(CSRF_HEADER) {
            if let Ok(value) = HeaderValue::from_str(&token) {
                response.headers_mut().insert(CSRF_HEADER, value);
            }
        }
    }
    Ok(response)
}
