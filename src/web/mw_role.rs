//! Role selection middleware for route groups that use the backing store.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::ctx::Ctx;
use crate::gateway::SessionGateway;
use crate::prelude::*;

/// Ordered roles a route group accepts, first match wins.
#[derive(Clone)]
pub struct PermittedRoles {
    gateway: SessionGateway,
    roles: Arc<[&'static str]>,
}

impl PermittedRoles {
    pub fn new(gateway: SessionGateway, roles: impl Into<Arc<[&'static str]>>) -> Self {
        Self {
            gateway,
            roles: roles.into(),
        }
    }
}

/// Binds the first permitted role the requestor holds and stores the
/// [`RoleBinding`](crate::role::selector::RoleBinding) for the handler.
pub async fn mw_select_role(
    State(permitted): State<PermittedRoles>,
    ctx: Ctx,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let binding = permitted
        .gateway
        .select_role(&permitted.roles, ctx.identity())
        .await?;
    debug!("{} {} bound to role '{}'", req.method(), req.uri().path(), binding.role);
    req.extensions_mut().insert(binding);
    Ok(next.run(req).await)
}

/// Builds a [`mw_select_role`] layer from a gateway and an ordered role list.
///
/// ```rust,ignore
/// Router::new()
///     .route("/v1/contributors/{user_name}", get(get_contributor))
///     .route_layer(permit_roles!(gateway, ["contributors", "default"]));
/// ```
#[macro_export]
macro_rules! permit_roles {
    ($gateway:expr, [$($role:expr),+ $(,)?]) => {{
        use $crate::web::mw_role::{PermittedRoles, mw_select_role};
        axum::middleware::from_fn_with_state(
            PermittedRoles::new($gateway, [$($role),+]),
            mw_select_role,
        )
    }};
}
