use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::prelude::*;

/// Durable application-level profile of a directory account.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::contributor)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Contributor {
    pub id: Uuid,
    pub user_name: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contributor {
    pub fn fetch_by_user_name(target: &str, conn: &mut PgConnection) -> Result<Self> {
        use crate::schema::contributor::dsl::*;
        contributor
            .filter(user_name.eq(target))
            .select(Contributor::as_select())
            .first(conn)
            .optional()?
            .ok_or(Error::ProfileNotFound)
    }
}
