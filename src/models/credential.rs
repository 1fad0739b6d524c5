use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::sold_logins;

/// A WiFi login sold to a customer
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = sold_logins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SoldLogin {
    pub id: Uuid,
    pub plan_type: String,
    pub username: String,
    pub password: String,
    pub is_assigned: bool,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The username/password pair handed to the payer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Row returned by `process_transaction_and_delete_login`.
/// Credentials are NULL when a replayed reference belongs to another email.
#[derive(Debug, QueryableByName)]
pub struct AllocationRow {
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Varchar>)]
    pub username: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Varchar>)]
    pub password: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Bool)]
    pub replayed: bool,
}

impl From<SoldLogin> for Credentials {
    fn from(login: SoldLogin) -> Self {
        Self {
            username: login.username,
            password: login.password,
        }
    }
}
