use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::schema::plans;

/// A purchasable access tier. `amount` is in major currency units (GHS).
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, ToSchema)]
#[diesel(table_name = plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Plan {
    pub plan_type: String,
    pub amount: i32,
    pub description: Option<String>,
    pub enabled: bool,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Price in the currency subunit the gateway charges in (pesewas)
    pub fn amount_minor(&self) -> i64 {
        i64::from(self.amount) * 100
    }

    pub async fn list_by_price(
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::plans::dsl;

        dsl::plans
            .select(Plan::as_select())
            .order(dsl::amount.asc())
            .load::<Self>(conn)
            .await
    }

    pub async fn find_by_type(
        conn: &mut AsyncPgConnection,
        plan_type: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::plans::dsl;

        dsl::plans
            .filter(dsl::plan_type.eq(plan_type))
            .select(Plan::as_select())
            .first::<Self>(conn)
            .await
            .optional()
    }
}
