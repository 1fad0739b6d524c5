use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SoldLogin;
use crate::schema::{sold_logins, transactions};

diesel::define_sql_function! {
    /// SQL `LOWER()`
    fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

/// A processed payment. `amount` is in currency subunits as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transaction {
    pub id: Uuid,
    pub payment_reference: String,
    pub customer_email: String,
    pub plan_type: String,
    pub amount: i64,
    pub login_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub async fn find_by_reference(
        conn: &mut AsyncPgConnection,
        reference: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::transactions::dsl;

        dsl::transactions
            .filter(dsl::payment_reference.eq(reference))
            .select(Transaction::as_select())
            .first::<Self>(conn)
            .await
            .optional()
    }

    /// Latest transaction recorded for `email` at or after `since`
    pub async fn find_recent_for_email(
        conn: &mut AsyncPgConnection,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::transactions::dsl;

        dsl::transactions
            .filter(lower(dsl::customer_email).eq(email.to_lowercase()))
            .filter(dsl::created_at.ge(since))
            .order(dsl::created_at.desc())
            .select(Transaction::as_select())
            .first::<Self>(conn)
            .await
            .optional()
    }

    /// Transaction and its login, matched on reference and (case-insensitive) email
    pub async fn find_with_login(
        conn: &mut AsyncPgConnection,
        reference: &str,
        email: &str,
    ) -> Result<Option<(Self, SoldLogin)>, diesel::result::Error> {
        let found = transactions::table
            .inner_join(sold_logins::table)
            .filter(transactions::payment_reference.eq(reference))
            .select((Transaction::as_select(), SoldLogin::as_select()))
            .first::<(Self, SoldLogin)>(conn)
            .await
            .optional()?;

        Ok(found.filter(|(tx, _)| tx.customer_email.eq_ignore_ascii_case(email)))
    }
}
