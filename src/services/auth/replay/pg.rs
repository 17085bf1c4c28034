use std::{future::Future, pin::Pin};

use sqlx::PgPool;

use crate::domain::ServiceToken;
use crate::services::auth::replay::store::{ReplayError, ServiceTokenStore};

/// Postgres replay store over the `service_tokens` table.
///
/// One statement decides: insert, or take over a row whose assertion has already
/// expired. `RETURNING` yields a row only when this call won. Expired rows of the
/// presenting tool are swept first so the table stays bounded.
#[derive(Clone, Debug)]
pub struct PgServiceTokenStore {
    pool: PgPool,
}

impl PgServiceTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ServiceTokenStore for PgServiceTokenStore {
    fn check_and_store<'a>(
        &'a self,
        token: &'a ServiceToken,
    ) -> Pin<Box<dyn Future<Output = Result<bool, ReplayError>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                "DELETE FROM service_tokens WHERE tool_client_id = $1 AND expires_at <= now()",
            )
            .bind(&token.tool_client_id)
            .execute(&self.pool)
            .await?;

            let row: Option<(String,)> = sqlx::query_as(
                r#"
                INSERT INTO service_tokens (tool_client_id, jti, expires_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (tool_client_id, jti) DO UPDATE
                    SET expires_at = EXCLUDED.expires_at,
                        created_at = now()
                    WHERE service_tokens.expires_at <= now()
                RETURNING jti
                "#,
            )
            .bind(&token.tool_client_id)
            .bind(&token.jti)
            .bind(token.expires_at)
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.is_some())
        })
    }
}
