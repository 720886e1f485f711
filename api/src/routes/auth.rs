use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rota_core::auth;
use rota_core::principal::{Principal, Role};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/auth/login", post(login))
}

// ──────────────────────────────────────────────
// POST /v1/auth/login
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    /// Bearer token for subsequent requests, valid 24 hours.
    pub token: String,
    pub user: Principal,
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = rota_core::error::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = rota_core::error::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::invalid_input("Email and password are required"));
    }

    let principal = authenticate(&state.db, &req.email, &req.password).await?;
    let token = state.tokens.issue(&principal)?;

    tracing::info!(account_id = %principal.id, role = %principal.role, "login");

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: principal,
    }))
}

/// Verify credentials and build the principal a token will carry. Scoped
/// admins get their assigned agent ids embedded; the same "Invalid
/// credentials" failure covers unknown emails and bad passwords.
pub(crate) async fn authenticate(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
) -> Result<Principal, AppError> {
    let account = sqlx::query_as::<_, AccountRow>(
        "SELECT id, email, password_hash, role, scope, name FROM accounts WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::unauthenticated("Invalid credentials"))?;

    if !auth::verify_password(password, &account.password_hash)? {
        return Err(AppError::unauthenticated("Invalid credentials"));
    }

    let role: Role = account.role.parse().map_err(AppError::Internal)?;

    let assigned_agents = match account.scope.as_deref() {
        Some("scoped") => Some(
            sqlx::query_scalar::<_, Uuid>(
                "SELECT agent_id FROM agent_assignments WHERE admin_id = $1 ORDER BY position",
            )
            .bind(account.id)
            .fetch_all(pool)
            .await?,
        ),
        _ => None,
    };

    Ok(Principal {
        id: account.id,
        email: account.email,
        role,
        name: account.name,
        assigned_agents,
    })
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    scope: Option<String>,
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use rota_core::error::Error;
    use rota_core::principal::AdminScope;
    use uuid::Uuid;

    use super::authenticate;
    use crate::error::AppError;
    use crate::test_support::{db_pool_if_available, insert_agent, unique_email};

    async fn insert_login_admin(
        pool: &sqlx::PgPool,
        email: &str,
        password: &str,
        scope: AdminScope,
        agents: &[Uuid],
    ) -> Uuid {
        let id = Uuid::now_v7();
        let hash = rota_core::auth::hash_password(password).unwrap();
        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, role, scope, name) \
             VALUES ($1, $2, $3, 'admin', $4, 'Admin User')",
        )
        .bind(id)
        .bind(email)
        .bind(&hash)
        .bind(scope.as_str())
        .execute(pool)
        .await
        .expect("insert admin");

        for (position, agent_id) in agents.iter().enumerate() {
            sqlx::query(
                "INSERT INTO agent_assignments (admin_id, agent_id, position) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(agent_id)
            .bind(position as i32)
            .execute(pool)
            .await
            .expect("insert assignment");
        }
        id
    }

    #[tokio::test]
    async fn scoped_admin_login_embeds_assigned_agents() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let a1 = insert_agent(&pool, &unique_email("agent"), "One").await;
        let a2 = insert_agent(&pool, &unique_email("agent"), "Two").await;
        let email = unique_email("login-admin");
        let id = insert_login_admin(&pool, &email, "hunter2hunter2", AdminScope::Scoped, &[a1, a2])
            .await;

        let principal = authenticate(&pool, &email, "hunter2hunter2").await.unwrap();
        assert_eq!(principal.id, id);
        assert_eq!(principal.assigned_agents, Some(vec![a1, a2]));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let email = unique_email("login-admin");
        insert_login_admin(&pool, &email, "hunter2hunter2", AdminScope::Global, &[]).await;

        match authenticate(&pool, &email, "wrong").await {
            Err(AppError::Domain(Error::NotAuthenticated(msg))) => {
                assert_eq!(msg, "Invalid credentials");
            }
            other => panic!("expected NotAuthenticated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_email_is_invalid_credentials() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        match authenticate(&pool, &unique_email("nobody"), "whatever").await {
            Err(AppError::Domain(Error::NotAuthenticated(_))) => {}
            other => panic!("expected NotAuthenticated, got {other:?}"),
        }
    }
}
