use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rota_core::auth;
use rota_core::gate::require_admin;
use rota_core::principal::{AdminScope, Principal};

use crate::auth::CurrentUser;
use crate::error::{AppError, is_unique_violation};
use crate::extract::AppJson;
use crate::scope::{self, Agent};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/agents", post(create_agent).get(list_agents))
        .route("/v1/agents/{id}", delete(delete_agent))
}

// ──────────────────────────────────────────────
// POST /v1/agents
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateAgentRequest {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateAgentResponse {
    pub success: bool,
    pub agent: Agent,
}

#[utoipa::path(
    post,
    path = "/v1/agents",
    request_body = CreateAgentRequest,
    responses(
        (status = 201, description = "Agent created", body = CreateAgentResponse),
        (status = 400, description = "Missing fields", body = rota_core::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = rota_core::error::ErrorResponse),
        (status = 403, description = "Not an admin", body = rota_core::error::ErrorResponse),
        (status = 409, description = "Email already in use", body = rota_core::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "agents"
)]
pub async fn create_agent(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<CreateAgentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin = require_admin(user.0.as_ref())?;
    let agent = insert_agent_record(&state.db, admin, &req).await?;

    tracing::info!(admin_id = %admin.id, agent_id = %agent.id, "agent created");

    Ok((
        StatusCode::CREATED,
        Json(CreateAgentResponse {
            success: true,
            agent,
        }),
    ))
}

/// Create the agent account and, for a scoped requester, append it to the
/// requester's assignment set in the same transaction. A duplicate email
/// leaves the assignment set untouched.
pub(crate) async fn insert_agent_record(
    pool: &sqlx::PgPool,
    admin: &Principal,
    req: &CreateAgentRequest,
) -> Result<Agent, AppError> {
    if req.name.is_empty() || req.email.is_empty() || req.mobile.is_empty() || req.password.is_empty()
    {
        return Err(AppError::invalid_input("All fields are required"));
    }

    let requester_scope = scope::admin_scope(pool, admin.id).await?;
    let password_hash = auth::hash_password(&req.password)?;
    let agent_id = Uuid::now_v7();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO accounts (id, email, password_hash, role, name, mobile) \
         VALUES ($1, $2, $3, 'agent', $4, $5)",
    )
    .bind(agent_id)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.name)
    .bind(&req.mobile)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("Email already in use")
        } else {
            AppError::Database(e)
        }
    })?;

    if requester_scope == AdminScope::Scoped {
        sqlx::query(
            "INSERT INTO agent_assignments (admin_id, agent_id, position) \
             SELECT $1, $2, COALESCE(MAX(position) + 1, 0) \
             FROM agent_assignments WHERE admin_id = $1",
        )
        .bind(admin.id)
        .bind(agent_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Agent {
        id: agent_id,
        email: req.email.clone(),
        name: Some(req.name.clone()),
        mobile: Some(req.mobile.clone()),
    })
}

// ──────────────────────────────────────────────
// GET /v1/agents
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AgentsResponse {
    pub success: bool,
    pub agents: Vec<Agent>,
}

#[utoipa::path(
    get,
    path = "/v1/agents",
    responses(
        (status = 200, description = "Agents visible to the requesting admin", body = AgentsResponse),
        (status = 401, description = "Not authenticated", body = rota_core::error::ErrorResponse),
        (status = 403, description = "Not an admin", body = rota_core::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "agents"
)]
pub async fn list_agents(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<AgentsResponse>, AppError> {
    let admin = require_admin(user.0.as_ref())?;
    let agents = scope::resolve_agents(&state.db, admin).await?;
    Ok(Json(AgentsResponse {
        success: true,
        agents,
    }))
}

// ──────────────────────────────────────────────
// DELETE /v1/agents/{id}
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AgentDeletedResponse {
    pub success: bool,
}

#[utoipa::path(
    delete,
    path = "/v1/agents/{id}",
    params(("id" = Uuid, Path, description = "Agent id to delete")),
    responses(
        (status = 200, description = "Agent deleted", body = AgentDeletedResponse),
        (status = 401, description = "Not authenticated", body = rota_core::error::ErrorResponse),
        (status = 403, description = "Agent outside the requester's scope", body = rota_core::error::ErrorResponse),
        (status = 404, description = "No such agent", body = rota_core::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "agents"
)]
pub async fn delete_agent(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentDeletedResponse>, AppError> {
    let admin = require_admin(user.0.as_ref())?;
    delete_agent_record(&state.db, admin, id).await?;

    tracing::info!(admin_id = %admin.id, agent_id = %id, "agent deleted");

    Ok(Json(AgentDeletedResponse { success: true }))
}

/// Delete an agent account. Scoped requesters may only delete agents in
/// their own scope. The foreign keys cascade: the deleted agent leaves
/// every admin's assignment set and takes its list items with it.
pub(crate) async fn delete_agent_record(
    pool: &sqlx::PgPool,
    admin: &Principal,
    agent_id: Uuid,
) -> Result<(), AppError> {
    if scope::admin_scope(pool, admin.id).await? == AdminScope::Scoped {
        let assigned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM agent_assignments WHERE admin_id = $1 AND agent_id = $2)",
        )
        .bind(admin.id)
        .bind(agent_id)
        .fetch_one(pool)
        .await?;

        if !assigned {
            return Err(AppError::forbidden(
                "You don't have permission to delete this agent",
            ));
        }
    }

    let result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND role = 'agent'")
        .bind(agent_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Agent"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rota_core::error::Error;
    use rota_core::principal::AdminScope;
    use uuid::Uuid;

    use super::{CreateAgentRequest, delete_agent_record, insert_agent_record};
    use crate::error::AppError;
    use crate::scope;
    use crate::test_support::{db_pool_if_available, insert_admin, insert_agent, unique_email};

    fn agent_request(email: &str) -> CreateAgentRequest {
        CreateAgentRequest {
            name: "New Agent".to_string(),
            email: email.to_string(),
            mobile: "555-0100".to_string(),
            password: "agent-password".to_string(),
        }
    }

    #[tokio::test]
    async fn scoped_creation_appends_to_the_assignment_set() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let existing = insert_agent(&pool, &unique_email("agent"), "Existing").await;
        let admin = insert_admin(
            &pool,
            &unique_email("scoped-admin"),
            AdminScope::Scoped,
            &[existing],
        )
        .await;

        let created = insert_agent_record(&pool, &admin, &agent_request(&unique_email("fresh")))
            .await
            .unwrap();

        let agents = scope::resolve_agents(&pool, &admin).await.unwrap();
        let ids: Vec<_> = agents.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![existing, created.id]);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_leaves_assignments_untouched() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let taken = unique_email("taken");
        let existing = insert_agent(&pool, &taken, "Existing").await;
        let admin = insert_admin(
            &pool,
            &unique_email("scoped-admin"),
            AdminScope::Scoped,
            &[existing],
        )
        .await;

        match insert_agent_record(&pool, &admin, &agent_request(&taken)).await {
            Err(AppError::Domain(Error::Conflict(_))) => {}
            other => panic!("expected Conflict, got {other:?}"),
        }

        let agents = scope::resolve_agents(&pool, &admin).await.unwrap();
        assert_eq!(agents.len(), 1, "assignment set must be unchanged");
    }

    #[tokio::test]
    async fn scoped_admin_cannot_delete_an_unassigned_agent() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let outsider = insert_agent(&pool, &unique_email("outsider"), "Outsider").await;
        let admin =
            insert_admin(&pool, &unique_email("scoped-admin"), AdminScope::Scoped, &[]).await;

        match delete_agent_record(&pool, &admin, outsider).await {
            Err(AppError::Domain(Error::Forbidden(_))) => {}
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deleting_an_agent_cascades_out_of_every_scope() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let shared = insert_agent(&pool, &unique_email("shared"), "Shared").await;
        let owner = insert_admin(
            &pool,
            &unique_email("owner"),
            AdminScope::Scoped,
            &[shared],
        )
        .await;
        let global =
            insert_admin(&pool, &unique_email("global"), AdminScope::Global, &[]).await;

        delete_agent_record(&pool, &global, shared).await.unwrap();

        let agents = scope::resolve_agents(&pool, &owner).await.unwrap();
        assert!(agents.is_empty(), "cascade must clear the assignment");
    }

    #[tokio::test]
    async fn deleting_an_unknown_agent_is_not_found() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let global =
            insert_admin(&pool, &unique_email("global"), AdminScope::Global, &[]).await;

        match delete_agent_record(&pool, &global, Uuid::now_v7()).await {
            Err(AppError::Domain(Error::NotFound(_))) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
