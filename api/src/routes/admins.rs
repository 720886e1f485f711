use std::collections::{HashMap, HashSet};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
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
        .route("/v1/admins", post(create_admin).get(list_admins))
        .route(
            "/v1/admins/{id}/agents",
            get(get_admin_agents).put(assign_admin_agents),
        )
}

/// Admin management is reserved for global-scope admins; tenant admins
/// manage agents, not other admins.
async fn require_global(pool: &sqlx::PgPool, admin: &Principal) -> Result<(), AppError> {
    match scope::admin_scope(pool, admin.id).await? {
        AdminScope::Global => Ok(()),
        AdminScope::Scoped => Err(AppError::forbidden("Global admin privileges required")),
    }
}

// ──────────────────────────────────────────────
// POST /v1/admins
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    /// `global` admins see every agent; `scoped` admins see only their
    /// assigned set. Defaults to scoped.
    #[serde(default = "default_scope")]
    pub scope: AdminScope,
    #[serde(default)]
    pub assigned_agents: Vec<Uuid>,
}

fn default_scope() -> AdminScope {
    AdminScope::Scoped
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AdminSummary {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub scope: AdminScope,
    pub assigned_agents: Vec<Agent>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateAdminResponse {
    pub success: bool,
    pub message: String,
    pub admin: AdminSummary,
}

#[utoipa::path(
    post,
    path = "/v1/admins",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = CreateAdminResponse),
        (status = 400, description = "Missing fields or invalid agent ids", body = rota_core::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = rota_core::error::ErrorResponse),
        (status = 403, description = "Requester is not a global admin", body = rota_core::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = rota_core::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admins"
)]
pub async fn create_admin(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<CreateAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    let requester = require_admin(user.0.as_ref())?;
    require_global(&state.db, requester).await?;

    let admin = insert_admin_record(&state.db, &req).await?;

    tracing::info!(requester_id = %requester.id, admin_id = %admin.id, scope = %req.scope.as_str(), "admin created");

    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            success: true,
            message: "Admin created successfully".to_string(),
            admin,
        }),
    ))
}

pub(crate) async fn insert_admin_record(
    pool: &sqlx::PgPool,
    req: &CreateAdminRequest,
) -> Result<AdminSummary, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::invalid_input("Email and password are required"));
    }
    if req.scope == AdminScope::Global && !req.assigned_agents.is_empty() {
        return Err(AppError::invalid_input(
            "Global admins already see every agent; omit assigned_agents",
        ));
    }

    // Every referenced id must be an existing agent account.
    if !req.assigned_agents.is_empty() {
        let known: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts WHERE id = ANY($1) AND role = 'agent'",
        )
        .bind(&req.assigned_agents)
        .fetch_one(pool)
        .await?;
        if known != req.assigned_agents.len() as i64 {
            return Err(AppError::invalid_input(
                "One or more assigned agent IDs are invalid",
            ));
        }
    }

    let password_hash = auth::hash_password(&req.password)?;
    let admin_id = Uuid::now_v7();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO accounts (id, email, password_hash, role, scope, name) \
         VALUES ($1, $2, $3, 'admin', $4, $5)",
    )
    .bind(admin_id)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(req.scope.as_str())
    .bind(&req.name)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("Admin with this email already exists")
        } else {
            AppError::Database(e)
        }
    })?;

    for (position, agent_id) in req.assigned_agents.iter().enumerate() {
        sqlx::query(
            "INSERT INTO agent_assignments (admin_id, agent_id, position) VALUES ($1, $2, $3)",
        )
        .bind(admin_id)
        .bind(agent_id)
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let assigned_agents = match req.scope {
        AdminScope::Scoped => scope::agents_for_scoped(pool, admin_id).await?,
        AdminScope::Global => Vec::new(),
    };

    Ok(AdminSummary {
        id: admin_id,
        email: req.email.clone(),
        name: req.name.clone(),
        scope: req.scope,
        assigned_agents,
    })
}

// ──────────────────────────────────────────────
// GET /v1/admins
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AdminsResponse {
    pub success: bool,
    pub admins: Vec<AdminSummary>,
}

#[utoipa::path(
    get,
    path = "/v1/admins",
    responses(
        (status = 200, description = "All admins with their assigned agents", body = AdminsResponse),
        (status = 401, description = "Not authenticated", body = rota_core::error::ErrorResponse),
        (status = 403, description = "Requester is not a global admin", body = rota_core::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admins"
)]
pub async fn list_admins(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<AdminsResponse>, AppError> {
    let requester = require_admin(user.0.as_ref())?;
    require_global(&state.db, requester).await?;

    let rows = sqlx::query_as::<_, AdminRow>(
        "SELECT id, email, name, scope FROM accounts WHERE role = 'admin' ORDER BY created_at, id",
    )
    .fetch_all(&state.db)
    .await?;

    // One pass over all assignments, grouped per admin in position order.
    let assigned = sqlx::query_as::<_, AssignedRow>(
        "SELECT ga.admin_id, a.id, a.email, a.name, a.mobile \
         FROM agent_assignments ga \
         JOIN accounts a ON a.id = ga.agent_id \
         WHERE a.role = 'agent' \
         ORDER BY ga.admin_id, ga.position",
    )
    .fetch_all(&state.db)
    .await?;

    let mut by_admin: HashMap<Uuid, Vec<Agent>> = HashMap::new();
    for row in assigned {
        by_admin.entry(row.admin_id).or_default().push(Agent {
            id: row.id,
            email: row.email,
            name: row.name,
            mobile: row.mobile,
        });
    }

    let admins = rows
        .into_iter()
        .map(|row| {
            let scope = row
                .scope
                .parse::<AdminScope>()
                .map_err(AppError::Internal)?;
            Ok(AdminSummary {
                assigned_agents: by_admin.remove(&row.id).unwrap_or_default(),
                id: row.id,
                email: row.email,
                name: row.name,
                scope,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Json(AdminsResponse {
        success: true,
        admins,
    }))
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    scope: String,
}

#[derive(sqlx::FromRow)]
struct AssignedRow {
    admin_id: Uuid,
    id: Uuid,
    email: String,
    name: Option<String>,
    mobile: Option<String>,
}

// ──────────────────────────────────────────────
// GET /v1/admins/{id}/agents
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AdminAgentsResponse {
    pub success: bool,
    pub agents: Vec<Agent>,
}

#[utoipa::path(
    get,
    path = "/v1/admins/{id}/agents",
    params(("id" = Uuid, Path, description = "Admin id")),
    responses(
        (status = 200, description = "Agents visible to the admin", body = AdminAgentsResponse),
        (status = 401, description = "Not authenticated", body = rota_core::error::ErrorResponse),
        (status = 403, description = "Scoped admins may only view their own agents", body = rota_core::error::ErrorResponse),
        (status = 404, description = "No such admin", body = rota_core::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admins"
)]
pub async fn get_admin_agents(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminAgentsResponse>, AppError> {
    let requester = require_admin(user.0.as_ref())?;
    if requester.id != id {
        require_global(&state.db, requester).await?;
    }

    let agents = admin_agents(&state.db, id).await?;
    Ok(Json(AdminAgentsResponse {
        success: true,
        agents,
    }))
}

/// The agents a given admin sees: the full roster for global admins, the
/// assignment set for scoped ones. `NotFound` for unknown ids.
pub(crate) async fn admin_agents(pool: &sqlx::PgPool, id: Uuid) -> Result<Vec<Agent>, AppError> {
    let scope: Option<String> =
        sqlx::query_scalar("SELECT scope FROM accounts WHERE id = $1 AND role = 'admin'")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    let scope = scope
        .ok_or_else(|| AppError::not_found("Admin"))?
        .parse::<AdminScope>()
        .map_err(AppError::Internal)?;

    match scope {
        AdminScope::Global => scope::all_agents(pool).await,
        AdminScope::Scoped => scope::agents_for_scoped(pool, id).await,
    }
}

// ──────────────────────────────────────────────
// PUT /v1/admins/{id}/agents
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AssignAgentsRequest {
    pub agent_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AssignAgentsResponse {
    pub success: bool,
    pub message: String,
    /// The ids actually assigned, in order. Ids that did not reference an
    /// existing agent were dropped.
    pub assigned_agents: Vec<Uuid>,
}

#[utoipa::path(
    put,
    path = "/v1/admins/{id}/agents",
    params(("id" = Uuid, Path, description = "Admin id")),
    request_body = AssignAgentsRequest,
    responses(
        (status = 200, description = "Assignment set replaced", body = AssignAgentsResponse),
        (status = 400, description = "Target admin is global-scope", body = rota_core::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = rota_core::error::ErrorResponse),
        (status = 403, description = "Requester is not a global admin", body = rota_core::error::ErrorResponse),
        (status = 404, description = "No such admin", body = rota_core::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admins"
)]
pub async fn assign_admin_agents(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<AssignAgentsRequest>,
) -> Result<Json<AssignAgentsResponse>, AppError> {
    let requester = require_admin(user.0.as_ref())?;
    require_global(&state.db, requester).await?;

    let assigned = replace_assignments(&state.db, id, &req.agent_ids).await?;

    tracing::info!(requester_id = %requester.id, admin_id = %id, count = assigned.len(), "agents assigned");

    Ok(Json(AssignAgentsResponse {
        success: true,
        message: "Agents assigned successfully".to_string(),
        assigned_agents: assigned,
    }))
}

/// Replace a scoped admin's assignment set. Ids that do not reference an
/// existing agent account are silently dropped; order is preserved and
/// duplicates keep their first occurrence.
pub(crate) async fn replace_assignments(
    pool: &sqlx::PgPool,
    admin_id: Uuid,
    agent_ids: &[Uuid],
) -> Result<Vec<Uuid>, AppError> {
    let scope: Option<String> =
        sqlx::query_scalar("SELECT scope FROM accounts WHERE id = $1 AND role = 'admin'")
            .bind(admin_id)
            .fetch_optional(pool)
            .await?;
    let scope = scope
        .ok_or_else(|| AppError::not_found("Admin"))?
        .parse::<AdminScope>()
        .map_err(AppError::Internal)?;
    if scope == AdminScope::Global {
        return Err(AppError::invalid_input(
            "Global admins already see every agent",
        ));
    }

    let known: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM accounts WHERE id = ANY($1) AND role = 'agent'",
    )
    .bind(agent_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let mut seen = HashSet::new();
    let valid: Vec<Uuid> = agent_ids
        .iter()
        .copied()
        .filter(|id| known.contains(id) && seen.insert(*id))
        .collect();

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM agent_assignments WHERE admin_id = $1")
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;
    for (position, agent_id) in valid.iter().enumerate() {
        sqlx::query(
            "INSERT INTO agent_assignments (admin_id, agent_id, position) VALUES ($1, $2, $3)",
        )
        .bind(admin_id)
        .bind(agent_id)
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(valid)
}
