use std::collections::HashMap;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rota_core::distribution::share_counts;
use rota_core::error::Error;
use rota_core::gate::require_admin;
use rota_core::principal::Principal;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::scope;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/lists", get(list_distributed))
        .route("/v1/lists/distribute", post(distribute_list))
}

// ──────────────────────────────────────────────
// POST /v1/lists/distribute
// ──────────────────────────────────────────────

/// One imported contact row. The upload collaborator has already parsed the
/// file and validated the required columns.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ListRow {
    pub first_name: String,
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DistributeRequest {
    pub rows: Vec<ListRow>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DistributeResponse {
    pub success: bool,
    pub message: String,
    pub item_count: usize,
    pub agent_count: usize,
}

#[utoipa::path(
    post,
    path = "/v1/lists/distribute",
    request_body = DistributeRequest,
    responses(
        (status = 200, description = "Rows distributed across the admin's agents", body = DistributeResponse),
        (status = 400, description = "Empty row set, or no agents in scope", body = rota_core::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = rota_core::error::ErrorResponse),
        (status = 403, description = "Not an admin", body = rota_core::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "lists"
)]
pub async fn distribute_list(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<DistributeRequest>,
) -> Result<Json<DistributeResponse>, AppError> {
    let admin = require_admin(user.0.as_ref())?;
    let (item_count, agent_count) = run_distribution(&state.db, admin, &req.rows).await?;

    tracing::info!(admin_id = %admin.id, item_count, agent_count, "list distributed");

    Ok(Json(DistributeResponse {
        success: true,
        message: format!("{item_count} items distributed among {agent_count} agents"),
        item_count,
        agent_count,
    }))
}

/// One distribution run: resolve the scope, replace every list item
/// belonging to it, and hand out the rows in contiguous blocks per the
/// plan. Delete and inserts share a transaction; a failed run leaves the
/// previous distribution in place, and concurrent runs against the same
/// scope serialize at the store instead of interleaving.
pub(crate) async fn run_distribution(
    pool: &sqlx::PgPool,
    admin: &Principal,
    rows: &[ListRow],
) -> Result<(usize, usize), AppError> {
    if rows.is_empty() {
        return Err(AppError::invalid_input("rows must not be empty"));
    }

    let agents = scope::resolve_agents(pool, admin).await?;
    if agents.is_empty() {
        return Err(Error::NoAgents.into());
    }

    let counts = share_counts(rows.len(), agents.len());
    let agent_ids: Vec<Uuid> = agents.iter().map(|a| a.id).collect();

    let mut tx = pool.begin().await?;

    // Full replace for this scope only; items of out-of-scope agents stay.
    sqlx::query("DELETE FROM list_items WHERE assigned_to = ANY($1)")
        .bind(&agent_ids)
        .execute(&mut *tx)
        .await?;

    let mut next = 0usize;
    for (agent, count) in agents.iter().zip(counts.iter()) {
        for row in &rows[next..next + count] {
            sqlx::query(
                "INSERT INTO list_items (id, first_name, phone, notes, assigned_to) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::now_v7())
            .bind(&row.first_name)
            .bind(&row.phone)
            .bind(&row.notes)
            .bind(agent.id)
            .execute(&mut *tx)
            .await?;
        }
        next += count;
    }

    tx.commit().await?;

    Ok((rows.len(), agents.len()))
}

// ──────────────────────────────────────────────
// GET /v1/lists
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ListItemResponse {
    pub id: Uuid,
    pub first_name: String,
    pub phone: String,
    pub notes: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AgentListGroup {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub items: Vec<ListItemResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ListsResponse {
    pub success: bool,
    pub agents: Vec<AgentListGroup>,
}

#[utoipa::path(
    get,
    path = "/v1/lists",
    responses(
        (status = 200, description = "Distributed items grouped per agent, in scope order", body = ListsResponse),
        (status = 401, description = "Not authenticated", body = rota_core::error::ErrorResponse),
        (status = 403, description = "Not an admin", body = rota_core::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "lists"
)]
pub async fn list_distributed(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ListsResponse>, AppError> {
    let admin = require_admin(user.0.as_ref())?;
    let agents = collect_distributed(&state.db, admin).await?;
    Ok(Json(ListsResponse {
        success: true,
        agents,
    }))
}

pub(crate) async fn collect_distributed(
    pool: &sqlx::PgPool,
    admin: &Principal,
) -> Result<Vec<AgentListGroup>, AppError> {
    let agents = scope::resolve_agents(pool, admin).await?;
    let agent_ids: Vec<Uuid> = agents.iter().map(|a| a.id).collect();

    let items = sqlx::query_as::<_, ItemRow>(
        "SELECT id, first_name, phone, notes, assigned_to FROM list_items \
         WHERE assigned_to = ANY($1) ORDER BY created_at, id",
    )
    .bind(&agent_ids)
    .fetch_all(pool)
    .await?;

    let mut by_agent: HashMap<Uuid, Vec<ListItemResponse>> = HashMap::new();
    for item in items {
        by_agent
            .entry(item.assigned_to)
            .or_default()
            .push(ListItemResponse {
                id: item.id,
                first_name: item.first_name,
                phone: item.phone,
                notes: item.notes,
            });
    }

    Ok(agents
        .into_iter()
        .map(|agent| AgentListGroup {
            items: by_agent.remove(&agent.id).unwrap_or_default(),
            id: agent.id,
            email: agent.email,
            name: agent.name,
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    first_name: String,
    phone: String,
    notes: String,
    assigned_to: Uuid,
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rota_core::error::Error;
    use rota_core::principal::AdminScope;

    use super::{ListRow, collect_distributed, run_distribution};
    use crate::error::AppError;
    use crate::test_support::{db_pool_if_available, insert_admin, insert_agent, unique_email};

    fn rows(n: usize) -> Vec<ListRow> {
        (0..n)
            .map(|i| ListRow {
                first_name: format!("contact-{i}"),
                phone: format!("555-01{i:02}"),
                notes: String::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn ten_rows_across_three_agents_split_4_3_3_in_scope_order() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let a1 = insert_agent(&pool, &unique_email("agent"), "A1").await;
        let a2 = insert_agent(&pool, &unique_email("agent"), "A2").await;
        let a3 = insert_agent(&pool, &unique_email("agent"), "A3").await;
        let admin = insert_admin(
            &pool,
            &unique_email("admin"),
            AdminScope::Scoped,
            &[a1, a2, a3],
        )
        .await;

        let (item_count, agent_count) = run_distribution(&pool, &admin, &rows(10)).await.unwrap();
        assert_eq!((item_count, agent_count), (10, 3));

        let groups = collect_distributed(&pool, &admin).await.unwrap();
        let counts: Vec<usize> = groups.iter().map(|g| g.items.len()).collect();
        assert_eq!(counts, vec![4, 3, 3]);

        // Rows are handed out in contiguous blocks, input order first.
        let first_block: HashSet<String> =
            groups[0].items.iter().map(|i| i.first_name.clone()).collect();
        let expected: HashSet<String> = (0..4).map(|i| format!("contact-{i}")).collect();
        assert_eq!(first_block, expected);
    }

    #[tokio::test]
    async fn rerunning_replaces_the_previous_distribution() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let a1 = insert_agent(&pool, &unique_email("agent"), "A1").await;
        let a2 = insert_agent(&pool, &unique_email("agent"), "A2").await;
        let admin =
            insert_admin(&pool, &unique_email("admin"), AdminScope::Scoped, &[a1, a2]).await;

        run_distribution(&pool, &admin, &rows(10)).await.unwrap();
        run_distribution(&pool, &admin, &rows(4)).await.unwrap();

        let groups = collect_distributed(&pool, &admin).await.unwrap();
        let total: usize = groups.iter().map(|g| g.items.len()).sum();
        assert_eq!(total, 4, "second run replaces, never accumulates");
    }

    #[tokio::test]
    async fn items_outside_the_scope_survive_a_run() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let theirs = insert_agent(&pool, &unique_email("agent"), "Theirs").await;
        let other_admin =
            insert_admin(&pool, &unique_email("admin"), AdminScope::Scoped, &[theirs]).await;
        run_distribution(&pool, &other_admin, &rows(3)).await.unwrap();

        let mine = insert_agent(&pool, &unique_email("agent"), "Mine").await;
        let admin =
            insert_admin(&pool, &unique_email("admin"), AdminScope::Scoped, &[mine]).await;
        run_distribution(&pool, &admin, &rows(5)).await.unwrap();

        let other_groups = collect_distributed(&pool, &other_admin).await.unwrap();
        assert_eq!(other_groups[0].items.len(), 3, "other scope untouched");
    }

    #[tokio::test]
    async fn fewer_rows_than_agents_leaves_the_tail_empty() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let agents = [
            insert_agent(&pool, &unique_email("agent"), "A1").await,
            insert_agent(&pool, &unique_email("agent"), "A2").await,
            insert_agent(&pool, &unique_email("agent"), "A3").await,
            insert_agent(&pool, &unique_email("agent"), "A4").await,
            insert_agent(&pool, &unique_email("agent"), "A5").await,
        ];
        let admin =
            insert_admin(&pool, &unique_email("admin"), AdminScope::Scoped, &agents).await;

        run_distribution(&pool, &admin, &rows(2)).await.unwrap();

        let groups = collect_distributed(&pool, &admin).await.unwrap();
        let counts: Vec<usize> = groups.iter().map(|g| g.items.len()).collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 0]);
    }

    #[tokio::test]
    async fn empty_rows_fail_closed() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let a1 = insert_agent(&pool, &unique_email("agent"), "A1").await;
        let admin =
            insert_admin(&pool, &unique_email("admin"), AdminScope::Scoped, &[a1]).await;

        match run_distribution(&pool, &admin, &[]).await {
            Err(AppError::Domain(Error::InvalidInput(_))) => {}
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_scope_fails_with_no_agents() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let admin =
            insert_admin(&pool, &unique_email("admin"), AdminScope::Scoped, &[]).await;

        match run_distribution(&pool, &admin, &rows(3)).await {
            Err(AppError::Domain(Error::NoAgents)) => {}
            other => panic!("expected NoAgents, got {other:?}"),
        }
    }
}
