//! Tenant scope resolution: which agent accounts a given admin may
//! see and manage.
//!
//! The branch point is the admin's `scope` column, resolved once here:
//! `global` admins see every agent, `scoped` admins see exactly the agents
//! in their `agent_assignments` set, in assignment order. The password hash
//! is never selected.

use rota_core::principal::{AdminScope, Principal};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// An agent account as exposed to admins. No credential material.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Agent {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
}

/// Resolve the set of agents `principal` is authorized to see/manage.
///
/// Fails `NotAuthenticated` when the principal's admin account no longer
/// exists: a token can outlive its account, and a stale token must never
/// fall through to global scope.
pub async fn resolve_agents(pool: &PgPool, principal: &Principal) -> Result<Vec<Agent>, AppError> {
    match admin_scope(pool, principal.id).await? {
        AdminScope::Global => all_agents(pool).await,
        AdminScope::Scoped => agents_for_scoped(pool, principal.id).await,
    }
}

/// Look up an admin account's scope. `NotAuthenticated` when no admin row
/// exists for the id.
pub(crate) async fn admin_scope(pool: &PgPool, admin_id: Uuid) -> Result<AdminScope, AppError> {
    let scope: Option<String> =
        sqlx::query_scalar("SELECT scope FROM accounts WHERE id = $1 AND role = 'admin'")
            .bind(admin_id)
            .fetch_optional(pool)
            .await?;

    let scope = scope.ok_or_else(|| AppError::unauthenticated("Admin account no longer exists"))?;
    scope.parse::<AdminScope>().map_err(AppError::Internal)
}

/// Every agent account, in creation order.
pub(crate) async fn all_agents(pool: &PgPool) -> Result<Vec<Agent>, AppError> {
    sqlx::query_as::<_, Agent>(
        "SELECT id, email, name, mobile FROM accounts \
         WHERE role = 'agent' ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await
    .map_err(AppError::Database)
}

/// A scoped admin's assigned agents, in assignment order. Re-filters to
/// `role = 'agent'`: a referenced account's role can change after assignment,
/// and such rows are silently dropped.
pub(crate) async fn agents_for_scoped(
    pool: &PgPool,
    admin_id: Uuid,
) -> Result<Vec<Agent>, AppError> {
    sqlx::query_as::<_, Agent>(
        "SELECT a.id, a.email, a.name, a.mobile \
         FROM agent_assignments ga \
         JOIN accounts a ON a.id = ga.agent_id \
         WHERE ga.admin_id = $1 AND a.role = 'agent' \
         ORDER BY ga.position",
    )
    .bind(admin_id)
    .fetch_all(pool)
    .await
    .map_err(AppError::Database)
}

#[cfg(test)]
mod tests {
    use rota_core::error::Error;
    use rota_core::principal::AdminScope;

    use super::resolve_agents;
    use crate::error::AppError;
    use crate::test_support::{db_pool_if_available, insert_admin, insert_agent, unique_email};

    #[tokio::test]
    async fn scoped_admin_sees_only_assigned_agents_in_order() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let first = insert_agent(&pool, &unique_email("agent-b"), "Agent B").await;
        let second = insert_agent(&pool, &unique_email("agent-a"), "Agent A").await;
        // An agent that exists but is never assigned to this admin.
        let outsider = insert_agent(&pool, &unique_email("agent-c"), "Agent C").await;

        let admin = insert_admin(
            &pool,
            &unique_email("scoped-admin"),
            AdminScope::Scoped,
            &[first, second],
        )
        .await;

        let agents = resolve_agents(&pool, &admin).await.unwrap();
        let ids: Vec<_> = agents.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert!(!ids.contains(&outsider));
    }

    #[tokio::test]
    async fn global_admin_sees_every_agent() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let one = insert_agent(&pool, &unique_email("agent"), "One").await;
        let two = insert_agent(&pool, &unique_email("agent"), "Two").await;
        let admin = insert_admin(&pool, &unique_email("global-admin"), AdminScope::Global, &[]).await;

        let agents = resolve_agents(&pool, &admin).await.unwrap();
        let ids: Vec<_> = agents.iter().map(|a| a.id).collect();
        assert!(ids.contains(&one));
        assert!(ids.contains(&two));
    }

    #[tokio::test]
    async fn assigned_account_whose_role_changed_is_dropped() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let kept = insert_agent(&pool, &unique_email("agent"), "Kept").await;
        let turned = insert_agent(&pool, &unique_email("agent"), "Turned").await;
        let admin = insert_admin(
            &pool,
            &unique_email("scoped-admin"),
            AdminScope::Scoped,
            &[kept, turned],
        )
        .await;

        sqlx::query("UPDATE accounts SET role = 'admin', scope = 'global' WHERE id = $1")
            .bind(turned)
            .execute(&pool)
            .await
            .unwrap();

        let agents = resolve_agents(&pool, &admin).await.unwrap();
        let ids: Vec<_> = agents.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![kept]);
    }

    #[tokio::test]
    async fn token_outliving_its_account_fails_closed() {
        let Some(pool) = db_pool_if_available().await else {
            return;
        };

        let admin = insert_admin(&pool, &unique_email("doomed"), AdminScope::Scoped, &[]).await;
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(admin.id)
            .execute(&pool)
            .await
            .unwrap();

        match resolve_agents(&pool, &admin).await {
            Err(AppError::Domain(Error::NotAuthenticated(_))) => {}
            other => panic!("expected NotAuthenticated, got {other:?}"),
        }
    }
}
