//! Shared fixtures for database-gated tests. Tests connect to `DATABASE_URL`
//! when it is set and silently skip otherwise, so the suite stays green on
//! machines without Postgres.

use rota_core::principal::{AdminScope, Principal, Role};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

pub async fn db_pool_if_available() -> Option<sqlx::PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .ok()?;

    sqlx::migrate!("../migrations").run(&pool).await.ok()?;
    Some(pool)
}

pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::now_v7())
}

/// Insert an agent account. The password hash is a placeholder; fixtures
/// never log in.
pub async fn insert_agent(pool: &sqlx::PgPool, email: &str, name: &str) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO accounts (id, email, password_hash, role, name) \
         VALUES ($1, $2, 'unused', 'agent', $3)",
    )
    .bind(id)
    .bind(email)
    .bind(name)
    .execute(pool)
    .await
    .expect("insert agent fixture");
    id
}

/// Insert an admin account with the given scope and assigned agents, and
/// return the principal a login for it would carry.
pub async fn insert_admin(
    pool: &sqlx::PgPool,
    email: &str,
    scope: AdminScope,
    agents: &[Uuid],
) -> Principal {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO accounts (id, email, password_hash, role, scope, name) \
         VALUES ($1, $2, 'unused', 'admin', $3, 'Admin User')",
    )
    .bind(id)
    .bind(email)
    .bind(scope.as_str())
    .execute(pool)
    .await
    .expect("insert admin fixture");

    for (position, agent_id) in agents.iter().enumerate() {
        sqlx::query(
            "INSERT INTO agent_assignments (admin_id, agent_id, position) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(agent_id)
        .bind(position as i32)
        .execute(pool)
        .await
        .expect("insert assignment fixture");
    }

    Principal {
        id,
        email: email.to_string(),
        role: Role::Admin,
        name: Some("Admin User".to_string()),
        assigned_agents: match scope {
            AdminScope::Scoped => Some(agents.to_vec()),
            AdminScope::Global => None,
        },
    }
}
