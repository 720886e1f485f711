use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::util::{api_request, exit_error};

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create an admin account directly in the database (requires DATABASE_URL)
    Create {
        /// Admin email
        #[arg(long)]
        email: String,
        /// Admin password
        #[arg(long)]
        password: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Create a global-scope admin that sees every agent
        #[arg(long)]
        global: bool,
        /// Agent UUIDs to assign (scoped admins only; repeatable)
        #[arg(long = "agent-id")]
        agent_ids: Vec<String>,
    },
    /// List all admins with their assigned agents (via API)
    List,
    /// Replace a scoped admin's assigned agents (via API)
    Assign {
        /// Admin UUID
        #[arg(long)]
        id: String,
        /// Agent UUIDs, in assignment order (repeatable)
        #[arg(long = "agent-id")]
        agent_ids: Vec<String>,
    },
}

pub async fn run(api_url: &str, token: Option<&str>, command: AdminCommands) -> i32 {
    match command {
        AdminCommands::Create {
            email,
            password,
            name,
            global,
            agent_ids,
        } => create_admin(&email, &password, name.as_deref(), global, &agent_ids).await,
        AdminCommands::List => {
            api_request(api_url, reqwest::Method::GET, "/v1/admins", token, None).await
        }
        AdminCommands::Assign { id, agent_ids } => {
            let body = json!({ "agent_ids": agent_ids });
            api_request(
                api_url,
                reqwest::Method::PUT,
                &format!("/v1/admins/{id}/agents"),
                token,
                Some(body),
            )
            .await
        }
    }
}

/// Insert an admin account directly into the database. Admin creation is
/// gated behind global-admin credentials in the API, so the first admin has
/// to come from here.
async fn create_admin(
    email: &str,
    password: &str,
    name: Option<&str>,
    global: bool,
    agent_ids: &[String],
) -> i32 {
    if global && !agent_ids.is_empty() {
        exit_error(
            "--global and --agent-id are mutually exclusive",
            Some("Global admins already see every agent"),
        );
    }

    let agent_ids: Vec<Uuid> = agent_ids
        .iter()
        .map(|raw| match raw.parse() {
            Ok(id) => id,
            Err(_) => exit_error(&format!("Invalid agent id '{raw}'"), None),
        })
        .collect();

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => exit_error(
            "DATABASE_URL must be set for admin create",
            Some("Admin create connects directly to the database for bootstrapping"),
        ),
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
    {
        Ok(p) => p,
        Err(e) => exit_error(&format!("Failed to connect to database: {e}"), None),
    };

    let password_hash = match rota_core::auth::hash_password(password) {
        Ok(h) => h,
        Err(e) => exit_error(&format!("Failed to hash password: {e}"), None),
    };

    let admin_id = Uuid::now_v7();
    let scope = if global { "global" } else { "scoped" };

    if let Err(e) = sqlx::query(
        "INSERT INTO accounts (id, email, password_hash, role, scope, name) \
         VALUES ($1, $2, $3, 'admin', $4, $5)",
    )
    .bind(admin_id)
    .bind(email)
    .bind(&password_hash)
    .bind(scope)
    .bind(name)
    .execute(&pool)
    .await
    {
        exit_error(&format!("Failed to create admin: {e}"), None);
    }

    for (position, agent_id) in agent_ids.iter().enumerate() {
        if let Err(e) = sqlx::query(
            "INSERT INTO agent_assignments (admin_id, agent_id, position) VALUES ($1, $2, $3)",
        )
        .bind(admin_id)
        .bind(agent_id)
        .bind(position as i32)
        .execute(&pool)
        .await
        {
            exit_error(&format!("Failed to assign agent {agent_id}: {e}"), None);
        }
    }

    let output = json!({
        "admin_id": admin_id,
        "email": email,
        "name": name,
        "scope": scope,
        "assigned_agents": agent_ids
    });
    println!("{}", serde_json::to_string_pretty(&output).unwrap());
    0
}
