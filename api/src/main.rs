use std::net::SocketAddr;

use axum::Router;
use rota_core::token::TokenSigner;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod auth;
mod error;
mod extract;
mod middleware;
mod routes;
mod scope;
mod state;
#[cfg(test)]
mod test_support;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rota API",
        version = "0.1.0",
        description = "Multi-tenant admin console: manage agent sub-accounts and distribute contact lists evenly among them."
    ),
    paths(
        routes::health::health_check,
        routes::auth::login,
        routes::agents::create_agent,
        routes::agents::list_agents,
        routes::agents::delete_agent,
        routes::admins::create_admin,
        routes::admins::list_admins,
        routes::admins::get_admin_agents,
        routes::admins::assign_admin_agents,
        routes::lists::distribute_list,
        routes::lists::list_distributed,
    ),
    components(schemas(
        HealthResponse,
        rota_core::error::ErrorResponse,
        rota_core::principal::Principal,
        rota_core::principal::Role,
        rota_core::principal::AdminScope,
        scope::Agent,
        routes::auth::LoginRequest,
        routes::auth::LoginResponse,
        routes::agents::CreateAgentRequest,
        routes::agents::CreateAgentResponse,
        routes::agents::AgentsResponse,
        routes::agents::AgentDeletedResponse,
        routes::admins::CreateAdminRequest,
        routes::admins::CreateAdminResponse,
        routes::admins::AdminSummary,
        routes::admins::AdminsResponse,
        routes::admins::AdminAgentsResponse,
        routes::admins::AssignAgentsRequest,
        routes::admins::AssignAgentsResponse,
        routes::lists::ListRow,
        routes::lists::DistributeRequest,
        routes::lists::DistributeResponse,
        routes::lists::ListItemResponse,
        routes::lists::AgentListGroup,
        routes::lists::ListsResponse,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rota_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Database connection
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Token signing secret
    let jwt_secret = std::env::var("ROTA_JWT_SECRET").expect("ROTA_JWT_SECRET must be set");

    let app_state = state::AppState {
        db: pool,
        tokens: TokenSigner::new(jwt_secret.as_bytes()),
    };

    // CORS
    let cors_layer = middleware::cors::build_cors_layer();

    // Router with per-IP rate limiting on the login route
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::auth::router().layer(middleware::rate_limit::login_layer()))
        .merge(routes::agents::router())
        .merge(routes::admins::router())
        .merge(routes::lists::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Rota API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
