use rota_core::token::TokenSigner;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: TokenSigner,
}
