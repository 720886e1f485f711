use serde_json::json;

use crate::util::api_request;

/// POST /v1/auth/login. Prints the response, including the bearer token to
/// export as ROTA_TOKEN.
pub async fn login(api_url: &str, email: &str, password: &str) -> i32 {
    let body = json!({
        "email": email,
        "password": password
    });

    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/auth/login",
        None,
        Some(body),
    )
    .await
}
