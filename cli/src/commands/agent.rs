use clap::Subcommand;
use serde_json::json;

use crate::util::api_request;

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Create an agent account in your scope
    Create {
        /// Agent display name
        #[arg(long)]
        name: String,
        /// Agent email (unique across all accounts)
        #[arg(long)]
        email: String,
        /// Agent mobile number
        #[arg(long)]
        mobile: String,
        /// Agent password
        #[arg(long)]
        password: String,
    },
    /// List the agents visible to you
    List,
    /// Delete an agent in your scope
    Delete {
        /// Agent UUID
        #[arg(long)]
        id: String,
    },
}

pub async fn run(api_url: &str, token: Option<&str>, command: AgentCommands) -> i32 {
    match command {
        AgentCommands::Create {
            name,
            email,
            mobile,
            password,
        } => {
            let body = json!({
                "name": name,
                "email": email,
                "mobile": mobile,
                "password": password
            });
            api_request(
                api_url,
                reqwest::Method::POST,
                "/v1/agents",
                token,
                Some(body),
            )
            .await
        }
        AgentCommands::List => {
            api_request(api_url, reqwest::Method::GET, "/v1/agents", token, None).await
        }
        AgentCommands::Delete { id } => {
            api_request(
                api_url,
                reqwest::Method::DELETE,
                &format!("/v1/agents/{id}"),
                token,
                None,
            )
            .await
        }
    }
}
