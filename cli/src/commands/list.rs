use clap::Subcommand;
use serde_json::json;

use crate::util::{api_request, exit_error, read_json_from_file};

#[derive(Subcommand)]
pub enum ListCommands {
    /// Distribute parsed contact rows evenly among your agents
    Distribute {
        /// Path to a JSON file of rows (`[{"first_name", "phone", "notes"}, ...]`),
        /// or "-" for stdin
        #[arg(long)]
        file: String,
    },
    /// Show the distributed items, grouped per agent
    Show,
}

pub async fn run(api_url: &str, token: Option<&str>, command: ListCommands) -> i32 {
    match command {
        ListCommands::Distribute { file } => {
            let parsed = match read_json_from_file(&file) {
                Ok(v) => v,
                Err(e) => exit_error(&e, None),
            };

            // Accept either a bare array of rows or a {"rows": [...]} object.
            let body = if parsed.is_array() {
                json!({ "rows": parsed })
            } else {
                parsed
            };

            api_request(
                api_url,
                reqwest::Method::POST,
                "/v1/lists/distribute",
                token,
                Some(body),
            )
            .await
        }
        ListCommands::Show => {
            api_request(api_url, reqwest::Method::GET, "/v1/lists", token, None).await
        }
    }
}
