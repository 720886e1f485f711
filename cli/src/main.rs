use clap::{Parser, Subcommand};

mod commands;
mod util;

#[derive(Parser)]
#[command(
    name = "rota",
    version,
    about = "Rota CLI — manage agent accounts and distribute contact lists"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "ROTA_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Bearer token for authenticated commands (from `rota login`)
    #[arg(long, env = "ROTA_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Log in and print a session token
    Login {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
    },
    /// Agent account operations
    Agent {
        #[command(subcommand)]
        command: commands::agent::AgentCommands,
    },
    /// Admin account operations
    Admin {
        #[command(subcommand)]
        command: commands::admin::AdminCommands,
    },
    /// Contact-list distribution operations
    List {
        #[command(subcommand)]
        command: commands::list::ListCommands,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let token = cli.token.as_deref();

    let exit_code = match cli.command {
        Commands::Health => {
            util::api_request(&cli.api_url, reqwest::Method::GET, "/health", None, None).await
        }
        Commands::Login { email, password } => {
            commands::auth::login(&cli.api_url, &email, &password).await
        }
        Commands::Agent { command } => commands::agent::run(&cli.api_url, token, command).await,
        Commands::Admin { command } => commands::admin::run(&cli.api_url, token, command).await,
        Commands::List { command } => commands::list::run(&cli.api_url, token, command).await,
    };

    std::process::exit(exit_code);
}
