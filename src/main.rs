use std::process::ExitCode;
use std::sync::Arc;

use persona_client::api::endpoints::{DEFAULT_MEMORY_LIMIT, DEFAULT_SEARCH_TOP_K};
use persona_client::api::types::ProfileUpdate;
use persona_client::api::Method;
use persona_client::commands::{self, CommandError};
use persona_client::config::Config;
use persona_client::state::AppState;

mod cli {
    use clap::{Parser, Subcommand};

    use super::{Method, DEFAULT_MEMORY_LIMIT, DEFAULT_SEARCH_TOP_K};

    #[derive(Parser, Debug)]
    #[command(name = "persona", version, about = "PersonaMem command-line client")]
    pub struct Args {
        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Manage the stored session token
        Token {
            #[command(subcommand)]
            action: TokenAction,
        },
        /// End the session and clear local storage
        Logout,
        /// Send an arbitrary authenticated request
        Request {
            path: String,
            #[arg(short = 'X', long, default_value = "GET")]
            method: Method,
            /// JSON request body
            #[arg(short, long)]
            data: Option<String>,
        },
        /// Show the signed-in user
        Me,
        /// Send a chat message and print the reply
        Chat {
            message: String,
            /// Continue an existing conversation
            #[arg(long)]
            session: Option<String>,
        },
        /// List conversations
        Sessions {
            #[arg(long)]
            html: bool,
        },
        /// Show one conversation
        Session { id: String },
        /// Show or update the persona profile
        Profile {
            #[arg(long)]
            display_name: Option<String>,
            #[arg(long)]
            expertise_level: Option<String>,
            #[arg(long)]
            preferred_language: Option<String>,
            #[arg(long)]
            communication_style: Option<String>,
            #[arg(long)]
            timezone: Option<String>,
            #[arg(long = "goal")]
            goals: Vec<String>,
            #[arg(long = "interest")]
            interests: Vec<String>,
        },
        /// List stored memories
        Memories {
            #[arg(long = "type")]
            memory_type: Option<String>,
            #[arg(long, default_value_t = DEFAULT_MEMORY_LIMIT)]
            limit: u32,
            #[arg(long)]
            html: bool,
        },
        /// Store a memory
        Remember {
            content: String,
            #[arg(long = "type", default_value = "semantic")]
            memory_type: String,
        },
        /// Delete a memory
        Forget { id: String },
        /// Semantic memory search
        Search {
            query: Option<String>,
            #[arg(long, default_value_t = DEFAULT_SEARCH_TOP_K)]
            top_k: u32,
            /// Read queries from stdin as you type
            #[arg(short, long)]
            interactive: bool,
        },
        /// Show usage metrics
        Metrics,
        /// Rebuild the memory search index
        RebuildIndex,
        /// Copy text to the clipboard
        Copy { text: String },
    }

    #[derive(Subcommand, Debug)]
    pub enum TokenAction {
        /// Store a bearer token
        Set { token: String },
        /// Print the token's subject
        Show,
        /// Remove everything from local storage
        Clear,
    }
}

use cli::{Command, TokenAction};

async fn run(state: Arc<AppState>, command: Command) -> Result<(), CommandError> {
    match command {
        Command::Token { action } => match action {
            TokenAction::Set { token } => commands::set_token(&state, &token),
            TokenAction::Show => commands::show_token(&state),
            TokenAction::Clear => commands::clear_store(&state),
        },
        Command::Logout => {
            commands::logout(&state);
            Ok(())
        }
        Command::Request { path, method, data } => {
            commands::request(&state, method, &path, data.as_deref()).await
        }
        Command::Me => commands::me(&state).await,
        Command::Chat { message, session } => {
            commands::chat(&state, &message, session.as_deref()).await
        }
        Command::Sessions { html } => commands::sessions(&state, html).await,
        Command::Session { id } => commands::session(&state, &id).await,
        Command::Profile {
            display_name,
            expertise_level,
            preferred_language,
            communication_style,
            timezone,
            goals,
            interests,
        } => {
            let update = ProfileUpdate {
                display_name,
                expertise_level,
                preferred_language,
                communication_style,
                timezone,
                goals: (!goals.is_empty()).then_some(goals),
                interests: (!interests.is_empty()).then_some(interests),
                ..Default::default()
            };
            if serde_json::to_value(&update)?.as_object().is_some_and(|m| m.is_empty()) {
                commands::profile(&state).await
            } else {
                commands::update_profile(&state, &update).await
            }
        }
        Command::Memories {
            memory_type,
            limit,
            html,
        } => commands::memories(&state, memory_type.as_deref(), limit, html).await,
        Command::Remember {
            content,
            memory_type,
        } => commands::remember(&state, &content, &memory_type).await,
        Command::Forget { id } => commands::forget(&state, &id).await,
        Command::Search {
            query,
            top_k,
            interactive,
        } => match query {
            Some(query) if !interactive => commands::search(&state, &query, top_k).await,
            _ => commands::search_interactive(Arc::clone(&state), top_k).await,
        },
        Command::Metrics => commands::metrics(&state).await,
        Command::RebuildIndex => commands::rebuild_index(&state).await,
        Command::Copy { text } => {
            commands::copy(&state, &text).await;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env in the working directory, same variables the web build reads
    let _ = dotenvy::dotenv();

    env_logger::init();

    let args = <cli::Args as clap::Parser>::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("PersonaMem client starting against {}", config.api_base_url);

    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            log::error!("Failed to open session store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(Arc::clone(&state), args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            if !e.is_auth() {
                state.toaster.error(&e.to_string());
            }
            ExitCode::FAILURE
        }
    }
}
