//! CLI entry point for aichat.

pub mod auth;
pub mod chat;

use std::io::Write;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::auth::{AuthSession, FileCredentialStorage, TokenStore};
use crate::client::{ApiClient, Notice, Notifier};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::router::Router;

/// Terminal client for the AI chat backend
#[derive(Parser, Debug)]
#[command(name = "aichat", version, about = "Terminal client for the AI chat backend")]
pub struct Cli {
    /// API base URL (overrides AICHAT_API_BASE)
    #[arg(long, global = true, env = "AICHAT_API_BASE")]
    pub api_base: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Account management
    Auth(AuthArgs),
    /// Send a message to a model
    Chat(ChatArgs),
    /// Manage chat sessions
    Sessions(SessionsArgs),
    /// List available models
    Models,
    /// Resolve a view path through the route guard
    Open(OpenArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Log in and store the token pair
    Login(LoginArgs),
    /// Revoke the refresh token and forget local credentials
    Logout,
    /// Show stored credentials and check them against the server
    Status,
    /// Exchange the refresh token for a new access token
    Refresh,
}

/// Arguments for `aichat auth login`.
#[derive(Args, Debug)]
pub struct LoginArgs {
    pub username: String,

    /// Password; read from stdin when omitted
    #[arg(long, env = "AICHAT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for the `chat` subcommand.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Model identifier (defaults to the server's default model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Continue an existing session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Ask the model to show its reasoning
    #[arg(long)]
    pub think: bool,

    /// Wait for the full reply instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Message to send
    pub message: String,
}

/// Arguments for the `sessions` subcommand group.
#[derive(Args, Debug)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionCommands,
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List sessions
    List,
    /// Create an empty session
    Create {
        #[arg(default_value = "")]
        title: String,
    },
    /// Print a session's messages
    History { id: String },
    /// Rename a session
    Rename { id: String, title: String },
    /// Delete a session
    Delete { id: String },
}

/// Arguments for `aichat open`.
#[derive(Args, Debug)]
pub struct OpenArgs {
    /// View path, e.g. /chat
    pub path: String,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Environment config with command-line overrides applied.
    pub fn config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_env()?;
        if let Some(base) = &self.api_base {
            config.api_base = base.clone();
        }
        Ok(config)
    }
}

/// Prints notices to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "⚠️  {}", notice.message());
    }
}

/// Everything a command needs, wired over one file-backed token store.
pub struct Context {
    pub router: Arc<Router>,
    pub session: AuthSession,
}

impl Context {
    pub fn open(config: ClientConfig) -> Result<Self> {
        let storage = Arc::new(FileCredentialStorage::new(config.credentials_path()));
        let tokens = Arc::new(TokenStore::open(storage)?);
        let router = Arc::new(Router::new(tokens.clone()));
        let client = ApiClient::builder()
            .config(config)
            .tokens(tokens)
            .navigator(router.clone())
            .notifier(Arc::new(StderrNotifier))
            .build()?;
        let session = AuthSession::new(client);
        session.init();
        Ok(Self { router, session })
    }

    pub fn client(&self) -> &ApiClient {
        self.session.client()
    }
}

/// Run one parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let context = Context::open(cli.config()?)?;
    match cli.command {
        Commands::Auth(args) => match args.command {
            AuthCommands::Login(args) => auth::handle_login(&context, args).await,
            AuthCommands::Logout => auth::handle_logout(&context).await,
            AuthCommands::Status => auth::handle_status(&context).await,
            AuthCommands::Refresh => auth::handle_refresh(&context).await,
        },
        Commands::Chat(args) => chat::handle_chat(&context, args).await,
        Commands::Sessions(args) => chat::handle_sessions(&context, args.command).await,
        Commands::Models => chat::handle_models(&context).await,
        Commands::Open(args) => {
            let navigation = context.router.navigate(&args.path)?;
            if navigation.redirected() {
                println!(
                    "{} → {}",
                    navigation.requested.path(),
                    navigation.resolved.path()
                );
            } else {
                println!("{}", navigation.resolved.path());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_auth_login_with_password_flag() {
        let cli =
            Cli::try_parse_from(["aichat", "auth", "login", "alice", "--password", "pw"]).unwrap();
        match cli.command {
            Commands::Auth(auth) => match auth.command {
                AuthCommands::Login(args) => {
                    assert_eq!(args.username, "alice");
                    assert_eq!(args.password.as_deref(), Some("pw"));
                }
                other => panic!("expected Login, got {other:?}"),
            },
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn parse_auth_status_and_logout() {
        let cli = Cli::try_parse_from(["aichat", "auth", "status"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Auth(AuthArgs {
                command: AuthCommands::Status
            })
        ));
        let cli = Cli::try_parse_from(["aichat", "auth", "logout"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Auth(AuthArgs {
                command: AuthCommands::Logout
            })
        ));
    }

    #[test]
    fn parse_chat_with_defaults() {
        let cli = Cli::try_parse_from(["aichat", "chat", "hello"]).unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.message, "hello");
                assert!(args.model.is_none());
                assert!(args.session.is_none());
                assert!(!args.think);
                assert!(!args.no_stream);
            }
            other => panic!("expected Chat, got {other:?}"),
        }
    }

    #[test]
    fn parse_chat_with_all_options() {
        let cli = Cli::try_parse_from([
            "aichat",
            "--api-base",
            "http://localhost:9000/api",
            "chat",
            "-m",
            "deepseek",
            "-s",
            "12",
            "--think",
            "--no-stream",
            "why?",
        ])
        .unwrap();
        assert_eq!(cli.api_base.as_deref(), Some("http://localhost:9000/api"));
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.model.as_deref(), Some("deepseek"));
                assert_eq!(args.session.as_deref(), Some("12"));
                assert!(args.think);
                assert!(args.no_stream);
            }
            other => panic!("expected Chat, got {other:?}"),
        }
    }

    #[test]
    fn parse_session_rename() {
        let cli = Cli::try_parse_from(["aichat", "sessions", "rename", "7", "Trip plans"]).unwrap();
        match cli.command {
            Commands::Sessions(args) => match args.command {
                SessionCommands::Rename { id, title } => {
                    assert_eq!(id, "7");
                    assert_eq!(title, "Trip plans");
                }
                other => panic!("expected Rename, got {other:?}"),
            },
            other => panic!("expected Sessions, got {other:?}"),
        }
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["aichat"]).is_err());
    }

    #[test]
    fn parse_chat_missing_message_is_error() {
        assert!(Cli::try_parse_from(["aichat", "chat"]).is_err());
    }
}
