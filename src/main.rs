use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::{Value, json};

use resource_hub::app::{App, AppError};
use resource_hub::config::{ClientConfig, ConfigError};
use resource_hub::net::client::ApiError;
use resource_hub::net::resources::{MatchMode, SearchQuery, SortOrder};
use resource_hub::state::auth::{AuthFailure, ProfileFetch};
use resource_hub::state::session::AuthStatus;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error("not logged in; run `resource-hub login` first")]
    NotLoggedIn,
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "resource-hub", about = "Course resource hub client")]
struct Cli {
    #[arg(long, env = "RESOURCE_HUB_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "RESOURCE_HUB_TOKEN_PATH")]
    token_path: Option<PathBuf>,

    /// Log more (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and persist the session token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "RESOURCE_HUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account. Does not log in.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long, env = "RESOURCE_HUB_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        email: String,
    },
    Logout,
    /// Print the logged-in user.
    Whoami,
    /// Print the session status.
    Status,
    /// Resolve a page path through the route guard.
    Open { path: String },
    Resources(ResourcesCommand),
}

#[derive(Args, Debug)]
struct ResourcesCommand {
    #[command(subcommand)]
    command: ResourcesSubcommand,
}

#[derive(Subcommand, Debug)]
enum ResourcesSubcommand {
    List,
    Search {
        q: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        size: u32,
        #[arg(long, default_value_t = SortOrder::Relevance)]
        sort: SortOrder,
        #[arg(long, default_value_t = MatchMode::And)]
        mode: MatchMode,
    },
    Delete {
        id: i64,
    },
    Download {
        id: i64,
        attachment_id: i64,
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }
    if let Some(path) = cli.token_path {
        config = config.with_token_path(path);
    }

    let mut app = App::connect(&config)?;
    let startup = app.start().await?;

    match cli.command {
        Command::Login { username, password } => {
            let snapshot = app.auth.login(&username, &password).await?;
            print_json(&json!({ "status": "authenticated", "user": snapshot.user }))
        }
        Command::Register { username, password, email } => {
            let message = app.auth.register(&username, &password, &email).await?;
            print_json(&json!({ "message": message }))
        }
        Command::Logout => {
            app.auth.logout();
            print_json(&json!({ "status": "anonymous" }))
        }
        Command::Whoami => match startup.profile {
            Some(Ok(ProfileFetch::Updated(user))) => print_json(&serde_json::to_value(user)?),
            Some(Err(e)) => Err(e.into()),
            _ => Err(CliError::NotLoggedIn),
        },
        Command::Status => {
            let session = app.auth.session();
            print_json(&json!({
                "status": status_label(session.status()),
                "user": session.user(),
            }))
        }
        Command::Open { path } => {
            let location = app.router.navigate(&path);
            print_json(&json!({
                "path": location.path,
                "view": format!("{:?}", location.view),
                "redirected_from": location.redirected_from,
            }))
        }
        Command::Resources(resources) => run_resources(&app, resources).await,
    }
}

async fn run_resources(app: &App, resources: ResourcesCommand) -> Result<(), CliError> {
    match resources.command {
        ResourcesSubcommand::List => {
            let list = app.resources.list().await?;
            print_json(&serde_json::to_value(list)?)
        }
        ResourcesSubcommand::Search { q, page, size, sort, mode } => {
            let query = SearchQuery::new(q).page(page).size(size).sort(sort).mode(mode);
            let page = app.resources.search(&query).await?;
            print_json(&serde_json::to_value(page)?)
        }
        ResourcesSubcommand::Delete { id } => {
            app.resources.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
        ResourcesSubcommand::Download { id, attachment_id, output } => {
            let bytes = app.resources.download(id, attachment_id).await?;
            tokio::fs::write(&output, &bytes)
                .await
                .map_err(|source| CliError::Write { path: output.clone(), source })?;
            print_json(&json!({ "path": output.display().to_string(), "bytes": bytes.len() }))
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn status_label(status: AuthStatus) -> &'static str {
    match status {
        AuthStatus::Uninitialized => "uninitialized",
        AuthStatus::Anonymous => "anonymous",
        AuthStatus::Authenticated => "authenticated",
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
