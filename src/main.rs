use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use serde::Serialize;
use serde_json::json;

use vibrant_journal::app::App;
use vibrant_journal::config::AppConfig;
use vibrant_journal::notify::LogNotifier;
use vibrant_journal::post::list_controller::FetchOutcome;
use vibrant_journal::{CustomError, PostForm};

#[derive(Parser)]
#[command(name = "vibrant-journal")]
#[command(about = "Browse and write posts on Vibrant Journal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List posts, newest first
    List {
        /// Case-insensitive text matched against title or content
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(short, long, default_value_t = 1)]
        page: u64,
    },
    /// Show a single post
    Show { id: String },
    /// Publish a new post as the signed-in user
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Edit one of your posts
    Edit {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Delete one of your posts
    Delete { id: String },
    SignIn {
        #[arg(long, env = "JOURNAL_EMAIL")]
        email: String,
        #[arg(long, env = "JOURNAL_PASSWORD")]
        password: String,
    },
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        username: String,
    },
    SignOut,
    /// Print the signed-in user and profile
    Whoami,
}

fn print<T: Serialize>(value: &T) -> Result<(), CustomError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to render output: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CustomError> {
    let config = AppConfig::from_env()?;
    let app = App::build(&config, Arc::new(LogNotifier)).await?;

    match cli.command {
        Commands::List { search, page } => {
            let mut list = app.post_list();
            if let FetchOutcome::Failed(e) = list.set_search_text(search).await {
                return Err(e);
            }
            if page != 1 {
                match list.go_to_page(page).await {
                    None => info!(
                        "Page {} is out of range (1..={}), showing page {}",
                        page,
                        list.total_pages(),
                        list.current_page()
                    ),
                    Some(FetchOutcome::Failed(e)) => return Err(e),
                    Some(_) => {}
                }
            }
            print(&list.snapshot())
        }
        Commands::Show { id } => {
            let mut view = app.post_detail();
            view.load(&id).await?;
            print(&json!({
                "post": view.post(),
                "is_author": view.is_author().await,
            }))
        }
        Commands::Create { title, content } => {
            let navigation = app.create_post().submit(PostForm { title, content }).await?;
            print(&navigation)
        }
        Commands::Edit { id, title, content } => {
            let mut view = app.edit_post();
            if let Some(navigation) = view.load(&id).await {
                return print(&navigation);
            }
            let navigation = view.submit(PostForm { title, content }).await?;
            print(&navigation)
        }
        Commands::Delete { id } => {
            let mut view = app.post_detail();
            view.load(&id).await?;
            let navigation = view.delete().await?;
            print(&navigation)
        }
        Commands::SignIn { email, password } => {
            app.auth.sign_in(&email, &password).await?;
            print(&app.auth.state().await)
        }
        Commands::SignUp {
            email,
            password,
            username,
        } => {
            let user = app.auth.sign_up(&email, &password, &username).await?;
            print(&user)
        }
        Commands::SignOut => app.auth.sign_out().await,
        Commands::Whoami => print(&app.auth.state().await),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logger with environment variable support
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} ({})", e, e.code());
            ExitCode::FAILURE
        }
    }
}
