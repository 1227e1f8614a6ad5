use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "taskshare")]
#[command(about = "TaskShare CLI - shared task lists from the terminal", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account name
    #[arg(long, short, global = true, env = "TASKSHARE_USER")]
    user: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "TASKSHARE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register,
    /// List your tasks in display order
    List,
    /// Add a task
    Add {
        title: String,
        #[arg(long, short, default_value = "")]
        desc: String,
        /// Category name (uncategorized when omitted)
        #[arg(long, short)]
        category: Option<String>,
    },
    /// Toggle a task between done and open
    Done { id: i64 },
    /// Edit a task you own
    Edit {
        id: i64,
        #[arg(long, short)]
        title: Option<String>,
        #[arg(long, short)]
        desc: Option<String>,
        #[arg(long, short)]
        category: Option<String>,
    },
    /// Delete a task you own
    Delete { id: i64 },
    /// Share a task with another user
    Share { id: i64, target: String },
    /// Stop sharing a task with a user
    Unshare { id: i64, target: String },
    /// Swap the task at INDEX with the one below it
    Swap { index: usize },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// List categories
    List,
    /// Add a category
    Add {
        name: String,
        #[arg(long)]
        header: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Rename or recolour a category
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        header: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Delete a category; its tasks become uncategorized
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = commands::Context::new(cli.config.as_deref(), cli.user, cli.password, cli.json)?;

    match cli.command {
        Commands::Register => commands::account::register(&ctx).await?,
        Commands::List => commands::tasks::list(&ctx).await?,
        Commands::Add {
            title,
            desc,
            category,
        } => commands::tasks::add(&ctx, &title, &desc, category.as_deref()).await?,
        Commands::Done { id } => commands::tasks::toggle(&ctx, id).await?,
        Commands::Edit {
            id,
            title,
            desc,
            category,
        } => commands::tasks::edit(&ctx, id, title, desc, category.as_deref()).await?,
        Commands::Delete { id } => commands::tasks::delete(&ctx, id).await?,
        Commands::Share { id, target } => commands::tasks::share(&ctx, id, &target, true).await?,
        Commands::Unshare { id, target } => {
            commands::tasks::share(&ctx, id, &target, false).await?
        }
        Commands::Swap { index } => commands::tasks::swap(&ctx, index).await?,
        Commands::Category { action } => match action {
            CategoryAction::List => commands::categories::list(&ctx).await?,
            CategoryAction::Add { name, header, body } => {
                commands::categories::add(&ctx, &name, header, body).await?
            }
            CategoryAction::Update {
                id,
                name,
                header,
                body,
            } => commands::categories::update(&ctx, id, name, header, body).await?,
            CategoryAction::Delete { id } => commands::categories::delete(&ctx, id).await?,
        },
    }

    Ok(())
}
