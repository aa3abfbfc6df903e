//! CLI entry point for join-board.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use join_board::domain::session::contact_namespace;
use join_board::domain::sorting::{SortField, SortOrder};
use join_board::domain::task::parse_due_date;
use join_board::store::SessionFile;
use join_board::view::BoardView;
use join_board::{
    telemetry, Columns, ContactRepository, HttpStore, JoinConfig, MemoryStore, Priority,
    RemoteStore, TaskDraft, TaskId, TaskRepository, TaskStatus, UserDirectory,
};

/// Kanban board synced with a Firebase Realtime Database.
#[derive(Parser, Debug)]
#[command(name = "join-board", version, about)]
struct Cli {
    /// Path to the config file (defaults to ./join.toml)
    #[arg(long, env = "JOIN_CONFIG")]
    config: Option<PathBuf>,

    /// Use a throwaway in-memory store instead of the configured database
    #[arg(long)]
    memory: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "join_board=info")]
    log: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the board column by column.
    List {
        #[arg(long, default_value = "id")]
        sort: SortField,
        #[arg(long, default_value = "asc")]
        order: SortOrder,
    },

    /// Show one task as JSON.
    Show { id: TaskId },

    /// Create a task.
    Create {
        #[arg(long)]
        title: String,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(short = 'a', long = "assignee")]
        assignees: Vec<String>,
        #[arg(short = 's', long = "subtask")]
        subtasks: Vec<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },

    /// Move a task to another column.
    Move { id: TaskId, status: TaskStatus },

    /// Delete a task.
    Delete { id: TaskId },

    /// Find tasks by title, description or subtask.
    Search { query: String },

    /// List the contacts of a user (the logged-in user by default).
    Contacts {
        #[arg(long)]
        user: Option<String>,
    },

    /// Register a new user.
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Log in and remember the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Forget the stored session.
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log)?;

    let config = JoinConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let store: Arc<dyn RemoteStore> = if cli.memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(HttpStore::from_config(&config.store)?)
    };
    let session_file = SessionFile::new(&config.session.path);

    match cli.cmd {
        Command::List { sort, order } => {
            let mut repo = TaskRepository::new(store.clone());
            let tasks = repo.load_all().await?;
            let columns = Columns::partition_sorted(tasks, sort, order);

            let session = session_file.load().await?;
            let mut contacts = ContactRepository::new(store, contact_namespace(session.as_ref()));
            contacts.load_all().await?;

            let view = BoardView::build(&columns, contacts.contacts());
            for column in &view.columns {
                println!("== {} ({})", column.title, column.cards.len());
                if let Some(empty) = &column.empty_text {
                    println!("   {}", empty);
                }
                for card in &column.cards {
                    let progress = card
                        .progress
                        .as_ref()
                        .map(|p| format!(" [{}]", p.label))
                        .unwrap_or_default();
                    println!(
                        "   #{} {} <{}> {}{}",
                        card.id, card.title, card.category, card.priority, progress
                    );
                }
            }
        }
        Command::Show { id } => {
            let mut repo = TaskRepository::new(store);
            repo.load_all().await?;
            let task = repo
                .get(id)
                .with_context(|| format!("task {} not found", id))?;
            println!("{}", serde_json::to_string_pretty(task)?);
        }
        Command::Create {
            title,
            due,
            priority,
            category,
            description,
            assignees,
            subtasks,
            status,
        } => {
            let mut draft = TaskDraft::new(title)
                .with_due_date(parse_due_date(&due).map_err(|e| anyhow::anyhow!("{}", e))?)
                .with_priority(priority)
                .with_category(category)
                .with_description(description);
            for name in assignees {
                draft = draft.assign(name);
            }
            for text in subtasks {
                draft.subtasks.push(text)?;
            }
            if let Some(status) = status {
                draft = draft.with_status(status);
            }

            let mut repo = TaskRepository::new(store);
            repo.load_all().await?;
            let task = repo.create(draft).await?;
            println!("Created task #{}", task.id);
        }
        Command::Move { id, status } => {
            let mut repo = TaskRepository::new(store);
            repo.load_all().await?;
            if repo.move_task(id, status).await? {
                println!("Moved task #{} to {}", id, status);
            } else {
                println!("Task #{} is already in {}", id, status);
            }
        }
        Command::Delete { id } => {
            let mut repo = TaskRepository::new(store);
            repo.load_all().await?;
            repo.delete(id).await?;
            println!("Deleted task #{}", id);
        }
        Command::Search { query } => {
            let mut repo = TaskRepository::new(store);
            repo.load_all().await?;
            for task in repo.search(&query) {
                println!("#{} [{}] {}", task.id, task.status, task.title);
            }
        }
        Command::Contacts { user } => {
            let session = session_file.load().await?;
            let user_id = user.unwrap_or_else(|| contact_namespace(session.as_ref()).to_string());
            let mut contacts = ContactRepository::new(store, user_id);
            for contact in contacts.load_all().await? {
                println!(
                    "{:>3} {} <{}> {}",
                    contact.key, contact.name, contact.email, contact.phone
                );
            }
        }
        Command::Signup {
            name,
            email,
            password,
        } => {
            let user = UserDirectory::new(store)
                .sign_up(&name, &email, &password)
                .await?;
            println!("Registered {} as user {}", user.name, user.key);
        }
        Command::Login { email, password } => {
            let session = UserDirectory::new(store).log_in(&email, &password).await?;
            session_file.save(&session).await?;
            println!("Welcome, {} ({})", session.username, session.initials);
        }
        Command::Logout => {
            session_file.clear().await?;
            println!("Logged out");
        }
    }

    Ok(())
}
