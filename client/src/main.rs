//! `todos` - terminal front end for the todo list.
//!
//! Each invocation loads the list from the data directory, applies one
//! command, persists the result and prints the list. `watch` stays connected
//! to the server's push channel and prints items as other clients add them.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use todos_client::{
    ClientConfig, FileKeyValueStore, HttpSyncClient, ItemStore, PushChannel, TodoAction,
    TodoController, TodoEnvironment, TodoState,
};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "todos")]
#[command(about = "Manage a todo list shared through a todos server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the list
    List {
        /// Location path selecting the filter: /, /active or /completed
        #[arg(short, long, default_value = "/")]
        filter: String,
    },

    /// Add an item and submit it to the server
    Add {
        /// Title of the new item
        title: String,
    },

    /// Change an item's title; an empty title removes the item
    Edit {
        /// Position of the item, as shown by `list`
        index: usize,
        /// New title
        title: String,
    },

    /// Flip an item between active and completed
    Toggle {
        /// Position of the item, as shown by `list`
        index: usize,
    },

    /// Remove an item
    Remove {
        /// Position of the item, as shown by `list`
        index: usize,
    },

    /// Remove every completed item
    ClearCompleted,

    /// Mark every item completed
    MarkAll {
        /// Mark every item active instead
        #[arg(long)]
        undo: bool,
    },

    /// Print items pushed by the server until interrupted
    Watch,
}

type Controller = TodoController<FileKeyValueStore>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;

    let environment = if config.sync_enabled {
        let sync = HttpSyncClient::new(&config.server_url, config.sync_timeout())?;
        TodoEnvironment::new(Arc::new(sync))
    } else {
        TodoEnvironment::offline()
    };

    let items = ItemStore::new(FileKeyValueStore::new(&config.data_dir));
    let controller = TodoController::new(items, environment);

    match cli.command {
        Command::List { filter } => {
            controller.set_filter(filter).await?;
        },
        Command::Add { title } => {
            let mut handle = controller.add(title).await?;
            // Let the submission finish before the process exits
            if handle
                .wait_with_timeout(config.sync_timeout() + Duration::from_secs(1))
                .await
                .is_err()
            {
                eprintln!("Submission to {} did not finish", config.server_url);
            }
        },
        Command::Edit { index, title } => {
            apply(&controller, TodoAction::EditStart { index }).await?;
            apply(&controller, TodoAction::EditCommit { index, title }).await?;
        },
        Command::Toggle { index } => apply(&controller, TodoAction::Toggle { index }).await?,
        Command::Remove { index } => apply(&controller, TodoAction::Remove { index }).await?,
        Command::ClearCompleted => controller.clear_completed().await.map(drop)?,
        Command::MarkAll { undo } => controller.mark_all(!undo).await.map(drop)?,
        Command::Watch => return watch(&controller, &config).await,
    }

    print_list(&controller.snapshot().await);
    controller.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

/// Send an index-based action, turning a rejection into an error
async fn apply(controller: &Controller, action: TodoAction) -> Result<(), Box<dyn std::error::Error>> {
    controller.send(action).await?;
    match controller.snapshot().await.last_error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

async fn watch(controller: &Controller, config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let url = PushChannel::observers_url(&config.server_url);
    let channel = PushChannel::connect(&url).await?;
    println!("Watching {url} (Ctrl+C to stop)");

    let mut actions = controller.subscribe_actions();
    let printer = tokio::spawn(async move {
        while let Ok(action) = actions.recv().await {
            if let TodoAction::Received { item } = action {
                let status = if item.completed { "x" } else { " " };
                println!("  [{status}] {}", item.title);
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            let _ = shutdown_tx.send(());
        }
    });

    let delivered = channel.run(controller, shutdown_rx).await?;
    printer.abort();
    println!("{delivered} item(s) received");

    controller.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

fn print_list(state: &TodoState) {
    for (index, item) in state.visible_items() {
        let status = if item.completed { "x" } else { " " };
        println!("{index:>3} [{status}] {}", item.title);
    }
    println!(
        "{} remaining, {} completed (showing {})",
        state.remaining_count,
        state.completed_count,
        state.filter.path()
    );
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todos_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
