use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use work_rollup::db::Database;
use work_rollup::models::*;
use work_rollup::service::RollupService;

#[derive(Parser)]
#[command(name = "wrlp")]
#[command(about = "Hierarchical work-item tracking with derived parent progress")]
struct Cli {
    /// Path to the database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a work item
    Add {
        title: String,

        /// Parent item id; omit to create a root item
        #[arg(short, long)]
        parent: Option<Uuid>,

        /// Estimated hours
        #[arg(short, long)]
        estimate: Option<f64>,

        /// Completion percentage (0-100)
        #[arg(long, default_value = "0")]
        progress: u8,

        /// Initial status (open, in_progress, on_hold, closed, rejected)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Update a work item's fields
    Update {
        id: Uuid,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        estimate: Option<f64>,

        /// Clear the estimate ("not estimated" rather than zero)
        #[arg(long, conflicts_with = "estimate")]
        clear_estimate: bool,

        /// Completion percentage (0-100)
        #[arg(long)]
        progress: Option<u8>,
    },
    /// Mark a work item closed
    Close { id: Uuid },
    /// Show a single work item
    Show {
        id: Uuid,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the item tree (all roots, or the subtree under an item)
    Tree { id: Option<Uuid> },
    /// Delete a work item and its subtree
    Delete { id: Uuid },
    /// Recompute an item's derived fields from its children
    Recompute { id: Uuid },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "work_rollup=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_status(s: &str) -> anyhow::Result<WorkItemStatus> {
    WorkItemStatus::from_str(s)
        .ok_or_else(|| anyhow::anyhow!("Unknown status '{}' (expected one of: open, in_progress, on_hold, closed, rejected)", s))
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn print_item(item: &WorkItem) {
    let estimate = item
        .estimated_hours
        .map_or_else(|| "-".to_string(), |h| format!("{}h", h));
    println!(
        "{}  [{}] {:>3}% {:>6}  {}",
        item.id,
        item.status.as_str(),
        item.done_ratio,
        estimate,
        item.title
    );
}

fn print_tree(node: &WorkItemTreeNode, depth: usize) {
    print!("{}", "  ".repeat(depth));
    print_item(&node.item);
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let db = open_database(cli.db)?;
    let service = RollupService::new(db.clone());

    match cli.command {
        Commands::Add {
            title,
            parent,
            estimate,
            progress,
            status,
        } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let item = db.create_work_item(CreateWorkItemInput {
                parent_id: parent,
                title,
                status,
                estimated_hours: estimate,
                done_ratio: Some(progress),
            })?;
            service.recompute_ancestors(item.id)?;
            print_item(&item);
        }
        Commands::Update {
            id,
            title,
            status,
            estimate,
            clear_estimate,
            progress,
        } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let estimated_hours = if clear_estimate {
                Some(None)
            } else {
                estimate.map(Some)
            };
            let item = db
                .update_work_item(
                    id,
                    UpdateWorkItemInput {
                        title,
                        status,
                        estimated_hours,
                        done_ratio: progress,
                    },
                )?
                .ok_or_else(|| anyhow::anyhow!("Work item not found"))?;
            service.recompute_ancestors(id)?;
            print_item(&item);
        }
        Commands::Close { id } => {
            let item = db
                .update_work_item(
                    id,
                    UpdateWorkItemInput {
                        title: None,
                        status: Some(WorkItemStatus::Closed),
                        estimated_hours: None,
                        done_ratio: None,
                    },
                )?
                .ok_or_else(|| anyhow::anyhow!("Work item not found"))?;
            service.recompute_ancestors(id)?;
            print_item(&item);
        }
        Commands::Show { id, json } => {
            let item = db
                .get_work_item(id)?
                .ok_or_else(|| anyhow::anyhow!("Work item not found"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else {
                print_item(&item);
            }
        }
        Commands::Tree { id } => match id {
            Some(id) => {
                let tree = db
                    .get_work_item_tree(id)?
                    .ok_or_else(|| anyhow::anyhow!("Work item not found"))?;
                print_tree(&tree, 0);
            }
            None => {
                for root in db.get_roots()? {
                    if let Some(tree) = db.get_work_item_tree(root.id)? {
                        print_tree(&tree, 0);
                    }
                }
            }
        },
        Commands::Delete { id } => {
            // Ancestors shrink when a subtree disappears; grab the parent first.
            let parent_id = db.get_work_item(id)?.and_then(|i| i.parent_id);
            if !db.delete_work_item(id)? {
                anyhow::bail!("Work item not found");
            }
            if let Some(parent_id) = parent_id {
                service.recompute(parent_id)?;
                service.recompute_ancestors(parent_id)?;
            }
            println!("Deleted {}", id);
        }
        Commands::Recompute { id } => {
            let item = service.recompute(id)?;
            print_item(&item);
        }
    }

    Ok(())
}
