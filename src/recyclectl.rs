//! recyclectl: workstation CLI for inspecting the recycler's view of a cluster
//!
//! - `recyclectl nodes` - list eligible nodes with their ages
//! - `recyclectl victim` - show the node the next cycle would select

use std::process;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use kube::Client;

use node_recycler::clients::kubernetes::KubeClusterClient;
use node_recycler::config::DEFAULT_ELIGIBILITY_LABEL;
use node_recycler::error::Result;
use node_recycler::node::NodeRecord;
use node_recycler::recycler::{inventory, selector};

#[derive(Parser)]
#[command(name = "recyclectl")]
#[command(about = "Inspect preemptible nodes subject to age-based recycling", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Label marking nodes as eligible for recycling
    #[arg(short, long, global = true, default_value = DEFAULT_ELIGIBILITY_LABEL)]
    label: String,

    /// Output format (table, json)
    #[arg(short, long, global = true, default_value = "table")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List eligible nodes with their ages
    Nodes,
    /// Show the node the next cycle would select
    Victim,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = Client::try_default().await?;
    let cluster = KubeClusterClient::new(client, cli.label.clone());
    let nodes = inventory::list_eligible_nodes(&cluster).await?;

    match cli.command {
        Commands::Nodes => {
            if cli.output == "json" {
                println!("{}", serde_json::to_string_pretty(&nodes)?);
            } else {
                print_node_table(&nodes);
            }
        }
        Commands::Victim => match selector::select_oldest(nodes) {
            Some(node) => {
                if cli.output == "json" {
                    println!("{}", serde_json::to_string_pretty(&node)?);
                } else {
                    println!("{} ({})", node.name, format_age(node.age(Utc::now())));
                }
            }
            None => println!("No eligible nodes found"),
        },
    }

    Ok(())
}

fn print_node_table(nodes: &[NodeRecord]) {
    if nodes.is_empty() {
        println!("No eligible nodes found");
        return;
    }

    let now = Utc::now();
    println!(
        "{:<45} {:<15} {:<10} {:<8}",
        "NAME", "ZONE", "AGE", "CORDONED"
    );
    for node in nodes {
        println!(
            "{:<45} {:<15} {:<10} {:<8}",
            node.name,
            node.zone,
            format_age(node.age(now)),
            node.cordoned
        );
    }
}

fn format_age(age: Duration) -> String {
    let hours = age.as_secs_f64() / 3600.0;
    if hours >= 1.0 {
        format!("{:.1}h", hours)
    } else {
        format!("{}m", age.as_secs() / 60)
    }
}
