//! fabric-ctl: command-line interface for the fabric daemon.

use anyhow::{Context, Result};

mod cmd;

use cmd::{nodes, status};

const DEFAULT_PORT: u16 = 9101;

fn print_usage() {
    println!("Usage: fabric-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status        Show network-wide storage and bandwidth stats");
    println!("  nodes         List nodes with storage and links");
    println!("  node <id>     Show one node's metrics");
    println!("  transfers     List transfers still in flight");
    println!("  files <id>    List files stored on a node");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => status::cmd_status(port).await,
        ["transfers"] => status::cmd_transfers(port).await,
        ["nodes"] => nodes::cmd_nodes(port).await,
        ["node", id] => nodes::cmd_node(port, id).await,
        ["files", id] => nodes::cmd_files(port, id).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            print_usage();
            std::process::exit(1);
        }
    }
}
