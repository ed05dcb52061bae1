mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use dockside_bridge::Dockside;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dockside")]
#[command(about = "Manage Colima VMs and the containers inside them", long_about = None)]
struct Cli {
    /// VM profile (defaults to the configured default profile)
    #[arg(short, long, global = true, env = "DOCKSIDE_PROFILE")]
    profile: Option<String>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the VM status
    Status,
    /// List all VM profiles
    Ls,
    /// Start the VM
    Start {
        /// CPU cores
        #[arg(long)]
        cpu: Option<u32>,
        /// Memory in GiB
        #[arg(long)]
        memory: Option<u32>,
        /// Disk size in GiB
        #[arg(long)]
        disk: Option<u32>,
        /// Container runtime
        #[arg(long, value_parser = ["docker", "containerd"])]
        runtime: Option<String>,
    },
    /// Stop the VM
    Stop,
    /// Restart the VM with default settings
    Restart,
    /// Delete the VM
    Delete {
        /// Delete even when the VM is running
        #[arg(short, long)]
        force: bool,
    },
    /// Re-read the VM status and every inventory
    Refresh,
    /// List containers
    Ps {
        /// Include stopped containers
        #[arg(short, long)]
        all: bool,
    },
    /// List images
    Images,
    /// List volumes
    Volumes,
    /// List networks
    Networks,
    /// Show docker engine information
    Info,
    /// Show docker disk usage
    Df,
    /// Show aggregate CPU / memory usage
    Usage,
    /// Container operations
    #[command(subcommand)]
    Container(ContainerCommands),
    /// Image operations
    #[command(subcommand)]
    Image(ImageCommands),
    /// Volume operations
    #[command(subcommand)]
    Volume(VolumeCommands),
    /// Network operations
    #[command(subcommand)]
    Network(NetworkCommands),
    /// Run the MCP server on stdio
    Mcp,
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ContainerCommands {
    /// Start a container
    Start { id: String },
    /// Stop a container
    Stop { id: String },
    /// Restart a container
    Restart { id: String },
    /// Remove a container
    Rm {
        id: String,
        /// Remove a running container
        #[arg(short, long)]
        force: bool,
    },
    /// Show container logs
    Logs {
        id: String,
        /// Number of lines from the end
        #[arg(short = 'n', long)]
        tail: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ImageCommands {
    /// Pull an image
    Pull { image: String },
    /// Remove an image
    Rm {
        id: String,
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum VolumeCommands {
    /// Create a volume
    Create { name: String },
    /// Remove a volume
    Rm {
        name: String,
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum NetworkCommands {
    /// Create a network
    Create {
        name: String,
        /// Network driver
        #[arg(short, long)]
        driver: Option<String>,
    },
    /// Remove a network
    Rm { name: String },
}

fn env_filter(verbose: bool) -> tracing_subscriber::EnvFilter {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    if verbose {
        filter.add_directive(tracing::Level::DEBUG.into())
    } else {
        filter
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format!("✗ {:#}", e).red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {

    // stdout carries JSON-RPC, so the MCP server logs to a file
    if matches!(cli.command, Commands::Mcp) {
        use std::fs::OpenOptions;
        let log_path = std::env::temp_dir().join("dockside-mcp.log");
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok();

        if let Some(file) = log_file {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_env_filter(env_filter(true))
                .with_ansi(false)
                .init();
        }

        let config = dockside_config::load()?;
        return dockside_mcp::run_server(Dockside::new(config)).await;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(cli.verbose))
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("dockside {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = dockside_config::load()?;
    let dockside = Dockside::new(config);
    let vm = cli.profile.unwrap_or_default();
    let json = cli.json;

    match cli.command {
        Commands::Status => commands::vm::status(&dockside, &vm, json).await?,
        Commands::Ls => commands::vm::list(&dockside, json).await?,
        Commands::Start {
            cpu,
            memory,
            disk,
            runtime,
        } => commands::vm::start(&dockside, &vm, cpu, memory, disk, runtime.as_deref(), json).await?,
        Commands::Stop => commands::vm::stop(&dockside, &vm, json).await?,
        Commands::Restart => commands::vm::restart(&dockside, &vm, json).await?,
        Commands::Delete { force } => commands::vm::delete(&dockside, &vm, force, json).await?,
        Commands::Refresh => commands::vm::refresh(&dockside, &vm, json).await?,
        Commands::Ps { all } => commands::inventory::ps(&dockside, &vm, all, json).await?,
        Commands::Images => commands::inventory::images(&dockside, &vm, json).await?,
        Commands::Volumes => commands::inventory::volumes(&dockside, &vm, json).await?,
        Commands::Networks => commands::inventory::networks(&dockside, &vm, json).await?,
        Commands::Info => commands::inventory::info(&dockside, &vm).await?,
        Commands::Df => commands::inventory::df(&dockside, &vm, json).await?,
        Commands::Usage => commands::inventory::usage(&dockside, &vm, json).await?,
        Commands::Container(cmd) => match cmd {
            ContainerCommands::Start { id } => {
                commands::report(&dockside.start_container(&vm, &id).await, json)?
            }
            ContainerCommands::Stop { id } => {
                commands::report(&dockside.stop_container(&vm, &id).await, json)?
            }
            ContainerCommands::Restart { id } => {
                commands::report(&dockside.restart_container(&vm, &id).await, json)?
            }
            ContainerCommands::Rm { id, force } => {
                commands::report(&dockside.remove_container(&vm, &id, force).await, json)?
            }
            ContainerCommands::Logs { id, tail } => {
                commands::resource::logs(&dockside, &vm, &id, tail, json).await?
            }
        },
        Commands::Image(cmd) => match cmd {
            ImageCommands::Pull { image } => {
                if !json {
                    println!("Pulling {}...", image);
                }
                commands::report(&dockside.pull_image(&vm, &image).await, json)?
            }
            ImageCommands::Rm { id, force } => {
                commands::report(&dockside.remove_image(&vm, &id, force).await, json)?
            }
        },
        Commands::Volume(cmd) => match cmd {
            VolumeCommands::Create { name } => {
                commands::report(&dockside.create_volume(&vm, &name).await, json)?
            }
            VolumeCommands::Rm { name, force } => {
                commands::report(&dockside.remove_volume(&vm, &name, force).await, json)?
            }
        },
        Commands::Network(cmd) => match cmd {
            NetworkCommands::Create { name, driver } => commands::report(
                &dockside.create_network(&vm, &name, driver.as_deref()).await,
                json,
            )?,
            NetworkCommands::Rm { name } => {
                commands::report(&dockside.remove_network(&vm, &name).await, json)?
            }
        },
        Commands::Mcp | Commands::Version => {}
    }

    Ok(())
}
