use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use roomdrop::client::{
    ClientConfig, ClientEvent, DirectorySink, Engine, EngineHandle, LocalFile, TransportConfig,
};
use roomdrop::server::{ServerConfig, bind, serve};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_SERVER: &str = "ws://127.0.0.1:3000/ws";
const DEFAULT_LOG_FILTER: &str = "warn,roomdrop_client=info,roomdrop_server=info";

#[derive(Parser)]
#[command(name = "roomdrop")]
#[command(bin_name = "roomdrop")]
#[command(about = "Hand a file to whoever joins the same room", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RoomArgs {
    /// WebSocket URL of the relay.
    #[arg(long, default_value = DEFAULT_SERVER)]
    server: String,

    #[arg(long)]
    room: String,

    /// Gather host candidates only, without asking a STUN server.
    #[arg(long)]
    no_stun: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay.
    Serve {
        /// Overrides ROOMDROP_ADDR.
        #[arg(long)]
        addr: Option<SocketAddr>,

        /// Overrides ROOMDROP_ROOM_CAPACITY.
        #[arg(long)]
        room_capacity: Option<usize>,
    },

    /// Offer a file to the first roommate.
    Send {
        #[command(flatten)]
        room: RoomArgs,

        file: PathBuf,
    },

    /// Wait for a file and save it.
    Receive {
        #[command(flatten)]
        room: RoomArgs,

        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Commands::Serve {
            addr,
            room_capacity,
        } => run_serve(addr, room_capacity).await,
        Commands::Send { room, file } => run_send(room, file).await,
        Commands::Receive { room, out } => run_receive(room, out).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_serve(addr: Option<SocketAddr>, room_capacity: Option<usize>) -> Result<()> {
    let mut config = ServerConfig::from_env()?;
    if let Some(addr) = addr {
        config.addr = addr;
    }
    if let Some(capacity) = room_capacity {
        if capacity == 0 {
            bail!("--room-capacity must be at least 1");
        }
        config.room_capacity = capacity;
    }

    let listener = bind(&config).await?;
    println!(
        "{} {}",
        "🚀 Relay listening on".green().bold(),
        format!("ws://{}/ws", listener.local_addr()?).cyan()
    );
    serve(listener, config).await?;
    Ok(())
}

async fn connect(args: &RoomArgs, out: PathBuf) -> Result<EngineHandle> {
    debug!("Connecting to {} for room '{}'", args.server, args.room);
    let config = ClientConfig {
        server_url: args.server.clone(),
        transport: if args.no_stun {
            TransportConfig::local()
        } else {
            TransportConfig::default()
        },
        ..ClientConfig::default()
    };
    let handle = Engine::start(config, Arc::new(DirectorySink::new(out)))
        .await
        .with_context(|| format!("Could not reach relay at {}", args.server))?;
    handle.join_room(args.room.as_str()).await?;
    println!("{} '{}'", "📡 Joining room".cyan(), args.room);
    Ok(handle)
}

async fn run_send(args: RoomArgs, path: PathBuf) -> Result<()> {
    let file = LocalFile::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut handle = connect(&args, PathBuf::from(".")).await?;
    let mut offered = false;

    let result = loop {
        let Some(event) = handle.next_event().await else {
            break Err(anyhow::anyhow!("Client stopped unexpectedly"));
        };
        match event {
            ClientEvent::Joined { my_id, .. } => {
                println!("   joined as {}", my_id.to_string().dimmed());
                if handle.state().peers.is_empty() {
                    println!("{}", "⏳ Waiting for a roommate...".yellow());
                    continue;
                }
            }
            ClientEvent::PeerJoined(peer) => {
                println!("{} {}", "👋 Roommate arrived:".cyan(), peer);
            }
            ClientEvent::RoomFull(room) => break Err(anyhow::anyhow!("Room '{}' is full", room)),
            ClientEvent::TransferCompleted { info, .. } => {
                // Only the local side of the hand-off is known here.
                let name = info.map(|i| i.name).unwrap_or_default();
                println!("{} {}", "✨ Sent".green().bold(), name);
                break Ok(());
            }
            ClientEvent::TransferFailed { reason, state, .. } => {
                break Err(anyhow::anyhow!("Transfer failed during {:?}: {}", state, reason));
            }
            ClientEvent::Disconnected if offered => {
                println!("{}", "⚠️  Lost the relay, finishing over the direct channel".yellow());
            }
            ClientEvent::Disconnected => break Err(anyhow::anyhow!("Lost the relay")),
            ClientEvent::IncomingFile { from, info } => {
                println!("   {} offered '{}' as well", from, info.name);
                continue;
            }
        }

        if !offered && !handle.state().peers.is_empty() {
            let info = handle.send_files(vec![file.clone()]).await?;
            println!(
                "{} {} ({} bytes)",
                "📦 Offering".cyan(),
                info.name.bold(),
                info.size
            );
            offered = true;
        }
    };

    handle.shutdown().await;
    result
}

async fn run_receive(args: RoomArgs, out: PathBuf) -> Result<()> {
    let mut handle = connect(&args, out).await?;
    let mut receiving = false;

    let result = loop {
        let Some(event) = handle.next_event().await else {
            break Err(anyhow::anyhow!("Client stopped unexpectedly"));
        };
        match event {
            ClientEvent::Joined { my_id, .. } => {
                println!("   joined as {}", my_id.to_string().dimmed());
                println!("{}", "⏳ Waiting for a file...".yellow());
            }
            ClientEvent::PeerJoined(peer) => {
                println!("{} {}", "👋 Roommate arrived:".cyan(), peer);
            }
            ClientEvent::IncomingFile { from, info } => {
                println!(
                    "{} {} ({} bytes) from {}",
                    "📥 Receiving".cyan(),
                    info.name.bold(),
                    info.size,
                    from
                );
                receiving = true;
            }
            ClientEvent::TransferCompleted {
                saved_to: Some(path),
                ..
            } => {
                println!("{} {}", "✨ Saved to".green().bold(), path.display());
                break Ok(());
            }
            ClientEvent::TransferCompleted { .. } => {}
            ClientEvent::RoomFull(room) => break Err(anyhow::anyhow!("Room '{}' is full", room)),
            ClientEvent::TransferFailed { reason, state, .. } => {
                break Err(anyhow::anyhow!("Transfer failed during {:?}: {}", state, reason));
            }
            ClientEvent::Disconnected if receiving => {
                println!("{}", "⚠️  Lost the relay, finishing over the direct channel".yellow());
            }
            ClientEvent::Disconnected => break Err(anyhow::anyhow!("Lost the relay")),
        }
    };

    handle.shutdown().await;
    result
}
