use clap::{Parser, Subcommand};
use mini_share::{
    setup_logging, Config, Directory, Node, RegistryHandle, Result, TrackerClient, TrackerServer,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mini-share")]
#[command(about = "Tracker-directed P2P file sharing")]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracker
    Tracker {
        /// Address to listen on (host:port)
        #[arg(short, long, default_value = "127.0.0.1:4000")]
        listen: String,
    },
    /// Start a peer, share files and serve them until Ctrl+C
    Share {
        #[command(flatten)]
        peer: PeerArgs,
        /// Files to share, e.g. "/a/b.txt, /c/d.txt"
        #[arg(short, long)]
        files: Option<String>,
    },
    /// Download a file from another peer
    Download {
        #[command(flatten)]
        peer: PeerArgs,
        /// Peer that shares the file
        #[arg(long)]
        owner: String,
        /// Absolute path of the file as registered by its owner
        #[arg(long)]
        file: String,
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List everything the tracker knows about
    List {
        /// Tracker address (host:port)
        #[arg(short, long, default_value = "127.0.0.1:4000")]
        tracker: String,
    },
}

#[derive(clap::Args)]
struct PeerArgs {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Tracker address (host:port)
    #[arg(short, long)]
    tracker: Option<String>,
    /// Identifier to register under
    #[arg(long)]
    id: Option<String>,
    /// First port to try for the listener
    #[arg(short, long)]
    port: Option<u16>,
    /// Address to listen on and advertise
    #[arg(long)]
    ip: Option<String>,
}

impl PeerArgs {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(tracker) = self.tracker {
            config.tracker_addr = tracker;
        }
        if let Some(id) = self.id {
            config.node_id = id;
        }
        if let Some(port) = self.port {
            config.base_port = port;
        }
        if let Some(ip) = self.ip {
            config.listen_ip = ip;
        }
        config.validate()?;
        Ok(config)
    }
}

fn tracker_client(config: &Config) -> TrackerClient {
    TrackerClient::new(config.tracker_addr.clone())
        .with_timeout(Duration::from_millis(config.response_timeout_ms))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Tracker { listen } => {
            let server = TrackerServer::bind(&listen, RegistryHandle::spawn()).await?;
            let service = server.spawn()?;
            println!("Tracker listening on {}", service.local_addr());

            tokio::signal::ctrl_c().await?;
            service.shutdown().await;
        }
        Commands::Share { peer, files } => {
            let mut config = peer.into_config()?;
            if files.is_some() {
                config.shared_files = files;
            }
            let directory = tracker_client(&config);

            let mut node = Node::new(config, directory)?;
            let address = node.start().await?;
            println!("Peer {} serving on {}", node.id(), address);
            for path in node.shared_files().await? {
                println!("  {}", path);
            }

            tokio::signal::ctrl_c().await?;
            node.shutdown().await?;
        }
        Commands::Download {
            peer,
            owner,
            file,
            output,
        } => {
            let config = peer.into_config()?;
            let directory = tracker_client(&config);

            // Downloading does not need a listener or a registration.
            let node = Node::new(config, directory)?;
            let saved = node.download(&owner, &file, output.as_deref()).await?;
            println!("Download completed: {}", saved.display());
        }
        Commands::List { tracker } => {
            let records = TrackerClient::new(tracker).list_all().await?;

            println!("Shared files:");
            for record in records {
                println!("  {} @ {}", record.owner, record.address);
                for path in record.paths {
                    println!("    {}", path);
                }
            }
        }
    }

    Ok(())
}
