#[cfg(feature = "client")]
mod client;
mod config;
mod error;
#[cfg(feature = "server")]
mod server;
#[cfg(feature = "server")]
mod session;
#[cfg(feature = "server")]
mod simulator;
mod wire;
#[cfg(feature = "server")]
mod worker;
mod world;

use clap::{Parser, Subcommand};

use config::{ClientConfig, ServerConfig, DEFAULT_PORT};

#[derive(Parser)]
#[command(name = "multisnake", version, about = "A multiplayer online snake game")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run as the game server
    #[cfg(feature = "server")]
    Server {
        /// Port to listen on
        #[arg(default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Number of server-spawned AI clients to keep running
        #[cfg(feature = "bots")]
        #[arg(short, long, default_value_t = 0)]
        bots: u16,
    },

    /// Connect to a server as a client
    #[cfg(feature = "client")]
    Client {
        #[arg(short = 'h', long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
        port: u16,

        #[arg(short = 'n', long)]
        name: String,

        /// Stress mode: connect N synthetic clients instead of one interactive session
        #[cfg(feature = "bots")]
        #[arg(short = 's', long, value_name = "N", num_args = 0..=1, default_missing_value = "100")]
        stress: Option<usize>,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        #[cfg(feature = "server")]
        Command::Server {
            port,
            #[cfg(feature = "bots")]
            bots,
        } => {
            #[cfg(not(feature = "bots"))]
            let bots = 0;
            server::run(ServerConfig { port, bots }).map_err(|e| e.to_string())
        }
        #[cfg(feature = "client")]
        Command::Client {
            host,
            port,
            name,
            #[cfg(feature = "bots")]
            stress,
        } => {
            #[cfg(not(feature = "bots"))]
            let stress: Option<usize> = None;
            run_client(host, port, name, stress)
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

#[cfg(feature = "client")]
fn run_client(host: String, port: u16, name: String, stress: Option<usize>) -> Result<(), String> {
    let config = ClientConfig {
        host,
        port,
        name,
        stress,
    };

    #[cfg(feature = "bots")]
    if let Some(count) = config.stress {
        return client::stress::run(&config.host, config.port, count).map_err(|e| e.to_string());
    }

    client::run(config).map_err(|e| e.to_string())
}
