//! Top-level server wiring: construct the shared world, start the simulator,
//! bind the listener, launch the acceptor pool, optionally keep a handful of
//! AI bots alive.

#[cfg(feature = "bots")]
pub mod bot;

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::world::World;
use crate::{simulator, worker};

pub fn run(config: ServerConfig) -> Result<(), ServerError> {
    let world = Arc::new(Mutex::new(World::new()));

    let listener =
        TcpListener::bind(("0.0.0.0", config.port)).map_err(|source| ServerError::Bind {
            port: config.port,
            source,
        })?;
    info!(port = config.port, "listening");

    {
        let world = Arc::clone(&world);
        std::thread::spawn(move || simulator::run(world));
    }

    #[cfg(feature = "bots")]
    for i in 0..config.bots {
        let port = config.port;
        let name = format!("bot{i}");
        std::thread::spawn(move || {
            if let Err(e) = bot::run(port, &name) {
                tracing::warn!(error = %e, "bot exited");
            }
        });
    }

    worker::run(listener, world).map_err(|source| ServerError::Bind {
        port: config.port,
        source,
    })
}
