//! Acceptor pool: `NUM_WORKERS` symmetric threads, each cloning the listening
//! socket and accepting independently. The OS accept queue serializes the
//! handoff between them, so no coordination is needed. Every accepted
//! connection gets its own session thread (see `session.rs`).

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::config::NUM_WORKERS;
use crate::session::Session;
use crate::world::World;

pub fn run(listener: TcpListener, world: Arc<Mutex<World>>) -> std::io::Result<()> {
    let mut handles = Vec::with_capacity(NUM_WORKERS);

    for id in 0..NUM_WORKERS {
        let listener = listener.try_clone()?;
        let world = Arc::clone(&world);
        handles.push(std::thread::spawn(move || accept_loop(id, listener, world)));
    }

    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

fn accept_loop(id: usize, listener: TcpListener, world: Arc<Mutex<World>>) {
    info!(worker = id, "acceptor started");
    loop {
        if !world.lock().unwrap().running {
            break;
        }

        match listener.accept() {
            Ok((stream, addr)) => {
                info!(worker = id, %addr, "accepted connection");
                Session::spawn(stream, Arc::clone(&world));
            }
            Err(e) => {
                warn!(worker = id, error = %e, "accept failed");
            }
        }
    }
    info!(worker = id, "acceptor stopped");
}
