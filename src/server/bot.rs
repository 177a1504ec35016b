//! Synthetic AI client. Used both by the server's `--bots N` demo slots and
//! as the building block for the client's stress mode.
//!
//! Movement is a random walk that avoids the immediately-previous opposite
//! direction (the server would reject it anyway); there is no pathfinding
//! toward food, since the point of this harness is load, not a convincing
//! opponent.

use std::net::TcpStream;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::wire::{self, opcode, LoginReqPayload, LoginRespPayload};
use crate::world::Direction;

const POLL_TIMEOUT_MS: u64 = 200;

pub fn run(port: u16, name: &str) -> Result<(), ClientError> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).map_err(|source| {
        ClientError::Connect {
            host: "127.0.0.1".to_string(),
            port,
            source,
        }
    })?;

    let login = LoginReqPayload {
        name: name.to_string(),
        is_ai: true,
    };
    wire::send(&mut stream, opcode::LOGIN_REQ, &login.encode())?;

    let (op, payload) = wire::recv(&mut stream)?;
    if op == opcode::ERROR {
        return Err(ClientError::LoginRejected(
            String::from_utf8_lossy(&payload).into_owned(),
        ));
    }
    let resp = LoginRespPayload::decode(&payload).ok_or(ClientError::NoLoginResponse)?;
    debug!(player_id = resp.player_id, name, "bot joined");

    let mut rng = rand::thread_rng();
    let directions = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
    let mut current = directions[rng.gen_range(0..4)];

    loop {
        match wire::recv_with_deadline(&mut stream, POLL_TIMEOUT_MS) {
            Ok((opcode::MAP_UPDATE, _)) => {
                if rng.gen_bool(0.2) {
                    let candidate = directions[rng.gen_range(0..4)];
                    if candidate != current.opposite() {
                        current = candidate;
                        wire::send(&mut stream, opcode::MOVE, &[current.to_wire()])?;
                    }
                }
            }
            Ok(_) => {}
            Err(e) if e.is_timeout() => {}
            Err(e) => {
                warn!(name, error = %e, "bot disconnected");
                return Ok(());
            }
        }
    }
}
