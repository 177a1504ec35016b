//! Non-interactive client: connects, logs in, and drives the wire protocol
//! end to end (login, move, chat, heartbeat, logout). Reports state via
//! `tracing` log lines rather than a rendered terminal — the raw-mode TUI
//! this was adapted from is out of scope here.

#[cfg(feature = "bots")]
pub mod stress;

use std::io::BufRead;
use std::net::TcpStream;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::wire::{
    self, opcode, ChatRecvPayload, ChatSendPayload, LoginReqPayload, LoginRespPayload,
    MapUpdatePayload,
};
use crate::world::Direction;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);

pub fn run(config: ClientConfig) -> Result<(), ClientError> {
    let mut stream =
        TcpStream::connect((config.host.as_str(), config.port)).map_err(|source| {
            ClientError::Connect {
                host: config.host.clone(),
                port: config.port,
                source,
            }
        })?;

    let login = LoginReqPayload {
        name: config.name.clone(),
        is_ai: false,
    };
    wire::send(&mut stream, opcode::LOGIN_REQ, &login.encode())?;

    let (op, payload) = wire::recv(&mut stream)?;
    if op == opcode::ERROR {
        let msg = String::from_utf8_lossy(&payload).into_owned();
        error!(reason = %msg, "login rejected");
        return Err(ClientError::LoginRejected(msg));
    }
    let resp = LoginRespPayload::decode(&payload).ok_or(ClientError::NoLoginResponse)?;
    info!(
        player_id = resp.player_id,
        color = resp.color,
        width = resp.grid_width,
        height = resp.grid_height,
        "joined"
    );

    let width = resp.grid_width;
    let height = resp.grid_height;

    let reader_stream = stream
        .try_clone()
        .map_err(crate::error::WireError::Io)?;
    let (input_tx, input_rx) = mpsc::channel::<String>();
    spawn_stdin_reader(input_tx);
    spawn_reader_thread(reader_stream, width, height);

    let mut last_heartbeat = Instant::now();
    loop {
        stream
            .set_read_timeout(Some(Duration::from_millis(100)))
            .map_err(crate::error::WireError::Io)?;

        if let Ok(line) = input_rx.try_recv() {
            let line = line.trim();
            if line == "/quit" {
                wire::send(&mut stream, opcode::LOGOUT, &[])?;
                break;
            } else if let Some(dir) = parse_direction(line) {
                wire::send(&mut stream, opcode::MOVE, &[dir.to_wire()])?;
            } else if !line.is_empty() {
                let chat = ChatSendPayload {
                    text: line.to_string(),
                };
                wire::send(&mut stream, opcode::CHAT_SEND, &chat.encode())?;
            }
        }

        if last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
            wire::send(&mut stream, opcode::HEARTBEAT, &[])?;
            last_heartbeat = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(20));
    }

    info!("disconnected");
    Ok(())
}

fn parse_direction(line: &str) -> Option<Direction> {
    match line {
        "w" => Some(Direction::Up),
        "s" => Some(Direction::Down),
        "a" => Some(Direction::Left),
        "d" => Some(Direction::Right),
        _ => None,
    }
}

fn spawn_stdin_reader(tx: mpsc::Sender<String>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

fn spawn_reader_thread(mut stream: TcpStream, width: u16, height: u16) {
    std::thread::spawn(move || loop {
        match wire::recv(&mut stream) {
            Ok((opcode::MAP_UPDATE, payload)) => {
                if let Some(update) = MapUpdatePayload::decode(&payload, width, height) {
                    log_map_update(&update);
                }
            }
            Ok((opcode::CHAT_RECV, payload)) => {
                if let Some(chat) = ChatRecvPayload::decode(&payload) {
                    log_chat(&chat);
                }
            }
            Ok((opcode::HEARTBEAT_ACK, _)) => {}
            Ok(_) => {}
            Err(e) if e.is_timeout() => {}
            Err(e) => {
                warn!(error = %e, "lost connection to server");
                break;
            }
        }
    });
}

fn log_map_update(update: &MapUpdatePayload) {
    let leaders: Vec<(usize, i32)> = update
        .scores
        .iter()
        .enumerate()
        .filter(|(i, _)| update.active.get(*i).copied().unwrap_or(0) != 0)
        .map(|(i, &s)| (i, s))
        .collect();
    info!(tick = update.tick, players = leaders.len(), "map update");
}

fn log_chat(chat: &ChatRecvPayload) {
    info!(sender = %chat.sender_name, text = %chat.text, "chat");
}
