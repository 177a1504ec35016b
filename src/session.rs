//! Per-connection session state machine: handshake, intent ingestion,
//! heartbeat, chat emission, orderly teardown. Each session owns one OS
//! thread (see `worker.rs` for why) that both reads inbound frames and
//! pushes map/chat updates, alternating on a short read timeout.

use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{HANDSHAKE_TIMEOUT_SECS, MAX_CHAT_HISTORY, SESSION_IO_INTERVAL_MS};
use crate::wire::{self, opcode, ChatRecvPayload, LoginReqPayload, LoginRespPayload, MapUpdatePayload};
use crate::world::{Direction, World};

#[derive(Debug, PartialEq, Eq)]
enum State {
    Handshake,
    Live,
    Closing,
}

pub struct Session {
    stream: TcpStream,
    world: Arc<Mutex<World>>,
    state: State,
    slot: Option<usize>,
    last_map_tick: Option<u64>,
    last_chat_idx: u64,
}

impl Session {
    /// Spawns the session's dedicated thread and returns immediately.
    pub fn spawn(stream: TcpStream, world: Arc<Mutex<World>>) {
        std::thread::spawn(move || {
            let peer = stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".to_string());

            let mut session = Session {
                stream,
                world,
                state: State::Handshake,
                slot: None,
                last_map_tick: None,
                last_chat_idx: 0,
            };

            if let Err(e) = session.run() {
                debug!(%peer, error = %e, "session ended");
            }
        });
    }

    fn run(&mut self) -> std::io::Result<()> {
        self.stream
            .set_read_timeout(Some(Duration::from_secs(HANDSHAKE_TIMEOUT_SECS)))?;

        if !self.handshake() {
            return Ok(());
        }

        self.stream
            .set_read_timeout(Some(Duration::from_millis(SESSION_IO_INTERVAL_MS)))?;

        while self.state == State::Live {
            self.broadcast_tick();
            self.broadcast_chat();
            self.poll_one_frame();
        }

        self.close();
        Ok(())
    }

    /// Accepts exactly one LOGIN_REQ, claims a slot (or rejects if full),
    /// and transitions to LIVE. Returns `false` if the handshake did not
    /// reach LIVE (full server, bad frame, or transport failure).
    fn handshake(&mut self) -> bool {
        let (op, payload) = match wire::recv(&mut self.stream) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "handshake read failed");
                return false;
            }
        };

        if op != opcode::LOGIN_REQ {
            return false;
        }

        let login = match LoginReqPayload::decode(&payload) {
            Some(l) => l,
            None => return false,
        };

        let mut world = self.world.lock().unwrap();
        let slot = match world.claim_slot(&login.name, login.is_ai) {
            Some(slot) => slot,
            None => {
                drop(world);
                let _ = wire::send(&mut self.stream, opcode::ERROR, b"Server Full");
                info!(name = %login.name, "rejected login, server full");
                return false;
            }
        };

        let (sx, sy) = crate::simulator::find_spawn_pos(&world);
        crate::simulator::init_snake(&mut world.players[slot].snake, sx, sy);
        world.players[slot].spawn_protection = crate::config::PROTECTION_TICKS;

        let session_id = world.players[slot].session_id;
        let color = world.players[slot].color;
        let width = world.width;
        let height = world.height;
        self.last_chat_idx = world.chat_count();
        world.append_chat(0, "SYSTEM", &format!("{} joined!", login.name));
        drop(world);

        let resp = LoginRespPayload {
            player_id: session_id,
            color,
            grid_width: width,
            grid_height: height,
        };
        if wire::send(&mut self.stream, opcode::LOGIN_RESP, &resp.encode()).is_err() {
            let mut world = self.world.lock().unwrap();
            world.release_slot(slot);
            return false;
        }

        info!(name = %login.name, slot, "player joined");
        self.slot = Some(slot);
        self.state = State::Live;
        true
    }

    fn broadcast_tick(&mut self) {
        if self.slot.is_none() {
            return;
        }

        let map_update = {
            let world = self.world.lock().unwrap();
            if self.last_map_tick == Some(world.tick) {
                return;
            }
            let (scores, alive, active, names) = world.scoreboard_snapshot();
            let payload = MapUpdatePayload {
                tick: world.tick,
                width: world.width,
                height: world.height,
                map: world.grid_bytes(),
                scores,
                alive,
                active,
                names,
            };
            (payload, world.tick)
        };

        let (payload, tick) = map_update;
        if wire::send(&mut self.stream, opcode::MAP_UPDATE, &payload.encode()).is_ok() {
            self.last_map_tick = Some(tick);
        } else {
            self.state = State::Closing;
        }
    }

    fn broadcast_chat(&mut self) {
        if self.state != State::Live {
            return;
        }

        let (pending, count): (Vec<ChatRecvPayload>, u64) = {
            let world = self.world.lock().unwrap();
            let count = world.chat_count();
            let n = (count - self.last_chat_idx).min(MAX_CHAT_HISTORY as u64);
            let start = count - n;
            let pending = (0..n)
                .map(|k| {
                    let msg = world.chat_at(start + k);
                    ChatRecvPayload {
                        sender_id: msg.sender_id,
                        sender_name: msg.sender_name.clone(),
                        text: msg.text.clone(),
                    }
                })
                .collect();
            (pending, count)
        };

        for msg in &pending {
            if wire::send(&mut self.stream, opcode::CHAT_RECV, &msg.encode()).is_err() {
                self.state = State::Closing;
                return;
            }
        }
        self.last_chat_idx = count;
    }

    fn poll_one_frame(&mut self) {
        let (op, payload) = match wire::recv(&mut self.stream) {
            Ok(frame) => frame,
            Err(e) if e.is_timeout() => return,
            Err(_) => {
                self.state = State::Closing;
                return;
            }
        };

        match op {
            opcode::MOVE => self.handle_move(&payload),
            opcode::CHAT_SEND => self.handle_chat(&payload),
            opcode::HEARTBEAT => {
                let _ = wire::send(&mut self.stream, opcode::HEARTBEAT_ACK, &[]);
            }
            opcode::LOGOUT => self.state = State::Closing,
            _ => {}
        }
    }

    fn handle_move(&mut self, payload: &[u8]) {
        let slot = match self.slot {
            Some(s) => s,
            None => return,
        };
        let Some(&code) = payload.first() else {
            return;
        };
        let Some(dir) = Direction::from_wire(code) else {
            return;
        };

        let mut world = self.world.lock().unwrap();
        if world.players[slot].snake.alive {
            world.queue_move(slot, dir);
        }
    }

    fn handle_chat(&mut self, payload: &[u8]) {
        let slot = match self.slot {
            Some(s) => s,
            None => return,
        };
        let Some(chat) = crate::wire::ChatSendPayload::decode(payload) else {
            return;
        };

        let mut world = self.world.lock().unwrap();
        let (id, name) = (world.players[slot].session_id, world.players[slot].name.clone());
        world.append_chat(id, &name, &chat.text);
    }

    fn close(&mut self) {
        if let Some(slot) = self.slot {
            let mut world = self.world.lock().unwrap();
            let name = world.players[slot].name.clone();
            world.release_slot(slot);
            world.append_chat(0, "SYSTEM", &format!("{name} left the game"));
            warn!(slot, "player left");
        }
    }
}
