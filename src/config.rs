//! Protocol and simulation constants, plus the small per-binary config structs
//! that the CLI layer fills in from flags.

/// Width of the playable grid, in cells (including the wall border).
pub const GRID_WIDTH: u16 = 50;
/// Height of the playable grid, in cells (including the wall border).
pub const GRID_HEIGHT: u16 = 50;

pub const MAX_PLAYERS: usize = 100;
pub const MAX_SNAKE_LEN: usize = 200;
pub const MAX_FOOD: usize = 20;
/// Stored name length including the NUL terminator; 15 bytes are usable.
pub const MAX_NAME_LEN: usize = 16;
/// Stored chat text length including the NUL terminator; 127 bytes are usable.
pub const MAX_CHAT_TEXT_LEN: usize = 128;
pub const MAX_CHAT_HISTORY: usize = 50;
pub const NUM_COLORS: u8 = 7;

pub const GAME_TICK_MS: u64 = 100;
pub const RESPAWN_TICKS: u32 = 30;
pub const PROTECTION_TICKS: u32 = 30;
pub const FOOD_SPAWN_INTERVAL_MS: u64 = 3_000;

pub const DEFAULT_PORT: u16 = 8888;
pub const MAX_PAYLOAD_SIZE: u32 = 65_536;
pub const XOR_KEY: u8 = 0x5A;

/// Number of symmetric acceptor threads the server runs. Each clones the
/// listening socket and calls `accept` independently; the kernel's accept
/// queue serializes the handoff, so no coordination between them is needed.
/// Every accepted connection gets its own dedicated session thread (see
/// `worker.rs`), so this constant bounds acceptor parallelism, not the
/// number of live connections.
pub const NUM_WORKERS: usize = 4;

/// How often a live session polls its socket for new frames while also
/// pushing map/chat updates. Stands in for the `select` readiness deadline
/// of a multiplexed worker in the spec this was generalized from.
pub const SESSION_IO_INTERVAL_MS: u64 = 50;

/// How long the handshake is allowed to wait for the initial LOGIN_REQ.
pub const HANDSHAKE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Number of server-spawned AI clients to keep running at all times.
    pub bots: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bots: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    /// `Some(n)` puts the client into stress mode with `n` synthetic peers
    /// instead of the interactive session.
    pub stress: Option<usize>,
}
