//! The authoritative world state: grid, player slots, food, chat ring.
//!
//! `World` is shared behind `Arc<Mutex<World>>` between the simulator thread
//! and every session thread. Every mutating method here assumes the caller
//! already holds the lock; none of them perform I/O or spawn anything.

use crate::config::{
    GRID_HEIGHT, GRID_WIDTH, MAX_CHAT_HISTORY, MAX_CHAT_TEXT_LEN, MAX_FOOD, MAX_NAME_LEN,
    MAX_PLAYERS, MAX_SNAKE_LEN, NUM_COLORS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall,
    Food,
    Snake(u16),
}

impl Cell {
    pub fn to_wire_byte(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Wall => 1,
            Cell::Food => 2,
            Cell::Snake(slot) => 10 + slot as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn from_wire(code: u8) -> Option<Self> {
        match code {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone)]
pub struct Snake {
    pub body: [Position; MAX_SNAKE_LEN],
    pub head_idx: usize,
    pub length: usize,
    pub direction: Direction,
    pub pending_dir: Direction,
    pub alive: bool,
}

impl Snake {
    fn placeholder() -> Self {
        Self {
            body: [Position::new(0, 0); MAX_SNAKE_LEN],
            head_idx: 0,
            length: 0,
            direction: Direction::Right,
            pending_dir: Direction::Right,
            alive: false,
        }
    }

    /// Cell at distance `i` behind the head (`i == 0` is the head itself).
    pub fn cell_from_head(&self, i: usize) -> Position {
        let idx = (self.head_idx + MAX_SNAKE_LEN - i) % MAX_SNAKE_LEN;
        self.body[idx]
    }

    pub fn head(&self) -> Position {
        self.cell_from_head(0)
    }

    pub fn occupies(&self, pos: Position) -> bool {
        (0..self.length).any(|i| self.cell_from_head(i) == pos)
    }
}

#[derive(Debug, Clone)]
pub struct PlayerSlot {
    pub active: bool,
    pub is_ai: bool,
    pub session_id: u32,
    pub name: String,
    pub score: i32,
    pub color: u8,
    pub spawn_protection: u32,
    pub respawn_timer: u32,
    pub snake: Snake,
}

impl PlayerSlot {
    fn empty() -> Self {
        Self {
            active: false,
            is_ai: false,
            session_id: 0,
            name: String::new(),
            score: 0,
            color: 0,
            spawn_protection: 0,
            respawn_timer: 0,
            snake: Snake::placeholder(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FoodEntry {
    pub pos: Position,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub sender_id: u32,
    pub sender_name: String,
    pub text: String,
}

impl ChatMessage {
    fn empty() -> Self {
        Self {
            sender_id: 0,
            sender_name: String::new(),
            text: String::new(),
        }
    }
}

pub struct World {
    pub width: u16,
    pub height: u16,
    grid: Vec<Cell>,
    pub players: Vec<PlayerSlot>,
    pub foods: Vec<FoodEntry>,
    chat_ring: Vec<ChatMessage>,
    chat_count: u64,
    pub tick: u64,
    next_session_id: u32,
    pub running: bool,
}

impl World {
    pub fn new() -> Self {
        let width = GRID_WIDTH;
        let height = GRID_HEIGHT;
        let mut grid = vec![Cell::Empty; width as usize * height as usize];

        for x in 0..width as i32 {
            for y in 0..height as i32 {
                if x == 0 || y == 0 || x == width as i32 - 1 || y == height as i32 - 1 {
                    grid[Self::index_of(width, x, y)] = Cell::Wall;
                }
            }
        }

        let mut world = Self {
            width,
            height,
            grid,
            players: (0..MAX_PLAYERS).map(|_| PlayerSlot::empty()).collect(),
            foods: vec![
                FoodEntry {
                    pos: Position::new(0, 0),
                    active: false,
                };
                MAX_FOOD
            ],
            chat_ring: (0..MAX_CHAT_HISTORY).map(|_| ChatMessage::empty()).collect(),
            chat_count: 0,
            tick: 0,
            next_session_id: 1,
            running: true,
        };

        // Seed the board with half the food cap so play starts on a full
        // board, matching the original's init_game_state.
        #[cfg(feature = "server")]
        for _ in 0..(MAX_FOOD / 2) {
            crate::simulator::spawn_food(&mut world);
        }

        world
    }

    fn index_of(width: u16, x: i32, y: i32) -> usize {
        y as usize * width as usize + x as usize
    }

    pub fn index(&self, x: i32, y: i32) -> usize {
        Self::index_of(self.width, x, y)
    }

    pub fn cell_at(&self, x: i32, y: i32) -> Cell {
        self.grid[self.index(x, y)]
    }

    pub fn set_cell(&mut self, x: i32, y: i32, cell: Cell) {
        let idx = self.index(x, y);
        self.grid[idx] = cell;
    }

    pub fn grid_bytes(&self) -> Vec<u8> {
        self.grid.iter().map(|c| c.to_wire_byte()).collect()
    }

    pub fn in_interior(&self, x: i32, y: i32) -> bool {
        x > 0 && y > 0 && x < self.width as i32 - 1 && y < self.height as i32 - 1
    }

    /// Finds the first inactive slot and reserves it for a new login. Returns
    /// `None` when the server is full.
    pub fn claim_slot(&mut self, name: &str, is_ai: bool) -> Option<usize> {
        let slot = self.players.iter().position(|p| !p.active)?;

        let truncated: String = name.chars().take(MAX_NAME_LEN - 1).collect();
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let player = &mut self.players[slot];
        *player = PlayerSlot::empty();
        player.active = true;
        player.is_ai = is_ai;
        player.session_id = session_id;
        player.name = truncated;
        player.color = (slot as u8 % NUM_COLORS) + 1;
        player.respawn_timer = 0;

        Some(slot)
    }

    pub fn release_slot(&mut self, slot: usize) {
        let player = &mut self.players[slot];
        player.active = false;
        player.snake.alive = false;
    }

    pub fn queue_move(&mut self, slot: usize, dir: Direction) {
        self.players[slot].snake.pending_dir = dir;
    }

    pub fn append_chat(&mut self, sender_id: u32, sender_name: &str, text: &str) {
        let idx = (self.chat_count % MAX_CHAT_HISTORY as u64) as usize;
        self.chat_ring[idx] = ChatMessage {
            sender_id,
            sender_name: sender_name.chars().take(MAX_NAME_LEN - 1).collect(),
            text: text.chars().take(MAX_CHAT_TEXT_LEN - 1).collect(),
        };
        self.chat_count += 1;
    }

    pub fn chat_count(&self) -> u64 {
        self.chat_count
    }

    pub fn chat_at(&self, index: u64) -> &ChatMessage {
        &self.chat_ring[(index % MAX_CHAT_HISTORY as u64) as usize]
    }

    pub fn scoreboard_snapshot(&self) -> (Vec<i32>, Vec<u8>, Vec<u8>, Vec<String>) {
        let scores = self.players.iter().map(|p| p.score).collect();
        let alive = self
            .players
            .iter()
            .map(|p| p.snake.alive as u8)
            .collect();
        let active = self.players.iter().map(|p| p.active as u8).collect();
        let names = self.players.iter().map(|p| p.name.clone()).collect();
        (scores, alive, active, names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_cells_are_walls() {
        let world = World::new();
        for x in 0..world.width as i32 {
            assert_eq!(world.cell_at(x, 0), Cell::Wall);
            assert_eq!(world.cell_at(x, world.height as i32 - 1), Cell::Wall);
        }
        for y in 0..world.height as i32 {
            assert_eq!(world.cell_at(0, y), Cell::Wall);
            assert_eq!(world.cell_at(world.width as i32 - 1, y), Cell::Wall);
        }
    }

    #[test]
    fn interior_cells_start_empty() {
        let world = World::new();
        assert_eq!(world.cell_at(5, 5), Cell::Empty);
        assert!(world.in_interior(5, 5));
        assert!(!world.in_interior(0, 5));
    }

    #[test]
    fn claim_slot_assigns_distinct_session_ids() {
        let mut world = World::new();
        let a = world.claim_slot("alice", false).unwrap();
        let b = world.claim_slot("bob", false).unwrap();
        assert_ne!(a, b);
        assert_ne!(world.players[a].session_id, world.players[b].session_id);
    }

    #[test]
    fn claim_slot_fails_when_full() {
        let mut world = World::new();
        for i in 0..MAX_PLAYERS {
            assert!(world.claim_slot(&format!("p{i}"), false).is_some());
        }
        assert!(world.claim_slot("overflow", false).is_none());
    }

    #[test]
    fn release_slot_frees_it_for_reuse() {
        let mut world = World::new();
        let slot = world.claim_slot("alice", false).unwrap();
        world.release_slot(slot);
        assert!(!world.players[slot].active);
        let reused = world.claim_slot("bob", false).unwrap();
        assert_eq!(reused, slot);
    }

    #[test]
    fn chat_ring_wraps_and_count_is_monotone() {
        let mut world = World::new();
        for i in 0..(MAX_CHAT_HISTORY + 5) {
            world.append_chat(1, "alice", &format!("msg{i}"));
        }
        assert_eq!(world.chat_count(), (MAX_CHAT_HISTORY + 5) as u64);
        let last = world.chat_at(world.chat_count() - 1);
        assert_eq!(last.text, format!("msg{}", MAX_CHAT_HISTORY + 4));
    }

    #[test]
    fn snake_cell_from_head_enumerates_body() {
        let mut snake = Snake::placeholder();
        snake.head_idx = 5;
        snake.length = 3;
        snake.body[5] = Position::new(10, 10);
        snake.body[4] = Position::new(9, 10);
        snake.body[3] = Position::new(8, 10);
        assert_eq!(snake.cell_from_head(0), Position::new(10, 10));
        assert_eq!(snake.cell_from_head(1), Position::new(9, 10));
        assert_eq!(snake.cell_from_head(2), Position::new(8, 10));
        assert!(snake.occupies(Position::new(9, 10)));
        assert!(!snake.occupies(Position::new(7, 10)));
    }
}
