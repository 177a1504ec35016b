//! The tick loop: the single logical actor with exclusive authority over
//! snake movement, collisions, respawn, and food.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::{
    FOOD_SPAWN_INTERVAL_MS, GAME_TICK_MS, MAX_FOOD, MAX_SNAKE_LEN, PROTECTION_TICKS,
    RESPAWN_TICKS,
};
use crate::world::{Cell, Direction, Position, Snake, World};

/// Runs the tick loop until `world.running` clears. Intended to be the body
/// of a dedicated thread.
pub fn run(world: Arc<Mutex<World>>) {
    let mut last_tick = Instant::now();
    let mut last_food_spawn = Instant::now();

    loop {
        std::thread::sleep(Duration::from_millis(10));

        if last_tick.elapsed() < Duration::from_millis(GAME_TICK_MS) {
            continue;
        }
        last_tick = Instant::now();

        let mut world = world.lock().unwrap();
        if !world.running {
            break;
        }

        step(&mut world, &mut last_food_spawn);
    }
}

fn step(world: &mut World, last_food_spawn: &mut Instant) {
    respawn_dead(world);
    commit_moves(world);
    resolve_collisions(world);
    rebuild_grid(world);

    if last_food_spawn.elapsed() >= Duration::from_millis(FOOD_SPAWN_INTERVAL_MS)
        && active_food_count(world) < MAX_FOOD / 2
    {
        spawn_food(world);
        *last_food_spawn = Instant::now();
    }

    world.tick += 1;
}

fn respawn_dead(world: &mut World) {
    for slot in 0..world.players.len() {
        if !world.players[slot].active || world.players[slot].snake.alive {
            continue;
        }
        if world.players[slot].respawn_timer == 0 {
            continue;
        }
        world.players[slot].respawn_timer -= 1;
        if world.players[slot].respawn_timer == 0 {
            let (sx, sy) = find_spawn_pos(world);
            init_snake(&mut world.players[slot].snake, sx, sy);
            world.players[slot].spawn_protection = PROTECTION_TICKS;
            let name = world.players[slot].name.clone();
            world.append_chat(0, "SYSTEM", &format!("{name} respawned!"));
        }
    }
}

fn commit_moves(world: &mut World) {
    for slot in 0..world.players.len() {
        if !world.players[slot].active || !world.players[slot].snake.alive {
            continue;
        }
        let snake = &mut world.players[slot].snake;
        if snake.pending_dir != snake.direction.opposite() {
            snake.direction = snake.pending_dir;
        }
        let (dx, dy) = snake.direction.delta();
        let head = snake.head();
        let new_head = Position::new(head.x + dx, head.y + dy);

        snake.head_idx = (snake.head_idx + 1) % MAX_SNAKE_LEN;
        snake.body[snake.head_idx] = new_head;
    }
}

fn resolve_collisions(world: &mut World) {
    let num_slots = world.players.len();

    for slot in 0..num_slots {
        if !world.players[slot].active || !world.players[slot].snake.alive {
            continue;
        }

        if world.players[slot].spawn_protection > 0 {
            world.players[slot].spawn_protection -= 1;
            continue;
        }

        let head = world.players[slot].snake.head();

        if !world.in_interior(head.x, head.y) {
            kill_snake(world, slot);
            continue;
        }

        if let Some(food_idx) = world
            .foods
            .iter()
            .position(|f| f.active && f.pos == head)
        {
            world.players[slot].score += 10;
            let snake = &mut world.players[slot].snake;
            snake.length = (snake.length + 1).min(MAX_SNAKE_LEN - 1);
            world.foods[food_idx].active = false;
            spawn_food(world);
        }

        let mut hit = false;
        'outer: for other in 0..num_slots {
            if !world.players[other].active || !world.players[other].snake.alive {
                continue;
            }
            let other_snake = &world.players[other].snake;
            for i in 0..other_snake.length {
                if other == slot && i == 0 {
                    continue;
                }
                if other_snake.cell_from_head(i) == head {
                    hit = true;
                    break 'outer;
                }
            }
        }

        if hit {
            kill_snake(world, slot);
        }
    }
}

fn kill_snake(world: &mut World, slot: usize) {
    world.players[slot].snake.alive = false;
    world.players[slot].respawn_timer = RESPAWN_TICKS;
}

fn active_food_count(world: &World) -> usize {
    world.foods.iter().filter(|f| f.active).count()
}

fn rebuild_grid(world: &mut World) {
    let width = world.width as i32;
    let height = world.height as i32;

    for x in 1..width - 1 {
        for y in 1..height - 1 {
            world.set_cell(x, y, Cell::Empty);
        }
    }

    for food in world.foods.clone() {
        if food.active {
            world.set_cell(food.pos.x, food.pos.y, Cell::Food);
        }
    }

    for slot in 0..world.players.len() {
        if !world.players[slot].active || !world.players[slot].snake.alive {
            continue;
        }
        let snake = world.players[slot].snake.clone();
        for i in 0..snake.length {
            let pos = snake.cell_from_head(i);
            world.set_cell(pos.x, pos.y, Cell::Snake(slot as u16));
        }
    }
}

/// Samples up to 100 random interior points with a 5-cell inset, accepting
/// the first whose surrounding 5x5 box contains only empty/food cells.
/// Falls back to the grid center on exhaustion.
pub(crate) fn find_spawn_pos(world: &World) -> (i32, i32) {
    let width = world.width as i32;
    let height = world.height as i32;
    let mut rng = rand::thread_rng();

    for _ in 0..100 {
        let x = 5 + rng.gen_range(0..(width - 10).max(1));
        let y = 5 + rng.gen_range(0..(height - 10).max(1));

        if spawn_box_clear(world, x, y) {
            return (x, y);
        }
    }

    (width / 2, height / 2)
}

fn spawn_box_clear(world: &World, cx: i32, cy: i32) -> bool {
    let width = world.width as i32;
    let height = world.height as i32;

    for dx in -2..=2 {
        for dy in -2..=2 {
            let nx = cx + dx;
            let ny = cy + dy;
            if nx < 1 || nx >= width - 1 || ny < 1 || ny >= height - 1 {
                continue;
            }
            match world.cell_at(nx, ny) {
                Cell::Empty | Cell::Food => {}
                _ => return false,
            }
        }
    }

    true
}

/// Places the snake facing right, head at `(sx, sy)`, body trailing west.
pub(crate) fn init_snake(snake: &mut Snake, sx: i32, sy: i32) {
    *snake = Snake {
        body: [Position::new(0, 0); MAX_SNAKE_LEN],
        head_idx: 2,
        length: 3,
        direction: Direction::Right,
        pending_dir: Direction::Right,
        alive: true,
    };
    snake.body[2] = Position::new(sx, sy);
    snake.body[1] = Position::new(sx - 1, sy);
    snake.body[0] = Position::new(sx - 2, sy);
}

pub(crate) fn spawn_food(world: &mut World) {
    let width = world.width as i32;
    let height = world.height as i32;
    let mut rng = rand::thread_rng();

    let slot = match world.foods.iter().position(|f| !f.active) {
        Some(slot) => slot,
        None => return,
    };

    for _ in 0..100 {
        let x = 1 + rng.gen_range(0..(width - 2).max(1));
        let y = 1 + rng.gen_range(0..(height - 2).max(1));

        if world.cell_at(x, y) == Cell::Empty {
            world.foods[slot] = crate::world::FoodEntry {
                pos: Position::new(x, y),
                active: true,
            };
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_world() -> World {
        World::new()
    }

    fn spawn_player(world: &mut World, name: &str) -> usize {
        let slot = world.claim_slot(name, false).unwrap();
        let (sx, sy) = find_spawn_pos(world);
        init_snake(&mut world.players[slot].snake, sx, sy);
        world.players[slot].spawn_protection = PROTECTION_TICKS;
        rebuild_grid(world);
        slot
    }

    #[test]
    fn solo_survival_moves_east_without_turning() {
        let mut world = fresh_world();
        let slot = spawn_player(&mut world, "alice");
        let start = world.players[slot].snake.head();

        // clear spawn protection so collisions are evaluated like a normal run
        world.players[slot].spawn_protection = 0;

        let mut last_food_spawn = Instant::now();
        for _ in 0..10 {
            world.queue_move(slot, Direction::Right);
            step(&mut world, &mut last_food_spawn);
        }

        let head = world.players[slot].snake.head();
        assert_eq!(head.x, start.x + 10);
        assert_eq!(head.y, start.y);
        assert_eq!(world.players[slot].snake.length, 3);
        assert_eq!(world.players[slot].score, 0);
        assert!(world.players[slot].snake.alive);
    }

    #[test]
    fn eating_food_grows_and_scores() {
        let mut world = fresh_world();
        let slot = spawn_player(&mut world, "alice");
        world.players[slot].spawn_protection = 0;

        let head = world.players[slot].snake.head();
        let target = Position::new(head.x + 1, head.y);
        for food in &mut world.foods {
            food.active = false;
        }
        world.foods[0] = crate::world::FoodEntry {
            pos: target,
            active: true,
        };

        let mut last_food_spawn = Instant::now();
        world.queue_move(slot, Direction::Right);
        step(&mut world, &mut last_food_spawn);

        assert_eq!(world.players[slot].score, 10);
        assert_eq!(world.players[slot].snake.length, 4);
        let food_count = world.foods.iter().filter(|f| f.active).count();
        assert_eq!(food_count, 1);
        assert!(!world.foods.iter().any(|f| f.active && f.pos == target));
    }

    #[test]
    fn opposite_direction_is_rejected() {
        let mut world = fresh_world();
        let slot = spawn_player(&mut world, "alice");
        world.players[slot].spawn_protection = 0;
        world.players[slot].snake.direction = Direction::Right;
        world.players[slot].snake.pending_dir = Direction::Right;

        let mut last_food_spawn = Instant::now();
        world.queue_move(slot, Direction::Left);
        step(&mut world, &mut last_food_spawn);

        assert_eq!(world.players[slot].snake.direction, Direction::Right);
    }

    #[test]
    fn spawn_protection_prevents_wall_kill() {
        let mut world = fresh_world();
        let slot = world.claim_slot("alice", false).unwrap();
        init_snake(&mut world.players[slot].snake, 1, 5);
        world.players[slot].spawn_protection = PROTECTION_TICKS;
        world.players[slot].snake.direction = Direction::Left;
        world.players[slot].snake.pending_dir = Direction::Left;
        rebuild_grid(&mut world);

        let mut last_food_spawn = Instant::now();
        world.queue_move(slot, Direction::Left);
        step(&mut world, &mut last_food_spawn);

        assert!(world.players[slot].snake.alive);
        assert_eq!(world.players[slot].spawn_protection, PROTECTION_TICKS - 1);
    }

    #[test]
    fn self_collision_kills_and_starts_respawn_timer() {
        let mut world = fresh_world();
        let slot = world.claim_slot("alice", false).unwrap();
        init_snake(&mut world.players[slot].snake, 10, 10);
        world.players[slot].spawn_protection = 0;
        {
            let snake = &mut world.players[slot].snake;
            snake.length = 5;
            snake.head_idx = 4;
            snake.body[4] = Position::new(10, 10);
            snake.body[3] = Position::new(10, 11);
            snake.body[2] = Position::new(11, 11);
            snake.body[1] = Position::new(11, 10);
            snake.body[0] = Position::new(10, 10);
            snake.direction = Direction::Up;
            snake.pending_dir = Direction::Right;
        }
        rebuild_grid(&mut world);

        let mut last_food_spawn = Instant::now();
        step(&mut world, &mut last_food_spawn);

        assert!(!world.players[slot].snake.alive);
        assert_eq!(world.players[slot].respawn_timer, RESPAWN_TICKS);
    }

    #[test]
    fn grid_rebuild_matches_live_snake_cells() {
        let mut world = fresh_world();
        let slot = spawn_player(&mut world, "alice");
        let snake = world.players[slot].snake.clone();
        for i in 0..snake.length {
            let pos = snake.cell_from_head(i);
            assert_eq!(world.cell_at(pos.x, pos.y), Cell::Snake(slot as u16));
        }
    }

    #[test]
    fn tick_and_chat_count_are_non_decreasing() {
        let mut world = fresh_world();
        spawn_player(&mut world, "alice");
        let mut last_food_spawn = Instant::now();
        let mut prev_tick = world.tick;
        let mut prev_chat = world.chat_count();
        for _ in 0..5 {
            step(&mut world, &mut last_food_spawn);
            assert!(world.tick >= prev_tick);
            assert!(world.chat_count() >= prev_chat);
            prev_tick = world.tick;
            prev_chat = world.chat_count();
        }
    }
}
