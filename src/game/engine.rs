use std::time::Duration;

use tracing::{debug, info, warn};

use crate::game::{
    line_clear_score, Board, Clock, Piece, PieceProvider, PieceQueue, PieceType,
    BASE_DROP_INTERVAL_MS, BOARD_COLS, BOARD_ROWS, DROP_INTERVAL_STEP_MS, KICK_OFFSETS,
    MIN_DROP_INTERVAL_MS, PREVIEW_COLS, PREVIEW_ROWS,
};
use crate::storage::{HighScoreStore, HIGH_SCORE_KEY};

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum EngineState {
    Idle,
    Running,
    GameOver,
}

/// Discrete commands accepted from the input side.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Command {
    Start,
    Stop,
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GameEvent {
    Started,
    Stopped,
    PieceSpawned(PieceType),
    PieceLocked,
    LinesCleared(usize),
    LevelUp(u32),
    NewHighScore(u32),
    GameOver,
}

/// Immutable view handed to the renderer.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Snapshot {
    /// Playfield with the active piece merged in
    pub board: Board,
    pub next_piece: Board,
    pub score: u32,
    pub high_score: u32,
    pub level: u32,
    pub game_over: bool,
    pub state: EngineState,
}

/// Gravity interval for `level`: 1000 ms minus 100 ms per level above 1,
/// never below 100 ms.
pub fn drop_interval_for_level(level: u32) -> Duration {
    let reduction = level.saturating_sub(1) as u64 * DROP_INTERVAL_STEP_MS;
    Duration::from_millis(
        BASE_DROP_INTERVAL_MS
            .saturating_sub(reduction)
            .max(MIN_DROP_INTERVAL_MS),
    )
}

// ============================================================================
// Engine
// ============================================================================

pub struct Engine {
    board: Board,
    current_piece: Option<Piece>,
    queue: PieceQueue,
    next_piece_board: Board,
    score: u32,
    level: u32,
    high_score: u32,
    game_over: bool,
    running: bool,
    state: EngineState,
    drop_interval: Duration,
    last_update: Duration,
    last_render: Duration,
    published: Snapshot,
    provider: Box<dyn PieceProvider>,
    store: Box<dyn HighScoreStore>,
    clock: Box<dyn Clock>,
    events: Vec<GameEvent>,
}

/// Merges a piece the caller has already checked for collision.
///
/// # Panics
///
/// Panics if the piece collides: every call site tests the placement first,
/// so a failure here is a broken engine invariant.
fn merge(board: &Board, piece: &Piece) -> Board {
    match board.add_piece(piece) {
        Ok(board) => board,
        Err(err) => panic!("illegal placement: {err}"),
    }
}

impl Engine {
    /// Creates an idle engine. The high score is read from `store` once, here.
    pub fn new(
        provider: Box<dyn PieceProvider>,
        store: Box<dyn HighScoreStore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let high_score = match store.get(HIGH_SCORE_KEY) {
            Ok(value) => value.unwrap_or(0),
            Err(err) => {
                warn!("Failed to read high score, starting from 0: {}", err);
                0
            }
        };
        let now = clock.now();
        let board = Board::empty(BOARD_ROWS, BOARD_COLS);
        let next_piece_board = Board::empty(PREVIEW_ROWS, PREVIEW_COLS);

        Self {
            published: Snapshot {
                board: board.clone(),
                next_piece: next_piece_board.clone(),
                score: 0,
                high_score,
                level: 1,
                game_over: false,
                state: EngineState::Idle,
            },
            board,
            current_piece: None,
            queue: PieceQueue::default(),
            next_piece_board,
            score: 0,
            level: 1,
            high_score,
            game_over: false,
            running: false,
            state: EngineState::Idle,
            drop_interval: drop_interval_for_level(1),
            last_update: now,
            last_render: now,
            provider,
            store,
            clock,
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Runs a command. Returns whether it changed anything.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Start => {
                self.start();
                true
            }
            Command::Stop => self.stop(),
            Command::MoveLeft => self.move_left(),
            Command::MoveRight => self.move_right(),
            Command::SoftDrop => self.soft_drop(),
            Command::Rotate => self.rotate(),
        }
    }

    /// Starts a fresh game on an empty board.
    pub fn start(&mut self) {
        self.start_with(Board::empty(BOARD_ROWS, BOARD_COLS));
    }

    /// Starts a fresh game on `board`. The high score carries over.
    pub fn start_with(&mut self, board: Board) {
        debug_assert_eq!(
            (board.rows(), board.cols()),
            (BOARD_ROWS, BOARD_COLS),
            "playfield must be {}x{}",
            BOARD_ROWS,
            BOARD_COLS
        );
        let now = self.clock.now();
        self.board = board;
        self.queue = PieceQueue::generate(self.provider.as_mut(), BOARD_COLS);
        self.current_piece = None;
        self.next_piece_board = Board::empty(PREVIEW_ROWS, PREVIEW_COLS);
        self.score = 0;
        self.level = 1;
        self.drop_interval = drop_interval_for_level(1);
        self.game_over = false;
        self.running = true;
        self.state = EngineState::Running;
        self.last_update = now;
        self.last_render = now;
        self.events.push(GameEvent::Started);
        info!("Game started (high score {})", self.high_score);
    }

    /// Ends the run and raises the game-over flag. Does nothing and returns
    /// false if no run was active.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.game_over = true;
        self.state = EngineState::Idle;
        self.events.push(GameEvent::Stopped);
        info!("Game stopped with score {}", self.score);
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.shift(-1)
    }

    pub fn move_right(&mut self) -> bool {
        self.shift(1)
    }

    /// Moves the active piece down one row, locking it if it cannot move.
    /// Resets the gravity timer either way.
    pub fn soft_drop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let Some(piece) = self.current_piece.take() else {
            return false;
        };

        let moved = piece.moved(piece.row() + 1, piece.col());
        if moved.collides(&self.board) {
            self.lock(&piece);
        } else {
            self.current_piece = Some(moved);
        }
        self.last_update = self.clock.now();
        true
    }

    /// Rotates clockwise, trying each kick offset in turn.
    pub fn rotate(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let Some(piece) = &self.current_piece else {
            return false;
        };

        let rotated = piece.rotated();
        let kicked = KICK_OFFSETS
            .iter()
            .map(|offset| rotated.moved(rotated.row(), rotated.col() + offset))
            .find(|candidate| !candidate.collides(&self.board));

        match kicked {
            Some(candidate) => {
                self.current_piece = Some(candidate);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// One simulation step: spawn a piece if none is active, then apply
    /// gravity once the drop interval has elapsed.
    pub fn update(&mut self) {
        if !self.running {
            return;
        }
        if self.current_piece.is_none() && !self.spawn_piece() {
            return;
        }
        if self.clock.now().saturating_sub(self.last_update) >= self.drop_interval {
            self.soft_drop();
        }
    }

    /// Builds the renderer snapshot and publishes it if it differs from the
    /// last published one.
    pub fn render(&mut self) -> Option<Snapshot> {
        self.last_render = self.clock.now();
        let board = match &self.current_piece {
            Some(piece) => merge(&self.board, piece),
            None => self.board.clone(),
        };
        let snapshot = Snapshot {
            board,
            next_piece: self.next_piece_board.clone(),
            score: self.score,
            high_score: self.high_score,
            level: self.level,
            game_over: self.game_over,
            state: self.state,
        };

        if snapshot == self.published {
            return None;
        }
        self.published = snapshot.clone();
        Some(snapshot)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn shift(&mut self, delta: i32) -> bool {
        if !self.running {
            return false;
        }
        let Some(piece) = &self.current_piece else {
            return false;
        };

        let moved = piece.moved(piece.row(), piece.col() + delta);
        if moved.collides(&self.board) {
            return false;
        }
        self.current_piece = Some(moved);
        true
    }

    /// Takes the queue front as the active piece. Returns false if it cannot
    /// be placed, which ends the game.
    fn spawn_piece(&mut self) -> bool {
        let Some(piece) = self.queue.pop() else {
            unreachable!("piece queue is refilled whenever it empties");
        };

        if self.queue.is_empty() {
            self.queue = PieceQueue::generate(self.provider.as_mut(), BOARD_COLS);
            self.level_up();
        }
        self.next_piece_board = self.preview_board();

        if piece.collides(&self.board) {
            self.finish_game();
            return false;
        }

        self.events.push(GameEvent::PieceSpawned(piece.kind()));
        self.current_piece = Some(piece);
        true
    }

    fn preview_board(&self) -> Board {
        let empty = Board::empty(PREVIEW_ROWS, PREVIEW_COLS);
        match self.queue.front() {
            Some(next) => {
                let col = if next.kind() == PieceType::I { 0 } else { 1 };
                merge(&empty, &next.moved(1, col))
            }
            None => empty,
        }
    }

    fn lock(&mut self, piece: &Piece) {
        self.board = merge(&self.board, piece);
        self.events.push(GameEvent::PieceLocked);
        debug!("Locked {:?} at ({}, {})", piece.kind(), piece.row(), piece.col());

        let (board, cleared) = self.board.remove_completed_rows();
        if cleared > 0 {
            self.board = board;
            self.events.push(GameEvent::LinesCleared(cleared));
            debug!("Cleared {} rows", cleared);
            self.add_score(line_clear_score(cleared));
        }
    }

    fn add_score(&mut self, points: u32) {
        self.score += points;
        if self.score > self.high_score {
            self.high_score = self.score;
            self.events.push(GameEvent::NewHighScore(self.high_score));
            if let Err(err) = self.store.set(HIGH_SCORE_KEY, self.high_score) {
                warn!("Failed to save high score {}: {}", self.high_score, err);
            }
        }
    }

    fn level_up(&mut self) {
        self.level += 1;
        self.drop_interval = drop_interval_for_level(self.level);
        self.events.push(GameEvent::LevelUp(self.level));
        info!(
            "Level {} reached, drop interval {} ms",
            self.level,
            self.drop_interval.as_millis()
        );
    }

    fn finish_game(&mut self) {
        self.running = false;
        self.game_over = true;
        self.state = EngineState::GameOver;
        self.current_piece = None;
        self.events.push(GameEvent::GameOver);
        info!("Game over with score {}", self.score);
    }

    // ------------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------------

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_piece(&self) -> Option<&Piece> {
        self.current_piece.as_ref()
    }

    pub fn queue(&self) -> &PieceQueue {
        &self.queue
    }

    pub fn next_piece_board(&self) -> &Board {
        &self.next_piece_board
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn drop_interval(&self) -> Duration {
        self.drop_interval
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Time since the last call to [`Engine::render`]
    pub fn since_last_render(&self) -> Duration {
        self.clock.now().saturating_sub(self.last_render)
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> &Snapshot {
        &self.published
    }

    /// Takes and clears all pending events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
