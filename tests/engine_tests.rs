//! Tests for the game engine
//!
//! Test categories:
//! - Start/stop lifecycle
//! - Spawning and the next-piece preview
//! - Movement, soft drop and gravity
//! - Rotation with kicks
//! - Row clearing, scoring and high score
//! - Level progression
//! - Game over detection
//! - Snapshot publication

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use blockfall::error::StoreError;
use blockfall::game::{
    drop_interval_for_level, test_helpers::*, Board, Color, Command, Engine, EngineState,
    GameEvent, ManualClock, PieceType, SequencePieceProvider, BOARD_COLS, BOARD_ROWS,
    QUEUE_CAPACITY,
};
use blockfall::storage::{HighScoreStore, MemoryStore, HIGH_SCORE_KEY};

fn started(pieces: Vec<PieceType>) -> (Engine, ManualClock) {
    let (mut engine, clock) = sequence_engine(pieces);
    engine.start();
    (engine, clock)
}

fn started_with(pieces: Vec<PieceType>, board: Board) -> (Engine, ManualClock) {
    let (mut engine, clock) = sequence_engine(pieces);
    engine.start_with(board);
    (engine, clock)
}

fn drop_until_locked(engine: &mut Engine) {
    while engine.current_piece().is_some() {
        assert!(engine.soft_drop());
    }
}

/// Spawns an O piece, slides it to `col` and drops it to rest.
fn place_o(engine: &mut Engine, col: i32) {
    engine.update();
    let piece = engine.current_piece().expect("piece spawned");
    assert_eq!(piece.kind(), PieceType::O);
    let delta = col - piece.col();
    for _ in 0..delta.abs() {
        if delta < 0 {
            assert!(engine.move_left());
        } else {
            assert!(engine.move_right());
        }
    }
    drop_until_locked(engine);
}

/// Five O pieces side by side: clears the two bottom rows.
fn clear_two_rows(engine: &mut Engine) {
    for col in [0, 2, 4, 6, 8] {
        place_o(engine, col);
    }
}

#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<MemoryStore>>);

impl HighScoreStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<u32>, StoreError> {
        self.0.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        self.0.borrow_mut().set(key, value)
    }
}

struct BrokenStore;

impl HighScoreStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<u32>, StoreError> {
        Err(StoreError::Parse { line: 1 })
    }

    fn set(&mut self, _key: &str, _value: u32) -> Result<(), StoreError> {
        Err(StoreError::Parse { line: 1 })
    }
}

fn engine_with_store(store: Box<dyn HighScoreStore>) -> Engine {
    Engine::new(
        Box::new(SequencePieceProvider::new(vec![PieceType::O])),
        store,
        Box::new(ManualClock::new()),
    )
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

mod lifecycle {
    use super::*;

    #[test]
    fn new_engine_is_idle() {
        let (engine, _) = sequence_engine(vec![PieceType::O]);
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(!engine.is_running());
        assert!(!engine.is_game_over());
        assert!(engine.current_piece().is_none());
    }

    #[test]
    fn start_resets_game() {
        let (engine, _) = started(vec![PieceType::O]);
        assert_eq!(engine.state(), EngineState::Running);
        assert!(engine.is_running());
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.level(), 1);
        assert_eq!(engine.drop_interval(), Duration::from_millis(1000));
        assert_eq!(engine.queue().len(), QUEUE_CAPACITY);
        assert!(engine.current_piece().is_none());
        assert_eq!(engine.board(), &empty_board());
    }

    #[test]
    fn stop_marks_game_over_and_goes_idle() {
        let (mut engine, _) = started(vec![PieceType::O]);
        engine.update();

        assert!(engine.stop());
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.is_game_over());
        assert!(!engine.is_running());
        assert!(engine.take_events().contains(&GameEvent::Stopped));
    }

    #[test]
    fn stop_before_start_changes_nothing() {
        let (mut engine, _) = sequence_engine(vec![PieceType::O]);

        assert!(!engine.apply(Command::Stop));
        assert!(!engine.is_game_over());
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.take_events().is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "playfield must be")]
    fn start_with_rejects_other_sizes() {
        let (mut engine, _) = sequence_engine(vec![PieceType::O]);
        engine.start_with(Board::empty(BOARD_ROWS, BOARD_COLS + 1));
    }

    #[test]
    fn commands_ignored_when_not_running() {
        let (mut engine, _) = started(vec![PieceType::T]);
        engine.update();
        engine.stop();
        let before = engine.current_piece().cloned();

        assert!(!engine.move_left());
        assert!(!engine.move_right());
        assert!(!engine.rotate());
        assert!(!engine.soft_drop());
        assert_eq!(engine.current_piece().cloned(), before);
    }

    #[test]
    fn update_does_nothing_when_idle() {
        let (mut engine, _) = sequence_engine(vec![PieceType::O]);
        engine.update();
        assert!(engine.current_piece().is_none());
    }

    #[test]
    fn restart_keeps_high_score_only() {
        let (mut engine, _) = started(vec![PieceType::O]);
        clear_two_rows(&mut engine);
        place_o(&mut engine, 0);
        assert_eq!(engine.score(), 2);
        engine.stop();

        engine.start();

        assert_eq!(engine.score(), 0);
        assert_eq!(engine.level(), 1);
        assert_eq!(engine.high_score(), 2);
        assert!(!engine.is_game_over());
        assert_eq!(engine.board(), &empty_board());
    }

    #[test]
    fn apply_dispatches_commands() {
        let (mut engine, _) = sequence_engine(vec![PieceType::O]);
        assert!(engine.apply(Command::Start));
        engine.update();

        assert!(engine.apply(Command::MoveLeft));
        assert_eq!(engine.current_piece().map(|p| p.col()), Some(3));
        assert!(engine.apply(Command::MoveRight));
        assert!(engine.apply(Command::SoftDrop));
        assert_eq!(engine.current_piece().map(|p| p.row()), Some(1));
        assert!(engine.apply(Command::Rotate));
        assert!(engine.apply(Command::Stop));
        assert!(!engine.is_running());
    }
}

// ============================================================================
// Spawn Tests
// ============================================================================

mod spawning {
    use super::*;

    #[test]
    fn first_update_spawns_queue_front() {
        let (mut engine, _) = started(vec![PieceType::T, PieceType::S]);
        engine.update();

        let piece = engine.current_piece().expect("piece spawned");
        assert_eq!(piece.kind(), PieceType::T);
        assert_eq!((piece.row(), piece.col()), (0, 4));
        assert_eq!(engine.queue().len(), QUEUE_CAPACITY - 1);
        assert_eq!(engine.queue().front().map(|p| p.kind()), Some(PieceType::S));
    }

    #[test]
    fn preview_offsets_i_piece_to_column_zero() {
        let (mut engine, _) = started(vec![PieceType::O, PieceType::I]);
        engine.update();

        let preview = engine.next_piece_board();
        assert_eq!((preview.rows(), preview.cols()), (4, 4));
        for col in 0..4 {
            assert_eq!(preview.cell(1, col), Color::Cyan);
        }
        assert_eq!(preview.total_filled_cells(), 4);
    }

    #[test]
    fn preview_offsets_other_pieces_to_column_one() {
        let (mut engine, _) = started(vec![PieceType::I, PieceType::T]);
        engine.update();

        let preview = engine.next_piece_board();
        for (row, col) in [(1, 1), (1, 2), (1, 3), (2, 2)] {
            assert_eq!(preview.cell(row, col), Color::Purple);
        }
        assert_eq!(preview.total_filled_cells(), 4);
    }

    #[test]
    fn spawn_emits_event() {
        let (mut engine, _) = started(vec![PieceType::Z]);
        engine.take_events();
        engine.update();
        assert_eq!(
            engine.take_events(),
            vec![GameEvent::PieceSpawned(PieceType::Z)]
        );
    }
}

// ============================================================================
// Movement Tests
// ============================================================================

mod movement {
    use super::*;

    #[test]
    fn piece_moves_left_until_wall() {
        let (mut engine, _) = started(vec![PieceType::O]);
        engine.update();

        for _ in 0..4 {
            assert!(engine.move_left());
        }
        assert!(!engine.move_left());
        assert_eq!(engine.current_piece().map(|p| p.col()), Some(0));
    }

    #[test]
    fn piece_moves_right_until_wall() {
        let (mut engine, _) = started(vec![PieceType::O]);
        engine.update();

        for _ in 0..4 {
            assert!(engine.move_right());
        }
        assert!(!engine.move_right());
        assert_eq!(
            engine.current_piece().map(|p| p.col()),
            Some(BOARD_COLS as i32 - 2)
        );
    }

    #[test]
    fn piece_cannot_move_into_filled_cell() {
        let mut grid = empty_board().grid().clone();
        grid.set(0, 3, Color::Red);
        let (mut engine, _) = started_with(vec![PieceType::O], Board::new(grid));
        engine.update();

        assert!(!engine.move_left());
        assert_eq!(engine.current_piece().map(|p| p.col()), Some(4));
    }

    #[test]
    fn no_piece_no_move() {
        let (mut engine, _) = started(vec![PieceType::O]);
        assert!(!engine.move_left());
        assert!(!engine.soft_drop());
    }
}

// ============================================================================
// Drop and Gravity Tests
// ============================================================================

mod dropping {
    use super::*;

    #[test]
    fn soft_drop_moves_one_row() {
        let (mut engine, _) = started(vec![PieceType::O]);
        engine.update();
        assert!(engine.soft_drop());
        assert_eq!(engine.current_piece().map(|p| p.row()), Some(1));
    }

    #[test]
    fn o_piece_lands_on_floor() {
        let (mut engine, _) = started(vec![PieceType::O]);
        engine.update();

        for _ in 0..18 {
            engine.soft_drop();
        }
        assert_eq!(engine.current_piece().map(|p| p.row()), Some(18));
        engine.soft_drop();

        assert!(engine.current_piece().is_none());
        let board = engine.board();
        assert_eq!(board.total_filled_cells(), 4);
        for row in [18, 19] {
            for col in [4, 5] {
                assert_eq!(board.cell(row, col), Color::Yellow);
            }
        }
        assert!(engine.take_events().contains(&GameEvent::PieceLocked));
    }

    #[test]
    fn next_update_spawns_after_lock() {
        let (mut engine, _) = started(vec![PieceType::O, PieceType::J]);
        engine.update();
        drop_until_locked(&mut engine);

        engine.update();
        assert_eq!(engine.current_piece().map(|p| p.kind()), Some(PieceType::J));
    }

    #[test]
    fn gravity_waits_for_drop_interval() {
        let (mut engine, clock) = started(vec![PieceType::O]);
        engine.update();

        clock.advance_ms(999);
        engine.update();
        assert_eq!(engine.current_piece().map(|p| p.row()), Some(0));

        clock.advance_ms(1);
        engine.update();
        assert_eq!(engine.current_piece().map(|p| p.row()), Some(1));

        // Timer was reset by the drop
        clock.advance_ms(500);
        engine.update();
        assert_eq!(engine.current_piece().map(|p| p.row()), Some(1));
    }

    #[test]
    fn manual_drop_resets_gravity_timer() {
        let (mut engine, clock) = started(vec![PieceType::O]);
        engine.update();

        clock.advance_ms(900);
        engine.soft_drop();
        clock.advance_ms(900);
        engine.update();
        assert_eq!(engine.current_piece().map(|p| p.row()), Some(1));
    }

    #[test]
    fn gravity_alone_locks_piece() {
        let (mut engine, clock) = started(vec![PieceType::I]);
        engine.update();

        for _ in 0..20 {
            clock.advance_ms(1000);
            engine.update();
            if engine.current_piece().is_none() {
                break;
            }
        }
        assert!(engine.current_piece().is_none());
        for col in 4..8 {
            assert_eq!(engine.board().cell(BOARD_ROWS - 1, col), Color::Cyan);
        }
    }
}

// ============================================================================
// Rotation Tests
// ============================================================================

mod rotation {
    use super::*;

    #[test]
    fn rotation_in_open_space_uses_no_kick() {
        let (mut engine, _) = started(vec![PieceType::I]);
        engine.update();

        assert!(engine.rotate());
        let piece = engine.current_piece().expect("piece");
        assert_eq!((piece.rows(), piece.cols()), (4, 1));
        assert_eq!((piece.row(), piece.col()), (-3, 4));
    }

    #[test]
    fn rotation_against_wall_is_kicked() {
        let (mut engine, _) = started(vec![PieceType::I]);
        engine.update();
        engine.rotate();
        for _ in 0..5 {
            assert!(engine.move_right());
        }
        assert_eq!(engine.current_piece().map(|p| p.col()), Some(9));

        // Flat again: columns 9..13 overflow, first fitting kick is -3
        assert!(engine.rotate());
        let piece = engine.current_piece().expect("piece");
        assert_eq!((piece.rows(), piece.cols()), (1, 4));
        assert_eq!((piece.row(), piece.col()), (0, 6));
    }

    #[test]
    fn blocked_rotation_is_rejected() {
        // Overhang over columns 0..=5 on row 18, open floor below
        let mut grid = empty_board().grid().clone();
        for col in 0..=5 {
            grid.set(18, col, Color::Red);
        }
        let (mut engine, _) = started_with(vec![PieceType::I], Board::new(grid));
        engine.update();

        for _ in 0..2 {
            assert!(engine.move_right());
        }
        for _ in 0..19 {
            assert!(engine.soft_drop());
        }
        for _ in 0..4 {
            assert!(engine.move_left());
        }
        let before = engine.current_piece().cloned().expect("piece");
        assert_eq!((before.row(), before.col()), (19, 2));

        assert!(!engine.rotate());
        assert_eq!(engine.current_piece(), Some(&before));
    }

    #[test]
    fn four_rotations_restore_piece() {
        let (mut engine, _) = started(vec![PieceType::T]);
        engine.update();
        for _ in 0..5 {
            engine.soft_drop();
        }
        let before = engine.current_piece().cloned();

        for _ in 0..4 {
            assert!(engine.rotate());
        }
        assert_eq!(engine.current_piece().cloned(), before);
    }
}

// ============================================================================
// Scoring Tests
// ============================================================================

mod scoring {
    use super::*;

    #[test]
    fn single_row_clear_scores_one() {
        let mut grid = empty_board().grid().clone();
        fill_row_with_gaps(&mut grid, 19, &[4, 5]);
        let (mut engine, _) = started_with(vec![PieceType::O], Board::new(grid));
        engine.update();
        drop_until_locked(&mut engine);

        assert_eq!(engine.score(), 1);
        let board = engine.board();
        assert_eq!(board.total_filled_cells(), 2);
        assert_eq!(board.cell(19, 4), Color::Yellow);
        assert_eq!(board.cell(19, 5), Color::Yellow);
        assert!(engine.take_events().contains(&GameEvent::LinesCleared(1)));
    }

    #[test]
    fn double_clear_scores_two() {
        let (mut engine, _) = started(vec![PieceType::O]);
        clear_two_rows(&mut engine);
        assert_eq!(engine.score(), 2);
        assert_eq!(engine.board(), &empty_board());
    }

    #[test]
    fn four_row_clear_scores_eight() {
        let mut grid = empty_board().grid().clone();
        for row in 16..20 {
            fill_row_with_gaps(&mut grid, row, &[0]);
        }
        let (mut engine, _) = started_with(vec![PieceType::I], Board::new(grid));
        engine.update();
        engine.rotate();
        for _ in 0..4 {
            assert!(engine.move_left());
        }
        drop_until_locked(&mut engine);

        assert_eq!(engine.score(), 8);
        assert_eq!(engine.board(), &empty_board());
    }

    #[test]
    fn high_score_loaded_from_store() {
        let store = SharedStore::default();
        store.0.borrow_mut().set(HIGH_SCORE_KEY, 5).unwrap();
        let engine = engine_with_store(Box::new(store));
        assert_eq!(engine.high_score(), 5);
    }

    #[test]
    fn high_score_written_through_when_beaten() {
        let store = SharedStore::default();
        store.0.borrow_mut().set(HIGH_SCORE_KEY, 5).unwrap();
        let mut engine = engine_with_store(Box::new(store.clone()));
        engine.start();

        clear_two_rows(&mut engine);
        clear_two_rows(&mut engine);
        assert_eq!(engine.high_score(), 5);
        assert_eq!(store.0.borrow().get(HIGH_SCORE_KEY).unwrap(), Some(5));

        clear_two_rows(&mut engine);
        assert_eq!(engine.high_score(), 6);
        assert_eq!(store.0.borrow().get(HIGH_SCORE_KEY).unwrap(), Some(6));
        assert!(engine.take_events().contains(&GameEvent::NewHighScore(6)));
    }

    #[test]
    fn broken_store_degrades_to_zero() {
        let mut engine = engine_with_store(Box::new(BrokenStore));
        assert_eq!(engine.high_score(), 0);

        engine.start();
        clear_two_rows(&mut engine);
        assert_eq!(engine.high_score(), 2);
    }
}

// ============================================================================
// Level Tests
// ============================================================================

mod levels {
    use super::*;

    #[test]
    fn drop_interval_table() {
        assert_eq!(drop_interval_for_level(1), Duration::from_millis(1000));
        assert_eq!(drop_interval_for_level(2), Duration::from_millis(900));
        assert_eq!(drop_interval_for_level(9), Duration::from_millis(200));
        assert_eq!(drop_interval_for_level(10), Duration::from_millis(100));
        assert_eq!(drop_interval_for_level(11), Duration::from_millis(100));
        assert_eq!(drop_interval_for_level(50), Duration::from_millis(100));
    }

    #[test]
    fn queue_refill_raises_level() {
        let (mut engine, _) = started(vec![PieceType::O]);

        // 4 rounds of 5 pieces empty the first queue
        for _ in 0..3 {
            clear_two_rows(&mut engine);
        }
        assert_eq!(engine.level(), 1);
        clear_two_rows(&mut engine);

        assert_eq!(engine.level(), 2);
        assert_eq!(engine.drop_interval(), Duration::from_millis(900));
        assert_eq!(engine.queue().len(), QUEUE_CAPACITY);
        assert!(engine.take_events().contains(&GameEvent::LevelUp(2)));
    }

    #[test]
    fn drop_interval_floors_after_nine_refills() {
        let (mut engine, _) = started(vec![PieceType::O]);

        for _ in 0..36 {
            clear_two_rows(&mut engine);
        }
        assert_eq!(engine.level(), 10);
        assert_eq!(engine.drop_interval(), Duration::from_millis(100));

        for _ in 0..4 {
            clear_two_rows(&mut engine);
        }
        assert_eq!(engine.level(), 11);
        assert_eq!(engine.drop_interval(), Duration::from_millis(100));
        assert_eq!(engine.score(), 80);
    }
}

// ============================================================================
// Game Over Tests
// ============================================================================

mod game_over {
    use super::*;

    fn blocked_spawn_board() -> Board {
        let mut grid = empty_board().grid().clone();
        for col in 3..=6 {
            grid.set(0, col, Color::Red);
        }
        Board::new(grid)
    }

    #[test]
    fn blocked_spawn_ends_game() {
        let board = blocked_spawn_board();
        let (mut engine, clock) = started_with(vec![PieceType::T], board.clone());
        clock.advance_ms(5000);
        engine.update();

        assert!(engine.is_game_over());
        assert!(!engine.is_running());
        assert_eq!(engine.state(), EngineState::GameOver);
        assert!(engine.current_piece().is_none());
        assert_eq!(engine.board(), &board);
        assert!(engine.take_events().contains(&GameEvent::GameOver));
    }

    #[test]
    fn no_moves_after_game_over() {
        let (mut engine, _) = started_with(vec![PieceType::T], blocked_spawn_board());
        engine.update();

        assert!(!engine.move_left());
        assert!(!engine.rotate());
        assert!(!engine.soft_drop());
    }

    #[test]
    fn stop_after_game_over_keeps_state() {
        let (mut engine, _) = started_with(vec![PieceType::T], blocked_spawn_board());
        engine.update();

        assert!(!engine.stop());
        assert_eq!(engine.state(), EngineState::GameOver);
    }

    #[test]
    fn stacking_to_the_top_ends_game() {
        let (mut engine, _) = started(vec![PieceType::O]);
        for _ in 0..10 {
            engine.update();
            drop_until_locked(&mut engine);
        }
        assert!(engine.is_running());

        engine.update();
        assert!(engine.is_game_over());
        assert_eq!(engine.state(), EngineState::GameOver);
    }
}

// ============================================================================
// Snapshot Tests
// ============================================================================

mod snapshots {
    use super::*;

    #[test]
    fn render_merges_active_piece() {
        let (mut engine, _) = started(vec![PieceType::O]);
        engine.update();

        let snapshot = engine.render().expect("first snapshot");
        assert_eq!(snapshot.board.total_filled_cells(), 4);
        assert_eq!(snapshot.board.cell(0, 4), Color::Yellow);
        assert_eq!(engine.board().total_filled_cells(), 0);
        assert_eq!(snapshot.state, EngineState::Running);
        assert_eq!(snapshot.level, 1);
    }

    #[test]
    fn unchanged_state_is_not_republished() {
        let (mut engine, _) = started(vec![PieceType::O]);
        engine.update();

        assert!(engine.render().is_some());
        assert!(engine.render().is_none());

        engine.move_left();
        let snapshot = engine.render().expect("moved piece");
        assert_eq!(snapshot.board.cell(0, 3), Color::Yellow);
        assert_eq!(engine.snapshot(), &snapshot);
    }

    #[test]
    fn snapshot_reports_game_over() {
        let mut grid = empty_board().grid().clone();
        grid.set(0, 5, Color::Red);
        let (mut engine, _) = started_with(vec![PieceType::O], Board::new(grid));
        engine.update();

        let snapshot = engine.render().expect("snapshot");
        assert!(snapshot.game_over);
        assert_eq!(snapshot.state, EngineState::GameOver);
    }
}
