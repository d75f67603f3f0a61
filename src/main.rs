use clap::Parser;
use crossterm::{
    event::{self, Event},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color as TermColor, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::{
    fs::File,
    io::{self, stdout, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};

use blockfall::game::{
    Board, Color, Command, Engine, EngineState, Snapshot, SystemClock, WeightedRandomProvider,
    BOARD_COLS, BOARD_ROWS,
};
use blockfall::input::{map_key_event, Input};
use blockfall::scheduler::{Frontend, LoopExit, Scheduler};
use blockfall::storage::FileStore;

/// blockfall - falling-block puzzle in the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File the high score is kept in
    #[arg(long, default_value = "highscore.txt")]
    high_score_file: PathBuf,

    /// Seed for a reproducible piece sequence
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================================
// Visual Constants
// ============================================================================

const CELL_WIDTH: u16 = 2;
const BLOCK_CHAR: &str = "██";
const EMPTY_CHAR: &str = "  ";
const SCORE_DIGITS: usize = 4;
const IDLE_POLL: Duration = Duration::from_millis(250);

// ============================================================================
// Color Mapping
// ============================================================================

fn cell_color(color: Color) -> Option<TermColor> {
    match color {
        Color::Empty => None,
        Color::Yellow => Some(TermColor::Yellow),
        Color::Cyan => Some(TermColor::Cyan),
        Color::Green => Some(TermColor::Green),
        Color::Red => Some(TermColor::Red),
        Color::Orange => Some(TermColor::Rgb(255, 165, 0)),
        Color::Blue => Some(TermColor::Blue),
        Color::Purple => Some(TermColor::Magenta),
    }
}

fn zero_fill(value: u32, digits: usize) -> String {
    format!("{value:0>digits$}")
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, snapshot: &Snapshot) {
    let area = frame.size();
    render_game(frame, snapshot, area);

    match snapshot.state {
        EngineState::Running => {}
        EngineState::Idle => render_idle(frame, snapshot, area),
        EngineState::GameOver => render_game_over(frame, snapshot, area),
    }
}

fn render_game(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let grid_display_width = (BOARD_COLS as u16 * CELL_WIDTH) + 2;
    let grid_display_height = BOARD_ROWS as u16 + 2;
    let side_width = 14;
    let total_width = grid_display_width + side_width + 2;
    let total_height = grid_display_height + 3;

    let main_area = centered_rect(total_width, total_height, area);

    let vertical = Layout::vertical([
        Constraint::Length(grid_display_height),
        Constraint::Fill(1),
    ])
    .split(main_area);

    let game_row = vertical[0];

    // Layout: [Board][Next / Score / High / Level]
    let horizontal = Layout::horizontal([
        Constraint::Length(grid_display_width),
        Constraint::Length(side_width),
    ])
    .split(game_row);

    render_board(frame, &snapshot.board, " Blockfall ", horizontal[0]);

    let side = Layout::vertical([
        Constraint::Length(6),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    render_board(frame, &snapshot.next_piece, " Next ", side[0]);
    render_value_box(frame, " Score ", zero_fill(snapshot.score, SCORE_DIGITS), side[1]);
    render_value_box(frame, " High ", zero_fill(snapshot.high_score, SCORE_DIGITS), side[2]);
    render_value_box(frame, " Level ", snapshot.level.to_string(), side[3]);

    let controls_area = Rect {
        x: area.x,
        y: game_row.y + game_row.height,
        width: area.width,
        height: 2,
    };

    if controls_area.y + 1 < area.height {
        let controls = Paragraph::new(vec![Line::from(
            "←→: Move | ↓: Drop | ↑: Rotate | Enter: Start | Esc: Stop | Q: Quit",
        )])
        .alignment(Alignment::Center)
        .style(Style::default().fg(TermColor::DarkGray));
        frame.render_widget(controls, controls_area);
    }
}

fn render_board(frame: &mut Frame, board: &Board, title: &str, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = board
        .grid()
        .iter_rows()
        .map(|row| {
            let spans: Vec<Span> = row
                .iter()
                .map(|&color| match cell_color(color) {
                    Some(fg) => Span::styled(BLOCK_CHAR, Style::default().fg(fg)),
                    None => Span::raw(EMPTY_CHAR),
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_value_box(frame: &mut Frame, title: &str, value: String, area: Rect) {
    let paragraph = Paragraph::new(Line::from(value))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(paragraph, area);
}

fn render_idle(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let mut text = vec![Line::from("")];
    if snapshot.game_over {
        text.push(Line::from(Span::styled("STOPPED", Style::default().fg(TermColor::Yellow))));
        text.push(Line::from(format!("Score: {}", snapshot.score)));
        text.push(Line::from(""));
    }
    text.push(Line::from(Span::styled(
        "Press Enter to start",
        Style::default().fg(TermColor::DarkGray),
    )));
    text.push(Line::from(Span::styled(
        "Press Q to quit",
        Style::default().fg(TermColor::DarkGray),
    )));

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Blockfall ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(TermColor::Black)),
    );

    let popup_area = centered_rect(26, 9, area);
    frame.render_widget(paragraph, popup_area);
}

fn render_game_over(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("GAME OVER", Style::default().fg(TermColor::Red))),
        Line::from(""),
        Line::from(format!("Score: {}", snapshot.score)),
        Line::from(format!("High:  {}", snapshot.high_score)),
        Line::from(format!("Level: {}", snapshot.level)),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: again | Q: quit",
            Style::default().fg(TermColor::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Game Over ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(TermColor::Black)),
    );

    let popup_area = centered_rect(26, 12, area);
    frame.render_widget(paragraph, popup_area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .split(area);

    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    vertical[1]
}

// ============================================================================
// Terminal Frontend
// ============================================================================

struct TerminalFrontend {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Frontend for TerminalFrontend {
    fn poll_input(&mut self, timeout: Duration) -> io::Result<Option<Input>> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                return Ok(map_key_event(key));
            }
        }
        Ok(None)
    }

    fn present(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        self.terminal.draw(|frame| render(frame, snapshot))?;
        Ok(())
    }
}

fn init_logging(args: &Args) -> io::Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(File::create(path)?))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

// ============================================================================
// Main Loop
// ============================================================================

fn run(engine: &mut Engine, frontend: &mut TerminalFrontend) -> io::Result<()> {
    let scheduler = Scheduler::default();
    frontend.present(engine.snapshot())?;

    // Idle: wait for Start or Quit, then hand control to the scheduler
    loop {
        match frontend.poll_input(IDLE_POLL)? {
            Some(Input::Quit) => return Ok(()),
            Some(Input::Command(Command::Start)) => {
                engine.start();
                if scheduler.run(engine, frontend)? == LoopExit::Quit {
                    return Ok(());
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let provider = match args.seed {
        Some(seed) => WeightedRandomProvider::seeded(seed),
        None => WeightedRandomProvider::from_entropy(),
    };
    let mut engine = Engine::new(
        Box::new(provider),
        Box::new(FileStore::new(args.high_score_file.clone())),
        Box::new(SystemClock::new()),
    );

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut frontend = TerminalFrontend {
        terminal: Terminal::new(CrosstermBackend::new(stdout()))?,
    };

    let result = run(&mut engine, &mut frontend);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result?;
    Ok(())
}
