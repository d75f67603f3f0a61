use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::game::Command;

/// What a key press asks for: an engine command, or leaving the program.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Input {
    Command(Command),
    Quit,
}

pub fn map_key(code: KeyCode) -> Option<Input> {
    let command = match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(Input::Quit),
        KeyCode::Enter => Command::Start,
        KeyCode::Esc => Command::Stop,
        KeyCode::Left => Command::MoveLeft,
        KeyCode::Right => Command::MoveRight,
        KeyCode::Down => Command::SoftDrop,
        KeyCode::Up => Command::Rotate,
        _ => return None,
    };
    Some(Input::Command(command))
}

/// Maps key presses; releases and repeats of other kinds are ignored.
pub fn map_key_event(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    map_key(key.code)
}
