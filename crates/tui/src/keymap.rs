use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use dtop_core::Key;

/// Translate a terminal key press into a console key.
pub fn translate(event: &KeyEvent) -> Option<Key> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return match event.code {
            KeyCode::Char('c') => Some(Key::Interrupt),
            _ => None,
        };
    }
    let key = match event.code {
        KeyCode::Up | KeyCode::Char('k') => Key::Up,
        KeyCode::Down | KeyCode::Char('j') => Key::Down,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Tab | KeyCode::BackTab => Key::Tab,
        KeyCode::Char(ch) => Key::Char(ch),
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Option<Key> {
        translate(&KeyEvent::new(code, modifiers))
    }

    #[test]
    fn vim_keys_move_the_cursor() {
        assert_eq!(press(KeyCode::Char('j'), KeyModifiers::NONE), Some(Key::Down));
        assert_eq!(press(KeyCode::Char('k'), KeyModifiers::NONE), Some(Key::Up));
        assert_eq!(press(KeyCode::Up, KeyModifiers::NONE), Some(Key::Up));
    }

    #[test]
    fn ctrl_c_interrupts_and_other_chords_are_dropped() {
        assert_eq!(
            press(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(Key::Interrupt)
        );
        assert_eq!(press(KeyCode::Char('d'), KeyModifiers::CONTROL), None);
    }

    #[test]
    fn plain_characters_pass_through() {
        assert_eq!(press(KeyCode::Char(' '), KeyModifiers::NONE), Some(Key::Space));
        assert_eq!(press(KeyCode::Char('d'), KeyModifiers::NONE), Some(Key::Char('d')));
        assert_eq!(press(KeyCode::Char('D'), KeyModifiers::SHIFT), Some(Key::Char('D')));
        assert_eq!(press(KeyCode::F(1), KeyModifiers::NONE), None);
    }
}
