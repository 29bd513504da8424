//! Key translation for the remote PTY.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Translate one key press into the characters a terminal would send.
///
/// Returns `None` for keys that have no terminal encoding.
pub fn key_to_chunk(key: &KeyEvent) -> Option<String> {
    let chunk = match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let c = c.to_ascii_lowercase();
            if !c.is_ascii_lowercase() {
                return None;
            }
            ((c as u8 - b'a' + 1) as char).to_string()
        }
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::ALT) => format!("\x1b{}", c),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "\r".to_string(),
        KeyCode::Tab => "\t".to_string(),
        KeyCode::BackTab => "\x1b[Z".to_string(),
        KeyCode::Backspace => "\x7f".to_string(),
        KeyCode::Esc => "\x1b".to_string(),
        KeyCode::Up => "\x1b[A".to_string(),
        KeyCode::Down => "\x1b[B".to_string(),
        KeyCode::Right => "\x1b[C".to_string(),
        KeyCode::Left => "\x1b[D".to_string(),
        KeyCode::Home => "\x1b[H".to_string(),
        KeyCode::End => "\x1b[F".to_string(),
        KeyCode::PageUp => "\x1b[5~".to_string(),
        KeyCode::PageDown => "\x1b[6~".to_string(),
        KeyCode::Insert => "\x1b[2~".to_string(),
        KeyCode::Delete => "\x1b[3~".to_string(),
        _ => return None,
    };
    Some(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_plain_characters_pass_through() {
        assert_eq!(
            key_to_chunk(&key(KeyCode::Char('é'), KeyModifiers::NONE)).as_deref(),
            Some("é")
        );
        assert_eq!(
            key_to_chunk(&key(KeyCode::Char('L'), KeyModifiers::SHIFT)).as_deref(),
            Some("L")
        );
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(
            key_to_chunk(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)).as_deref(),
            Some("\x03")
        );
        assert_eq!(
            key_to_chunk(&key(KeyCode::Char('D'), KeyModifiers::CONTROL)).as_deref(),
            Some("\x04")
        );
        assert_eq!(
            key_to_chunk(&key(KeyCode::Char('1'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn test_special_keys() {
        assert_eq!(
            key_to_chunk(&key(KeyCode::Enter, KeyModifiers::NONE)).as_deref(),
            Some("\r")
        );
        assert_eq!(
            key_to_chunk(&key(KeyCode::Up, KeyModifiers::NONE)).as_deref(),
            Some("\x1b[A")
        );
        assert_eq!(key_to_chunk(&key(KeyCode::F(5), KeyModifiers::NONE)), None);
    }
}
