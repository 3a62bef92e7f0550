//! Input encoding for the shell
//!
//! Converts crossterm key events into the byte sequences a PTY expects.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Convert a key event to bytes for the PTY.
///
/// Returns None for keys we don't handle (e.g., function keys).
pub fn key_event_to_bytes(key: KeyEvent) -> Option<Vec<u8>> {
    match key.code {
        KeyCode::Char(ch) => {
            // Ctrl+letter produces control codes (1-26)
            let lowercase = ch.to_ascii_lowercase();
            let bytes = if key.modifiers.contains(KeyModifiers::CONTROL)
                && lowercase.is_ascii_lowercase()
            {
                vec![(lowercase as u8 - b'a') + 1]
            } else {
                let mut buffer = [0u8; 4];
                ch.encode_utf8(&mut buffer).as_bytes().to_vec()
            };
            Some(with_alt_prefix(key.modifiers, bytes))
        }
        KeyCode::Enter => Some(with_alt_prefix(key.modifiers, vec![b'\r'])),
        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => Some(b"\x1b[Z".to_vec()),
        KeyCode::Tab => Some(with_alt_prefix(key.modifiers, vec![b'\t'])),
        KeyCode::BackTab => Some(b"\x1b[Z".to_vec()),
        KeyCode::Backspace => Some(with_alt_prefix(key.modifiers, vec![0x7f])),
        KeyCode::Esc => Some(vec![0x1b]),
        KeyCode::Up => Some(encode_csi_key(key.modifiers, "A")),
        KeyCode::Down => Some(encode_csi_key(key.modifiers, "B")),
        KeyCode::Right => Some(encode_csi_key(key.modifiers, "C")),
        KeyCode::Left => Some(encode_csi_key(key.modifiers, "D")),
        KeyCode::Home => Some(encode_csi_key(key.modifiers, "H")),
        KeyCode::End => Some(encode_csi_key(key.modifiers, "F")),
        KeyCode::Delete => Some(encode_csi_tilde_key(key.modifiers, "3")),
        KeyCode::PageUp => Some(encode_csi_tilde_key(key.modifiers, "5")),
        KeyCode::PageDown => Some(encode_csi_tilde_key(key.modifiers, "6")),
        _ => None,
    }
}

fn with_alt_prefix(modifiers: KeyModifiers, bytes: Vec<u8>) -> Vec<u8> {
    if !modifiers.contains(KeyModifiers::ALT) {
        return bytes;
    }
    let mut prefixed = Vec::with_capacity(bytes.len() + 1);
    prefixed.push(0x1b);
    prefixed.extend(bytes);
    prefixed
}

fn modifier_param(modifiers: KeyModifiers) -> Option<u8> {
    let mut value = 1;
    if modifiers.contains(KeyModifiers::SHIFT) {
        value += 1;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        value += 2;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        value += 4;
    }
    (value > 1).then_some(value)
}

fn encode_csi_key(modifiers: KeyModifiers, final_byte: &str) -> Vec<u8> {
    match modifier_param(modifiers) {
        Some(param) => format!("\x1b[1;{param}{final_byte}").into_bytes(),
        None => format!("\x1b[{final_byte}").into_bytes(),
    }
}

fn encode_csi_tilde_key(modifiers: KeyModifiers, code: &str) -> Vec<u8> {
    match modifier_param(modifiers) {
        Some(param) => format!("\x1b[{code};{param}~").into_bytes(),
        None => format!("\x1b[{code}~").into_bytes(),
    }
}
