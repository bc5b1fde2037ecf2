use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use guru_core::Surface;
use crate::app::App;
use crate::tui::AppEvent;

const SCROLL_STEP: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work on any surface
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // An open alert swallows keys until dismissed
    if app.view.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.view.alert = None;
        }
        return;
    }

    match app.view.surface {
        Surface::Login | Surface::Signup => handle_form_key(app, key),
        Surface::Chat => handle_chat_key(app, key),
    }
}

fn handle_form_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('n') if ctrl => app.switch_auth_surface(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.view.toggle_form_field();
        }
        KeyCode::Enter => app.submit_auth(),
        KeyCode::Backspace => {
            app.view.focused_field_mut().pop();
        }
        KeyCode::Char(c) if !ctrl => {
            app.view.focused_field_mut().push(c);
            app.view.form_error = None;
        }
        _ => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::Enter => {
            app.send_chat();
            return;
        }

        // Session actions
        KeyCode::Char('r') if ctrl => {
            app.retry_last();
            return;
        }
        KeyCode::Char('k') if ctrl => {
            app.clear_history();
            return;
        }
        KeyCode::Char('x') if ctrl => {
            app.logout();
            return;
        }
        _ => {}
    }

    let view = &mut app.view;
    let page = view.chat_height.max(1);

    match key.code {
        // Scrolling
        KeyCode::Up => view.scroll_up(1),
        KeyCode::Down => view.scroll_down(1),
        KeyCode::PageUp => view.scroll_up(page),
        KeyCode::PageDown => view.scroll_down(page),

        // Input editing
        KeyCode::Backspace => {
            if view.chat_cursor > 0 {
                view.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&view.chat_input, view.chat_cursor);
                view.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = view.chat_input.chars().count();
            if view.chat_cursor < char_count {
                let byte_pos = char_to_byte_index(&view.chat_input, view.chat_cursor);
                view.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            view.chat_cursor = view.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = view.chat_input.chars().count();
            view.chat_cursor = (view.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            view.chat_cursor = 0;
        }
        KeyCode::End => {
            view.chat_cursor = view.chat_input.chars().count();
        }
        KeyCode::Char(c) if !ctrl => {
            let byte_pos = char_to_byte_index(&view.chat_input, view.chat_cursor);
            view.chat_input.insert(byte_pos, c);
            view.chat_cursor += 1;
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    // Single-line inputs: newlines in pasted text become spaces
    let text: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();

    match app.view.surface {
        Surface::Login | Surface::Signup => {
            app.view.focused_field_mut().push_str(&text);
        }
        Surface::Chat => {
            let view = &mut app.view;
            let byte_pos = char_to_byte_index(&view.chat_input, view.chat_cursor);
            view.chat_input.insert_str(byte_pos, &text);
            view.chat_cursor += text.chars().count();
        }
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.view.surface != Surface::Chat {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.view.scroll_down(SCROLL_STEP),
        MouseEventKind::ScrollUp => app.view.scroll_up(SCROLL_STEP),
        _ => {}
    }
}
