use std::path::Path;

use crate::application::{App, AppMode, UploadRequest};
use crate::domain::{Field, FieldKind, STEP_COUNT};
use crate::infrastructure::copy_text;
use crossterm::event::{KeyCode, KeyModifiers};

pub struct InputHandler;

impl InputHandler {
    /// Applies one key press. Returns `true` when the user asked to quit.
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) -> bool {
        match app.mode {
            AppMode::Normal => return Self::handle_normal_mode(app, key, modifiers),
            AppMode::Editing => Self::handle_editing_mode(app, key),
            AppMode::AttachFile => Self::handle_attach_mode(app, key),
            AppMode::Help => Self::handle_help_mode(app, key),
            AppMode::Complete => return Self::handle_complete_mode(app, key),
        }
        false
    }

    fn handle_normal_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) -> bool {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('n') => app.next_step(),
                KeyCode::Char('p') => app.previous_step(),
                KeyCode::Char('s') => app.submit(),
                KeyCode::Char('r') => app.reset_form(),
                _ => {}
            }
            return false;
        }

        match key {
            KeyCode::Char('q') => return true,
            KeyCode::F(1) | KeyCode::Char('?') => app.show_help(),
            KeyCode::Up | KeyCode::BackTab => {
                app.status_message = None;
                app.focus_prev();
            }
            KeyCode::Down | KeyCode::Tab => {
                app.status_message = None;
                app.focus_next();
            }
            KeyCode::Enter => app.activate_focused(),
            KeyCode::Left | KeyCode::Right => {
                let forward = key == KeyCode::Right;
                match app.focused_field().map(Field::kind) {
                    Some(FieldKind::Choice(_)) => app.cycle_choice(forward),
                    Some(FieldKind::Attachments) => app.select_attachment(forward),
                    _ => {}
                }
            }
            KeyCode::Delete | KeyCode::Backspace => {
                if app.focused_field() == Some(Field::Attachments) {
                    app.remove_selected_attachment();
                }
            }
            KeyCode::PageDown => app.next_step(),
            KeyCode::PageUp => app.previous_step(),
            KeyCode::Char(c @ '1'..='9') => {
                let step = c as usize - '1' as usize;
                if step < STEP_COUNT {
                    app.jump_to_step(step);
                }
            }
            _ => {}
        }
        false
    }

    fn handle_editing_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => app.finish_editing(),
            KeyCode::Esc => app.cancel_editing(),
            KeyCode::Backspace => app.delete_before_cursor(),
            KeyCode::Delete => app.delete_at_cursor(),
            KeyCode::Left => app.move_cursor_left(),
            KeyCode::Right => app.move_cursor_right(),
            KeyCode::Home => app.move_cursor_home(),
            KeyCode::End => app.move_cursor_end(),
            KeyCode::Char(c) => app.insert_char(c),
            _ => {}
        }
    }

    fn handle_attach_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                let max_bytes = app.uploads.limits().max_file_bytes;
                let requests = app
                    .attach_paths()
                    .iter()
                    .map(|path| UploadRequest::from_path(Path::new(path), max_bytes))
                    .collect();
                app.set_attach_result(requests);
            }
            KeyCode::Esc => app.cancel_attach(),
            KeyCode::Backspace => app.delete_before_cursor(),
            KeyCode::Delete => app.delete_at_cursor(),
            KeyCode::Left => app.move_cursor_left(),
            KeyCode::Right => app.move_cursor_right(),
            KeyCode::Home => app.move_cursor_home(),
            KeyCode::End => app.move_cursor_end(),
            KeyCode::Char(c) => app.insert_char(c),
            _ => {}
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.close_help();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.help_scroll = app.help_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll += 1;
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll += 5;
            }
            KeyCode::Home => {
                app.help_scroll = 0;
            }
            _ => {}
        }
    }

    fn handle_complete_mode(app: &mut App, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('q') => return true,
            KeyCode::Char('n') => app.new_submission(),
            KeyCode::Char('c') => {
                if let Some(reference) = app.reference_number() {
                    let result = copy_text(&reference);
                    app.set_copy_result(result);
                }
            }
            KeyCode::F(1) | KeyCode::Char('?') => app.show_help(),
            _ => {}
        }
        false
    }
}
