//! ---
//! ems_section: "12-gui-setup-wizard"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Terminal dashboard for the EV charging-queue simulation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use evq_core::{Command, ControlState, MarkerHandle};

use crate::view::ViewModel;

/// Terminal-local state that never reaches the controller.
#[derive(Debug, Default)]
pub struct UiState {
    /// Highlighted row of the agent selector.
    pub cursor: usize,
    /// Marker whose popup is shown in the detail pane.
    pub detail: Option<MarkerHandle>,
    pub notice: Option<String>,
}

pub enum Action {
    None,
    Quit,
    Dispatch(Command),
}

const DISABLED_CONTROLS: ControlState = ControlState {
    start: false,
    stop: false,
    reset: false,
    generate: false,
};

pub fn handle_key(key: KeyEvent, ui: &mut UiState, view: &mut ViewModel, max_speed: u32) -> Action {
    ui.notice = None;
    let controls = view.controls.unwrap_or(DISABLED_CONTROLS);
    let speed = view.speed.max(1);
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('s') => gated(controls.start, "start", Command::Start, ui),
        KeyCode::Char('x') => gated(controls.stop, "stop", Command::Stop, ui),
        KeyCode::Char('r') => gated(controls.reset, "reset", Command::Reset, ui),
        KeyCode::Char('g') => gated(controls.generate, "generate", Command::Generate(None), ui),
        KeyCode::Char('+') | KeyCode::Char('=') if speed < max_speed => {
            Action::Dispatch(Command::SetSpeed(speed + 1))
        }
        KeyCode::Char('-') if speed > 1 => Action::Dispatch(Command::SetSpeed(speed - 1)),
        KeyCode::Up | KeyCode::Char('k') => {
            ui.cursor = ui.cursor.saturating_sub(1);
            Action::None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if ui.cursor + 1 < view.options.len() {
                ui.cursor += 1;
            }
            Action::None
        }
        KeyCode::Enter => match view.options.get(ui.cursor) {
            Some(option) => {
                ui.detail = view.marker_with_heading(&format!("EV {}", option.agent_id));
                Action::Dispatch(Command::Select(Some(option.agent_id.clone())))
            }
            None => Action::None,
        },
        KeyCode::Backspace | KeyCode::Delete => Action::Dispatch(Command::Select(None)),
        KeyCode::Tab => {
            ui.detail = next_marker(view, ui.detail);
            Action::None
        }
        KeyCode::PageUp => {
            view.log_offset = (view.log_offset + 10).min(view.log.len());
            Action::None
        }
        KeyCode::PageDown => {
            view.log_offset = view.log_offset.saturating_sub(10);
            Action::None
        }
        _ => Action::None,
    }
}

fn gated(enabled: bool, name: &str, command: Command, ui: &mut UiState) -> Action {
    if enabled {
        Action::Dispatch(command)
    } else {
        ui.notice = Some(format!("{name} is disabled right now"));
        Action::None
    }
}

fn next_marker(view: &ViewModel, current: Option<MarkerHandle>) -> Option<MarkerHandle> {
    let mut handles = view.markers.keys().copied();
    match current {
        Some(current) => view
            .markers
            .range(current..)
            .map(|(handle, _)| *handle)
            .find(|handle| *handle != current)
            .or_else(|| handles.next()),
        None => handles.next(),
    }
}

/// Keep the selector cursor inside the current option list.
pub fn clamp_cursor(ui: &mut UiState, view: &ViewModel) {
    if view.options.is_empty() {
        ui.cursor = 0;
    } else if ui.cursor >= view.options.len() {
        ui.cursor = view.options.len() - 1;
    }
    if let Some(detail) = ui.detail {
        if !view.markers.contains_key(&detail) {
            ui.detail = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    #[test]
    fn disabled_controls_ignore_their_keys() {
        let mut ui = UiState::default();
        let mut view = ViewModel::default();
        view.controls = Some(ControlState {
            start: false,
            stop: true,
            reset: false,
            generate: false,
        });
        assert!(matches!(
            handle_key(key(KeyCode::Char('s')), &mut ui, &mut view, 10),
            Action::None
        ));
        assert!(ui.notice.is_some());
        assert!(matches!(
            handle_key(key(KeyCode::Char('x')), &mut ui, &mut view, 10),
            Action::Dispatch(Command::Stop)
        ));
    }

    #[test]
    fn speed_keys_stay_in_range() {
        let mut ui = UiState::default();
        let mut view = ViewModel::default();
        view.speed = 10;
        assert!(matches!(
            handle_key(key(KeyCode::Char('+')), &mut ui, &mut view, 10),
            Action::None
        ));
        assert!(matches!(
            handle_key(key(KeyCode::Char('-')), &mut ui, &mut view, 10),
            Action::Dispatch(Command::SetSpeed(9))
        ));
    }
}
