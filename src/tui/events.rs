use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, size as terminal_size};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io;
use std::time::Duration;
use crate::tui::app::{GeneratorField, View};
use crate::tui::widgets::confirm_delete::DELETE_OPTIONS;
use crate::tui::widgets::text_input::TextInput;
use crate::tui::{App, Layout};
use crate::tui::error::TuiError;
use crate::utils::{has_primary_modifier, parse_key_binding, ParsedKeyBinding};

/// Guard that ensures terminal state is restored even on panic.
/// If the terminal is left in raw mode or the alternate screen,
/// the user's shell is unusable.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;

        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore terminal state on normal exit; drop does nothing afterwards
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Already on a cleanup path, errors are ignored
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Check size before entering the alternate screen so the error is readable
    let (width, height) = terminal_size()?;
    let min_width_with_border = Layout::MIN_WIDTH + 2;
    let min_height_with_border = Layout::MIN_HEIGHT + 2;

    if width < min_width_with_border || height < min_height_with_border {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width_with_border, min_height_with_border
        )));
    }

    let mut guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    loop {
        app.check_status_message_timeout();

        let terminal_size = terminal.size()?;
        let terminal_rect = Rect::new(0, 0, terminal_size.width, terminal_size.height);
        terminal.draw(|f| {
            let layout = Layout::calculate(terminal_rect);
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        // The loading frame is on screen; run the request now. Keys pressed
        // while it was outstanding are discarded.
        if app.generator.loading {
            app.run_pending_generation();
            while event::poll(Duration::ZERO)? {
                event::read()?;
            }
            continue;
        }

        // Only Press events, to avoid double-processing on Windows
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event)? {
                    break;
                }
            }
        }
    }

    guard.restore()?;

    Ok(())
}

/// Returns Ok(true) when the app should quit
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if app.generator.loading {
        return Ok(false);
    }

    if app.delete_confirmation.is_some() {
        handle_delete_confirmation_modal(app, key_event);
        return Ok(false);
    }

    if app.show_help {
        return handle_help_mode(app, key_event);
    }

    if app.editor.is_some() {
        return handle_editor_mode(app, key_event);
    }

    if app.view == View::Generate && handle_generator_mode(app, key_event)? {
        return Ok(false);
    }

    handle_global_key_bindings(app, key_event)
}

fn binding(key_str: &str) -> Result<ParsedKeyBinding, TuiError> {
    parse_key_binding(key_str).map_err(TuiError::KeyBindingError)
}

fn handle_delete_confirmation_modal(app: &mut App, key_event: KeyEvent) {
    let last = DELETE_OPTIONS.len() - 1;
    match key_event.code {
        KeyCode::Up => {
            app.delete_modal_selection = if app.delete_modal_selection == 0 { last } else { app.delete_modal_selection - 1 };
        }
        KeyCode::Down | KeyCode::Tab => {
            app.delete_modal_selection = if app.delete_modal_selection == last { 0 } else { app.delete_modal_selection + 1 };
        }
        KeyCode::Enter => {
            if app.delete_modal_selection == 0 {
                app.confirm_delete();
            } else {
                app.cancel_delete();
            }
        }
        KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let help_binding = binding(&app.config.key_bindings.help)?;
    if key_event.code == KeyCode::Esc || matches_key_event(key_event, &help_binding) {
        app.show_help = false;
    }
    // Ignore all other keys in help mode
    Ok(false)
}

fn handle_editor_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let save_binding = binding(&app.config.key_bindings.save)?;
    let paste_binding = binding(&app.config.key_bindings.paste)?;

    if matches_key_event(key_event, &save_binding) {
        app.submit_editor();
        return Ok(false);
    }
    if matches_key_event(key_event, &paste_binding) {
        app.paste_from_clipboard();
        return Ok(false);
    }

    match key_event.code {
        KeyCode::Esc => app.close_editor(),
        KeyCode::Tab | KeyCode::BackTab => {
            if let Some(editor) = app.editor.as_mut() {
                editor.toggle_field();
            }
        }
        _ => {
            if let Some(editor) = app.editor.as_mut() {
                edit_text_input(editor.active_input_mut(), key_event);
            }
        }
    }
    Ok(false)
}

/// Returns Ok(true) when the key was consumed by the form
fn handle_generator_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let help_binding = binding(&app.config.key_bindings.help)?;
    if matches_key_event(key_event, &help_binding) {
        return Ok(false);
    }
    let paste_binding = binding(&app.config.key_bindings.paste)?;
    if matches_key_event(key_event, &paste_binding) {
        app.paste_from_clipboard();
        return Ok(true);
    }

    match key_event.code {
        KeyCode::Esc => {
            app.switch_view(View::Study);
            return Ok(true);
        }
        KeyCode::Tab | KeyCode::BackTab => {
            app.generator.toggle_field();
            return Ok(true);
        }
        KeyCode::Enter => {
            app.submit_generation();
            return Ok(true);
        }
        _ => {}
    }

    match app.generator.current_field {
        GeneratorField::Topic => Ok(edit_text_input(&mut app.generator.topic, key_event)),
        GeneratorField::Count => match key_event.code {
            KeyCode::Left | KeyCode::Up => {
                app.generator.cycle_count(false);
                Ok(true)
            }
            KeyCode::Right | KeyCode::Down => {
                app.generator.cycle_count(true);
                Ok(true)
            }
            // Global bindings stay live while the count is focused
            _ => Ok(false),
        },
    }
}

/// Apply an editing key to a text input. Returns whether the key was used.
fn edit_text_input(input: &mut TextInput, key_event: KeyEvent) -> bool {
    match key_event.code {
        KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => input.insert_char(c),
        KeyCode::Enter => input.insert_newline(),
        KeyCode::Backspace => input.delete_char(),
        KeyCode::Delete => input.delete_forward(),
        KeyCode::Left => input.move_cursor_left(),
        KeyCode::Right => input.move_cursor_right(),
        KeyCode::Up => input.move_cursor_up(),
        KeyCode::Down => input.move_cursor_down(),
        KeyCode::Home => input.move_cursor_home(),
        KeyCode::End => input.move_cursor_end(),
        _ => return false,
    }
    true
}

fn handle_global_key_bindings(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let kb = app.config.key_bindings.clone();

    if matches_key_event(key_event, &binding(&kb.quit)?) {
        return Ok(true);
    }
    if matches_key_event(key_event, &binding(&kb.help)?) {
        app.show_help = true;
        return Ok(false);
    }

    if matches_key_event(key_event, &binding(&kb.view_study)?) {
        app.switch_view(View::Study);
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&kb.view_manage)?) {
        app.switch_view(View::Manage);
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&kb.view_generate)?) {
        app.switch_view(View::Generate);
        return Ok(false);
    }
    if key_event.code == KeyCode::Tab && !key_event.modifiers.contains(KeyModifiers::SHIFT) {
        app.switch_view(app.view.next());
        return Ok(false);
    }

    if app.view == View::Generate {
        return Ok(false);
    }

    if matches_key_event(key_event, &binding(&kb.new)?) {
        app.open_create_editor();
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&kb.edit)?) {
        app.open_edit_editor();
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&kb.delete)?) {
        app.request_delete();
        return Ok(false);
    }

    match app.view {
        View::Study => {
            if matches_key_event(key_event, &binding(&kb.flip)?) {
                app.flip_current_card();
            } else if matches_key_event(key_event, &binding(&kb.next_card)?) {
                app.next_card();
            } else if matches_key_event(key_event, &binding(&kb.prev_card)?) {
                app.prev_card();
            } else if matches_key_event(key_event, &binding(&kb.copy)?) {
                app.copy_current_card();
            }
        }
        View::Manage => {
            if key_event.code == KeyCode::Up || matches_key_event(key_event, &binding(&kb.list_up)?) {
                app.move_selection_up();
            } else if key_event.code == KeyCode::Down || matches_key_event(key_event, &binding(&kb.list_down)?) {
                app.move_selection_down();
            } else if key_event.code == KeyCode::Enter {
                app.open_edit_editor();
            }
        }
        View::Generate => {}
    }

    Ok(false)
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Primary modifier is Ctrl on Windows/Linux, Option/Alt on macOS
    if binding.requires_ctrl != has_primary_modifier(key_event.modifiers) {
        return false;
    }
    binding.key_code == key_event.code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Gateway, GatewayError, GenerationRequest, GenerationService};
    use crate::storage::MemoryRepository;
    use crate::store::CardStore;
    use crate::Config;

    struct NoService;

    impl GenerationService for NoService {
        fn complete(&self, _request: &GenerationRequest) -> Result<String, GatewayError> {
            Ok("[]".to_string())
        }
    }

    fn app() -> App {
        let store = CardStore::open(Box::new(MemoryRepository::new())).unwrap();
        App::new(Config::default(), store, Gateway::new(Box::new(NoService)))
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn ctrl(app: &mut App, c: char) -> bool {
        handle_key_event(app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)).unwrap()
    }

    #[test]
    fn test_quit_binding() {
        let mut app = app();
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_study_keys_flip_and_navigate() {
        let mut app = app();
        press(&mut app, KeyCode::Char(' '));
        assert!(app.is_current_card_flipped());
        press(&mut app, KeyCode::Right);
        assert_eq!(app.study_index, 1);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.study_index, 2);
    }

    #[test]
    fn test_typing_q_in_topic_does_not_quit() {
        let mut app = app();
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.view, View::Generate);
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.generator.topic.text(), "q1");
        assert_eq!(app.view, View::Generate);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view, View::Study);
    }

    #[test]
    fn test_count_field_cycles_with_arrows() {
        let mut app = app();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.generator.count, 10);
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.view, View::Study);
    }

    #[test]
    fn test_editor_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        for c in "Q?".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('A'));
        ctrl(&mut app, 's');

        assert!(app.editor.is_none());
        assert_eq!(app.store.cards()[0].question, "Q?");
        assert_eq!(app.store.cards()[0].answer, "A");
    }

    #[test]
    fn test_editor_escape_discards() {
        let mut app = app();
        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Char('!'));
        press(&mut app, KeyCode::Esc);
        assert!(app.editor.is_none());
        assert_eq!(app.store.cards()[0].question, "What is the capital of France?");
    }

    #[test]
    fn test_delete_modal_navigation() {
        let mut app = app();
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.len(), 3);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.len(), 2);
    }

    #[test]
    fn test_keys_ignored_while_loading() {
        let mut app = app();
        app.generator.loading = true;
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.view, View::Study);
    }

    #[test]
    fn test_help_overlay_swallows_keys() {
        let mut app = app();
        press(&mut app, KeyCode::F(1));
        assert!(app.show_help);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.study_index, 0);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_help);
    }
}
