use ratatui::widgets::{Block, Borders, Paragraph, Clear};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Layout, Constraint, Alignment};
use ratatui::text::Line;
use crate::Config;
use crate::tui::app::{CardEditor, EditorField};
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};
use crate::tui::widgets::popup_area;
use crate::tui::widgets::text_input::TextInput;
use crate::utils::format_key_binding_for_display;

/// Card editor modal, shared by create and edit
pub fn render_card_form(f: &mut Frame, area: Rect, editor: &CardEditor, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let error_fg = parse_color(&active_theme.error_fg);
    let base = Style::default().fg(fg_color).bg(bg_color);

    let popup_area = popup_area(area, 70, 70);
    f.render_widget(Clear, popup_area);

    let title = if editor.is_edit() { "Edit Card" } else { "New Card" };
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(Alignment::Center)
        .style(base);
    let inner = outer.inner(popup_area);
    f.render_widget(outer, popup_area);

    let [question_area, answer_area, error_area, hint_area] = Layout::vertical([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    let focused = |field: EditorField| editor.current_field == field;
    render_input_field(f, question_area, "Question", &editor.question, focused(EditorField::Question), highlight_bg, base);
    render_input_field(f, answer_area, "Answer", &editor.answer, focused(EditorField::Answer), highlight_bg, base);

    if let Some(ref error) = editor.error {
        let paragraph = Paragraph::new(error.as_str())
            .style(Style::default().fg(error_fg).bg(bg_color).add_modifier(Modifier::BOLD));
        f.render_widget(paragraph, error_area);
    }

    let hint = format!(
        "{}: {} • Tab: switch field • Esc: cancel",
        format_key_binding_for_display(&config.key_bindings.save),
        if editor.is_edit() { "update" } else { "save" },
    );
    f.render_widget(Paragraph::new(hint).style(base.add_modifier(Modifier::DIM)), hint_area);

    let (input, input_area) = match editor.current_field {
        EditorField::Question => (&editor.question, question_area),
        EditorField::Answer => (&editor.answer, answer_area),
    };
    if let Some((x, y)) = input.cursor_screen_pos(input_area) {
        f.set_cursor_position((x, y));
    }
}

/// Bordered text box; the focused one gets a highlighted border
pub fn render_input_field(
    f: &mut Frame,
    area: Rect,
    label: &str,
    input: &TextInput,
    focused: bool,
    highlight_bg: ratatui::style::Color,
    base: Style,
) {
    let border_style = if focused {
        Style::default().fg(highlight_bg).add_modifier(Modifier::BOLD)
    } else {
        base
    };
    let height = area.height.saturating_sub(2) as usize;
    let width = area.width.saturating_sub(2) as usize;
    let lines: Vec<Line> = input
        .visible_lines(height, width)
        .into_iter()
        .map(Line::from)
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(label)
        .border_style(border_style);
    let paragraph = Paragraph::new(lines).block(block).style(base);
    f.render_widget(paragraph, area);

    // Keep the focused label readable on any theme
    if focused && area.width > 2 {
        let label_area = Rect::new(area.x + 1, area.y, (label.len() as u16).min(area.width - 2), 1);
        let label_style = Style::default().fg(get_contrast_text_color(highlight_bg)).bg(highlight_bg);
        f.render_widget(Paragraph::new(label).style(label_style), label_area);
    }
}
