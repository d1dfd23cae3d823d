use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Layout, Constraint, Alignment, Flex};
use ratatui::text::{Line, Span};
use crate::Config;
use crate::config::GENERATION_COUNTS;
use crate::tui::app::{GeneratorField, GeneratorState};
use crate::tui::widgets::card_form::render_input_field;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};

/// AI generation form: topic, card count, submit state
pub fn render_generator(f: &mut Frame, area: Rect, generator: &GeneratorState, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);
    let error_fg = parse_color(&active_theme.error_fg);
    let base = Style::default().fg(fg_color).bg(bg_color);

    let outer = Block::default()
        .borders(Borders::ALL)
        .title("AI Card Generator")
        .style(base);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let [form_area] = Layout::horizontal([Constraint::Percentage(80)])
        .flex(Flex::Center)
        .areas(inner);
    let [intro_area, topic_area, count_area, status_area, error_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(3),
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Min(1),
    ])
    .areas(form_area);

    f.render_widget(
        Paragraph::new("Enter a topic and the number of cards to create.")
            .style(base.add_modifier(Modifier::DIM))
            .wrap(Wrap { trim: true }),
        intro_area,
    );

    let topic_focused = !generator.loading && generator.current_field == GeneratorField::Topic;
    render_input_field(f, topic_area, "Topic", &generator.topic, topic_focused, highlight_bg, base);

    let count_focused = !generator.loading && generator.current_field == GeneratorField::Count;
    let mut count_spans = vec![Span::styled(
        "Cards: ",
        if count_focused { base.add_modifier(Modifier::BOLD) } else { base },
    )];
    for count in GENERATION_COUNTS {
        let style = if count == generator.count {
            Style::default().fg(highlight_fg).bg(highlight_bg).add_modifier(Modifier::BOLD)
        } else {
            base
        };
        count_spans.push(Span::styled(format!(" {} ", count), style));
        count_spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(count_spans)).style(base), count_area);

    let status = if generator.loading {
        format!("Generating {} cards...", generator.count)
    } else {
        "Enter: Generate • Tab: switch field • ←/→: change count • Esc: back".to_string()
    };
    f.render_widget(
        Paragraph::new(status).style(base).alignment(Alignment::Left),
        status_area,
    );

    if let Some(ref error) = generator.error {
        f.render_widget(
            Paragraph::new(error.as_str())
                .style(Style::default().fg(error_fg).bg(bg_color).add_modifier(Modifier::BOLD))
                .wrap(Wrap { trim: true }),
            error_area,
        );
    }

    if topic_focused {
        if let Some((x, y)) = generator.topic.cursor_screen_pos(topic_area) {
            f.set_cursor_position((x, y));
        }
    }
}
