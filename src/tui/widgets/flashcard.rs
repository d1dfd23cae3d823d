use ratatui::widgets::{Block, Borders, Paragraph, Wrap, BorderType};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Layout, Constraint, Alignment, Flex};
use ratatui::text::{Text, Line, Span};
use crate::models::Flashcard;
use crate::Config;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};
use ratskin::RatSkin;
use termimad::minimad::Text as MinimadText;

/// Render card text with markdown styling, wrapped to `width`
pub fn markdown_lines(content: &str, width: u16) -> Vec<Line<'static>> {
    let parsed = RatSkin::default().parse(MinimadText::from(content), width);
    parsed
        .into_iter()
        .map(|line| {
            let spans: Vec<Span> = line
                .spans
                .into_iter()
                .map(|span| Span::styled(span.content.to_string(), span.style))
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// "Card 2 of 3"
pub fn progress_label(index: usize, total: usize) -> String {
    format!("Card {} of {}", index + 1, total)
}

/// Study view: one card, question side up until flipped
pub fn render_flashcard(
    f: &mut Frame,
    area: Rect,
    card: Option<&Flashcard>,
    index: usize,
    total: usize,
    flipped: bool,
    config: &Config,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let Some(card) = card else {
        render_empty_deck(f, area, config);
        return;
    };

    let [progress_area, card_area, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let [card_area] = Layout::horizontal([Constraint::Percentage(80)])
        .flex(Flex::Center)
        .areas(card_area);

    let progress = Paragraph::new(progress_label(index, total))
        .style(Style::default().fg(fg_color).bg(bg_color).add_modifier(Modifier::DIM))
        .alignment(Alignment::Center);
    f.render_widget(progress, progress_area);

    let (title, content, face_style) = if flipped {
        let answer_bg = parse_color(&active_theme.answer_bg);
        ("Answer", card.answer.as_str(), Style::default().fg(get_contrast_text_color(answer_bg)).bg(answer_bg))
    } else {
        ("Question", card.question.as_str(), Style::default().fg(fg_color).bg(bg_color))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .title_alignment(Alignment::Center)
        .style(face_style);

    let inner = block.inner(card_area);
    let lines = markdown_lines(content, inner.width.max(1));

    // Vertically center short cards
    let padding = (inner.height as usize).saturating_sub(lines.len()) / 2;
    let mut body: Vec<Line> = vec![Line::from(""); padding];
    body.extend(lines);

    let paragraph = Paragraph::new(Text::from(body))
        .block(block)
        .style(face_style)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, card_area);

    let flip_key = crate::utils::format_key_binding_for_display(&config.key_bindings.flip);
    let hint_text = if flipped {
        format!("{}: show question", flip_key)
    } else {
        format!("{}: reveal answer", flip_key)
    };
    let hint = Paragraph::new(hint_text)
        .style(Style::default().fg(fg_color).bg(bg_color).add_modifier(Modifier::DIM))
        .alignment(Alignment::Center);
    f.render_widget(hint, hint_area);
}

fn render_empty_deck(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let kb = &config.key_bindings;

    let text = format!(
        "No cards yet.\n\nPress {} to create one, or {} to generate cards with AI.",
        crate::utils::format_key_binding_for_display(&kb.new),
        crate::utils::format_key_binding_for_display(&kb.view_generate),
    );
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Study"))
        .style(Style::default().fg(fg_color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_label_is_one_based() {
        assert_eq!(progress_label(0, 3), "Card 1 of 3");
        assert_eq!(progress_label(2, 3), "Card 3 of 3");
    }

    #[test]
    fn test_markdown_lines_keep_text() {
        let lines = markdown_lines("Paris", 40);
        let text: String = lines
            .iter()
            .flat_map(|l| l.spans.iter().map(|s| s.content.to_string()))
            .collect();
        assert!(text.contains("Paris"));
    }
}
