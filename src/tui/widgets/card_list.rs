use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Layout, Constraint, Alignment};
use ratatui::text::{Line, Span};
use crate::models::Flashcard;
use crate::Config;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};
use crate::tui::widgets::truncate_with_ellipsis;

/// Manage view: every card as question plus a dimmed answer line
pub fn render_card_list(f: &mut Frame, area: Rect, cards: &[Flashcard], list_state: &mut ListState, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);
    let title = format!("Cards ({})", cards.len());

    if cards.is_empty() {
        let text = format!(
            "No cards. Press {} to add one.",
            crate::utils::format_key_binding_for_display(&config.key_bindings.new)
        );
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(fg_color))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    }

    let [list_area, scrollbar_area] = Layout::horizontal([
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(area);

    // 2 for borders, 2 for the highlight symbol
    let max_width = list_area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = cards
        .iter()
        .map(|card| {
            let question = truncate_with_ellipsis(&single_line(&card.question), max_width);
            let answer = truncate_with_ellipsis(&single_line(&card.answer), max_width);
            ListItem::new(vec![
                Line::from(Span::styled(question, Style::default().add_modifier(Modifier::BOLD))),
                Line::from(Span::styled(answer, Style::default().add_modifier(Modifier::DIM))),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(fg_color))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg))
        .highlight_symbol("> ");

    f.render_stateful_widget(list, list_area, list_state);

    // Two lines per card
    let viewport_cards = (list_area.height.saturating_sub(2) / 2) as usize;
    if cards.len() > viewport_cards {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1,
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(cards.len())
            .viewport_content_length(viewport_cards)
            .position(list_state.selected().unwrap_or(0));
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
