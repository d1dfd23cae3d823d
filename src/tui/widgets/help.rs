use ratatui::widgets::{Block, Borders, Paragraph, Clear, Wrap};
use ratatui::style::Style;
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment};
use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let popup_area = popup_area(area, 60, 70);
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(Block::default()
            .borders(Borders::ALL)
            .title("Help - Key Bindings")
            .title_alignment(Alignment::Center)
            .style(Style::default().fg(fg_color).bg(bg_color)))
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

pub fn build_help_text(config: &Config) -> String {
    let kb = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Views:\n");
    text.push_str(&format!("  {} / {} / {}: Study / Manage / AI Generate\n",
        key(&kb.view_study), key(&kb.view_manage), key(&kb.view_generate)));
    text.push_str("  Tab: Next view\n\n");

    text.push_str("Study:\n");
    text.push_str(&format!("  {}: Flip card\n", key(&kb.flip)));
    text.push_str(&format!("  {} / {}: Previous / next card\n", key(&kb.prev_card), key(&kb.next_card)));
    text.push_str(&format!("  {}: Copy card to clipboard\n\n", key(&kb.copy)));

    text.push_str("Cards:\n");
    text.push_str(&format!("  {}: New card\n", key(&kb.new)));
    text.push_str(&format!("  {}: Edit card\n", key(&kb.edit)));
    text.push_str(&format!("  {}: Delete card\n", key(&kb.delete)));
    text.push_str(&format!("  {} / {}: Move selection (Manage)\n\n", key(&kb.list_up), key(&kb.list_down)));

    text.push_str("Card Editor:\n");
    text.push_str(&format!("  {}: Save card\n", key(&kb.save)));
    text.push_str("  Tab: Switch question / answer\n");
    text.push_str(&format!("  {}: Paste\n", key(&kb.paste)));
    text.push_str("  Esc: Cancel\n\n");

    text.push_str("AI Generate:\n");
    text.push_str("  Tab: Switch topic / count\n");
    text.push_str("  ←/→: Change count\n");
    text.push_str("  Enter: Generate\n");
    text.push_str("  Esc: Back to study\n\n");

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Quit\n", key(&kb.quit)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&kb.help)));

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_configured_bindings() {
        let mut config = Config::default();
        config.key_bindings.flip = "f".to_string();
        let text = build_help_text(&config);
        assert!(text.contains("  f: Flip card"));
        assert!(text.contains("Save card"));
    }
}
