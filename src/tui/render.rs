use ratatui::Frame;
use ratatui::widgets::{Block, Borders};
use ratatui::style::Style;
use crate::tui::{App, Layout, View};
use crate::tui::widgets::{
    card_form::render_card_form,
    card_list::render_card_list,
    color::parse_color,
    confirm_delete::render_confirm_delete,
    flashcard::render_flashcard,
    generator::render_generator,
    help::render_help,
    status_bar::render_status_bar,
    tabs::render_tabs,
};
use crate::utils::format_key_binding_for_display as key;

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("Flashdeck")
        .title_alignment(ratatui::layout::Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(outer_block, f.area());

    render_tabs(f, layout.tabs_area, app.view, app.store.len(), &app.config);

    match app.view {
        View::Study => {
            let flipped = app.is_current_card_flipped();
            render_flashcard(
                f,
                layout.main_area,
                app.current_card(),
                app.study_index,
                app.store.len(),
                flipped,
                &app.config,
            );
        }
        View::Manage => {
            render_card_list(f, layout.main_area, app.store.cards(), &mut app.manage_state, &app.config);
        }
        View::Generate => {
            render_generator(f, layout.main_area, &app.generator, &app.config);
        }
    }

    let hints = key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_ref(), &hints, &app.config);

    // Overlays
    if let Some(ref editor) = app.editor {
        render_card_form(f, layout.inner_area, editor, &app.config);
    }
    if let Some(ref card) = app.delete_confirmation {
        render_confirm_delete(f, layout.inner_area, card, app.delete_modal_selection, &app.config);
    }
    if app.show_help {
        let area = f.area();
        render_help(f, area, &app.config);
    }
}

fn key_hints(app: &App) -> Vec<String> {
    let kb = &app.config.key_bindings;
    if app.editor.is_some() {
        return vec![
            format!("{}: Save", key(&kb.save)),
            "Tab: Switch field".to_string(),
            format!("{}: Paste", key(&kb.paste)),
            "Esc: Cancel".to_string(),
        ];
    }
    if app.generator.loading {
        return vec!["Generating...".to_string()];
    }
    let mut hints = match app.view {
        View::Study => vec![
            format!("{}: Flip", key(&kb.flip)),
            format!("{}/{}: Prev/Next", key(&kb.prev_card), key(&kb.next_card)),
            format!("{}: New", key(&kb.new)),
            format!("{}: Edit", key(&kb.edit)),
            format!("{}: Delete", key(&kb.delete)),
            format!("{}: Copy", key(&kb.copy)),
        ],
        View::Manage => vec![
            format!("{}/{}: Move", key(&kb.list_up), key(&kb.list_down)),
            format!("{}: New", key(&kb.new)),
            format!("{}: Edit", key(&kb.edit)),
            format!("{}: Delete", key(&kb.delete)),
        ],
        View::Generate => vec![
            "Enter: Generate".to_string(),
            "Esc: Back".to_string(),
        ],
    };
    if app.view != View::Generate {
        hints.push(format!("{}: Quit", key(&kb.quit)));
    }
    hints.push(format!("{}: Help", key(&kb.help)));
    hints
}
