use crate::Config;
use crate::gateway::{Gateway, GatewayError};
use crate::models::{CardFormData, Flashcard, GeneratedCard};
use crate::store::CardStore;
use crate::config::GENERATION_COUNTS;
use crate::tui::widgets::text_input::TextInput;
use ratatui::widgets::ListState;
use std::time::Instant;
use tracing::{error, info};

pub const EMPTY_TOPIC_MESSAGE: &str = "Please enter a topic or subject.";
pub const NO_CARDS_MESSAGE: &str = "Couldn't generate cards for that topic. Try being more specific.";
pub const GENERATION_FAILED_MESSAGE: &str = "Something went wrong. Please check your API key and connection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Study,
    Manage,
    Generate,
}

impl View {
    pub const ALL: [View; 3] = [View::Study, View::Manage, View::Generate];

    pub fn title(self) -> &'static str {
        match self {
            View::Study => "Study",
            View::Manage => "Manage",
            View::Generate => "AI Generate",
        }
    }

    pub fn index(self) -> usize {
        match self {
            View::Study => 0,
            View::Manage => 1,
            View::Generate => 2,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Question,
    Answer,
}

/// The card editor modal. Its buffers are filled from the target card when
/// it opens and then only follow keystrokes until submit.
#[derive(Debug, Clone)]
pub struct CardEditor {
    pub target_id: Option<String>, // None for new cards
    pub question: TextInput,
    pub answer: TextInput,
    pub current_field: EditorField,
    pub error: Option<String>,
}

impl CardEditor {
    pub fn create() -> Self {
        Self {
            target_id: None,
            question: TextInput::multi_line(),
            answer: TextInput::multi_line(),
            current_field: EditorField::Question,
            error: None,
        }
    }

    pub fn edit(card: &Flashcard) -> Self {
        Self {
            target_id: Some(card.id.clone()),
            question: TextInput::multi_line().with_text(&card.question),
            answer: TextInput::multi_line().with_text(&card.answer),
            current_field: EditorField::Question,
            error: None,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.target_id.is_some()
    }

    pub fn form_data(&self) -> CardFormData {
        CardFormData::new(self.question.text(), self.answer.text())
    }

    pub fn toggle_field(&mut self) {
        self.current_field = match self.current_field {
            EditorField::Question => EditorField::Answer,
            EditorField::Answer => EditorField::Question,
        };
    }

    pub fn active_input_mut(&mut self) -> &mut TextInput {
        match self.current_field {
            EditorField::Question => &mut self.question,
            EditorField::Answer => &mut self.answer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorField {
    Topic,
    Count,
}

/// Generation form. Lives only while the generation view is shown.
#[derive(Debug, Clone)]
pub struct GeneratorState {
    pub topic: TextInput,
    pub count: usize,
    pub current_field: GeneratorField,
    /// Gates every input of the form while the request is outstanding
    pub loading: bool,
    pub error: Option<String>,
}

impl GeneratorState {
    pub fn new(count: usize) -> Self {
        Self {
            topic: TextInput::new(),
            count,
            current_field: GeneratorField::Topic,
            loading: false,
            error: None,
        }
    }

    pub fn cycle_count(&mut self, forward: bool) {
        let len = GENERATION_COUNTS.len();
        let pos = GENERATION_COUNTS.iter().position(|c| *c == self.count).unwrap_or(0);
        let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
        self.count = GENERATION_COUNTS[next];
    }

    pub fn toggle_field(&mut self) {
        self.current_field = match self.current_field {
            GeneratorField::Topic => GeneratorField::Count,
            GeneratorField::Count => GeneratorField::Topic,
        };
    }
}

/// Flip state of the displayed card; any other card shows its question
#[derive(Debug, Clone, Default)]
pub struct FlipState {
    card_id: Option<String>,
    flipped: bool,
}

impl FlipState {
    pub fn is_flipped(&self, card_id: &str) -> bool {
        self.flipped && self.card_id.as_deref() == Some(card_id)
    }

    pub fn toggle(&mut self, card_id: &str) {
        let flipped = !self.is_flipped(card_id);
        self.card_id = Some(card_id.to_string());
        self.flipped = flipped;
    }

    pub fn reset(&mut self) {
        self.card_id = None;
        self.flipped = false;
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

pub struct App {
    pub config: Config,
    pub store: CardStore,
    pub gateway: Gateway,

    pub view: View,
    pub study_index: usize,
    pub manage_state: ListState,
    pub editor: Option<CardEditor>,
    pub generator: GeneratorState,
    pub flip: FlipState,
    pub delete_confirmation: Option<Flashcard>,
    pub delete_modal_selection: usize, // 0 = Delete, 1 = Cancel
    pub show_help: bool,
    pub status: StatusState,
}

impl App {
    pub fn new(config: Config, store: CardStore, gateway: Gateway) -> Self {
        let generator = GeneratorState::new(config.default_generation_count());
        let mut manage_state = ListState::default();
        if !store.is_empty() {
            manage_state.select(Some(0));
        }
        Self {
            config,
            store,
            gateway,
            view: View::Study,
            study_index: 0,
            manage_state,
            editor: None,
            generator,
            flip: FlipState::default(),
            delete_confirmation: None,
            delete_modal_selection: 0,
            show_help: false,
            status: StatusState::default(),
        }
    }

    /// Study index is kept across view switches
    pub fn switch_view(&mut self, view: View) {
        if self.view == view {
            return;
        }
        if self.view == View::Generate {
            self.generator = GeneratorState::new(self.config.default_generation_count());
        }
        self.flip.reset();
        self.view = view;
    }

    pub fn current_card(&self) -> Option<&Flashcard> {
        self.store.get(self.study_index)
    }

    pub fn next_card(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        self.show_card((self.study_index + 1) % len);
    }

    pub fn prev_card(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        self.show_card((self.study_index + len - 1) % len);
    }

    /// Move the study view to `index`; the card shown there starts question side up
    fn show_card(&mut self, index: usize) {
        self.study_index = index;
        self.flip.reset();
    }

    pub fn flip_current_card(&mut self) {
        if let Some(id) = self.current_card().map(|c| c.id.clone()) {
            self.flip.toggle(&id);
        }
    }

    pub fn is_current_card_flipped(&self) -> bool {
        self.current_card()
            .map(|c| self.flip.is_flipped(&c.id))
            .unwrap_or(false)
    }

    pub fn selected_card(&self) -> Option<&Flashcard> {
        self.manage_state.selected().and_then(|i| self.store.get(i))
    }

    pub fn move_selection_up(&mut self) {
        if self.store.is_empty() {
            return;
        }
        let index = self.manage_state.selected().unwrap_or(0);
        self.manage_state.select(Some(index.saturating_sub(1)));
    }

    pub fn move_selection_down(&mut self) {
        if self.store.is_empty() {
            return;
        }
        let last = self.store.len() - 1;
        let index = self.manage_state.selected().map(|i| (i + 1).min(last)).unwrap_or(0);
        self.manage_state.select(Some(index));
    }

    /// Card that edit/delete act on in the current view
    fn focused_card(&self) -> Option<&Flashcard> {
        match self.view {
            View::Study => self.current_card(),
            View::Manage => self.selected_card(),
            View::Generate => None,
        }
    }

    pub fn open_create_editor(&mut self) {
        self.editor = Some(CardEditor::create());
    }

    pub fn open_edit_editor(&mut self) {
        match self.focused_card() {
            Some(card) => self.editor = Some(CardEditor::edit(card)),
            None => self.set_status_message("No card selected".to_string()),
        }
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    /// Validate and save the editor: create mode adds, edit mode updates the
    /// target. Closes the editor unless validation fails.
    pub fn submit_editor(&mut self) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let data = editor.form_data();
        if let Err(message) = data.validate() {
            editor.error = Some(message);
            return;
        }

        let target_id = editor.target_id.clone();
        self.editor = None;

        let result = match target_id {
            Some(id) => self.store.edit(&id, data).map(|found| {
                if found { "Card updated" } else { "Card no longer exists" }
            }),
            None => self.store.add(data).map(|_| "Card saved"),
        };
        match result {
            Ok(message) => self.set_status_message(message.to_string()),
            Err(e) => {
                error!("failed to persist card: {}", e);
                self.set_status_message(format!("Failed to save cards: {}", e));
            }
        }
        self.sync_manage_selection();
    }

    pub fn request_delete(&mut self) {
        match self.focused_card().cloned() {
            Some(card) => {
                self.delete_confirmation = Some(card);
                self.delete_modal_selection = 0;
            }
            None => self.set_status_message("No card selected".to_string()),
        }
    }

    pub fn cancel_delete(&mut self) {
        self.delete_confirmation = None;
    }

    pub fn confirm_delete(&mut self) {
        if let Some(card) = self.delete_confirmation.take() {
            self.delete_card(&card.id);
        }
    }

    /// Remove a card and pull the study index back inside the collection
    pub fn delete_card(&mut self, id: &str) {
        match self.store.delete(id) {
            Ok(true) => self.set_status_message("Card deleted".to_string()),
            Ok(false) => {}
            Err(e) => {
                error!("failed to persist deletion: {}", e);
                self.set_status_message(format!("Failed to save cards: {}", e));
            }
        }

        let len = self.store.len();
        if self.study_index >= len && len > 0 {
            self.show_card(len - 1);
        }
        self.sync_manage_selection();
    }

    fn sync_manage_selection(&mut self) {
        let len = self.store.len();
        if len == 0 {
            self.manage_state.select(None);
        } else {
            let index = self.manage_state.selected().unwrap_or(0).min(len - 1);
            self.manage_state.select(Some(index));
        }
    }

    /// Validate the topic and enter the loading state. The request itself
    /// runs from the event loop once the loading frame is on screen.
    pub fn submit_generation(&mut self) {
        if self.generator.loading {
            return;
        }
        if self.generator.topic.is_blank() {
            self.generator.error = Some(EMPTY_TOPIC_MESSAGE.to_string());
            return;
        }
        self.generator.error = None;
        self.generator.loading = true;
    }

    /// Perform the outstanding generation request, if any
    pub fn run_pending_generation(&mut self) {
        if !self.generator.loading {
            return;
        }
        let topic = self.generator.topic.text();
        let count = self.generator.count;
        info!(topic = %topic, count, "generating cards");
        let result = self.gateway.generate(&topic, count);
        self.generator.loading = false;
        self.finish_generation(result);
    }

    fn finish_generation(&mut self, result: Result<Vec<GeneratedCard>, GatewayError>) {
        match result {
            Ok(cards) if !cards.is_empty() => self.add_generated_cards(cards),
            Ok(_) => {
                self.generator.error = Some(NO_CARDS_MESSAGE.to_string());
            }
            Err(e) => {
                error!("generation failed: {}", e);
                self.generator.error = Some(GENERATION_FAILED_MESSAGE.to_string());
            }
        }
    }

    /// Put generated cards in front and show the first of them
    pub fn add_generated_cards(&mut self, cards: Vec<GeneratedCard>) {
        match self.store.bulk_add(cards) {
            Ok(count) => self.set_status_message(format!("Generated {} cards", count)),
            Err(e) => {
                error!("failed to persist generated cards: {}", e);
                self.set_status_message(format!("Failed to save cards: {}", e));
            }
        }
        self.switch_view(View::Study);
        self.show_card(0);
        self.sync_manage_selection();
    }

    /// Text input that currently receives keystrokes
    pub fn active_input_mut(&mut self) -> Option<&mut TextInput> {
        if let Some(editor) = self.editor.as_mut() {
            return Some(editor.active_input_mut());
        }
        if self.view == View::Generate
            && !self.generator.loading
            && self.generator.current_field == GeneratorField::Topic
        {
            return Some(&mut self.generator.topic);
        }
        None
    }

    pub fn paste_from_clipboard(&mut self) {
        let text = match arboard::Clipboard::new().and_then(|mut c| c.get_text()) {
            Ok(text) => text,
            Err(e) => {
                self.set_status_message(format!("Failed to access clipboard: {}", e));
                return;
            }
        };
        if let Some(input) = self.active_input_mut() {
            input.insert_str(&text);
        }
    }

    pub fn copy_current_card(&mut self) {
        let Some(card) = self.current_card() else {
            return;
        };
        let text = format!("{}\n\n{}", card.question, card.answer);
        match arboard::Clipboard::new().and_then(|mut c| c.set_text(text)) {
            Ok(()) => self.set_status_message("Copied card to clipboard".to_string()),
            Err(e) => self.set_status_message(format!("Failed to copy to clipboard: {}", e)),
        }
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Check if status message should be auto-cleared (after 3 seconds)
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GenerationRequest, GenerationService};
    use crate::storage::MemoryRepository;
    use proptest::prelude::*;

    struct FixedReply(Result<&'static str, u16>);

    impl GenerationService for FixedReply {
        fn complete(&self, _request: &GenerationRequest) -> Result<String, GatewayError> {
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(code) => Err(GatewayError::HttpStatus {
                    status: reqwest::StatusCode::from_u16(code).unwrap(),
                    body: String::new(),
                }),
            }
        }
    }

    fn test_app(reply: Result<&'static str, u16>) -> (App, MemoryRepository) {
        let repo = MemoryRepository::new();
        let store = CardStore::open(Box::new(repo.clone())).unwrap();
        let app = App::new(Config::default(), store, Gateway::new(Box::new(FixedReply(reply))));
        (app, repo)
    }

    fn type_text(input: &mut TextInput, text: &str) {
        input.insert_str(text);
    }

    #[test]
    fn test_next_cycles_back_to_start() {
        let (mut app, _repo) = test_app(Ok("[]"));
        for _ in 0..app.store.len() {
            app.next_card();
        }
        assert_eq!(app.study_index, 0);
        app.prev_card();
        assert_eq!(app.study_index, 2);
    }

    #[test]
    fn test_navigation_on_empty_collection_is_noop() {
        let (mut app, _repo) = test_app(Ok("[]"));
        for id in ["1", "2", "3"] {
            app.delete_card(id);
        }
        app.next_card();
        app.prev_card();
        assert_eq!(app.study_index, 0);
        assert!(app.current_card().is_none());
    }

    #[test]
    fn test_delete_last_card_clamps_index() {
        let (mut app, repo) = test_app(Ok("[]"));
        app.study_index = 2;
        app.request_delete();
        assert_eq!(app.delete_confirmation.as_ref().map(|c| c.id.as_str()), Some("3"));
        app.confirm_delete();

        assert_eq!(app.store.len(), 2);
        assert_eq!(app.study_index, 1);
        assert_eq!(repo.stored_len(), Some(2));
    }

    #[test]
    fn test_cancel_delete_keeps_card() {
        let (mut app, _repo) = test_app(Ok("[]"));
        app.request_delete();
        app.cancel_delete();
        assert_eq!(app.store.len(), 3);
    }

    #[test]
    fn test_switching_views_keeps_study_index() {
        let (mut app, _repo) = test_app(Ok("[]"));
        app.next_card();
        app.switch_view(View::Manage);
        app.switch_view(View::Study);
        assert_eq!(app.study_index, 1);
    }

    #[test]
    fn test_flip_resets_for_another_card() {
        let (mut app, _repo) = test_app(Ok("[]"));
        app.flip_current_card();
        assert!(app.is_current_card_flipped());
        app.next_card();
        assert!(!app.is_current_card_flipped());
        app.prev_card();
        assert!(!app.is_current_card_flipped());
    }

    #[test]
    fn test_create_editor_adds_card_in_front() {
        let (mut app, repo) = test_app(Ok("[]"));
        app.open_create_editor();
        let editor = app.editor.as_mut().unwrap();
        type_text(&mut editor.question, "2 + 2?");
        editor.toggle_field();
        type_text(&mut editor.answer, "4");
        app.submit_editor();

        assert!(app.editor.is_none());
        assert_eq!(app.store.cards()[0].question, "2 + 2?");
        assert_eq!(repo.stored_len(), Some(4));
    }

    #[test]
    fn test_empty_editor_fields_block_submit() {
        let (mut app, repo) = test_app(Ok("[]"));
        app.open_create_editor();
        type_text(&mut app.editor.as_mut().unwrap().question, "Question only");
        app.submit_editor();

        let editor = app.editor.as_ref().unwrap();
        assert_eq!(editor.error.as_deref(), Some("Answer is required"));
        assert_eq!(app.store.len(), 3);
        assert!(repo.document().is_none());
    }

    #[test]
    fn test_edit_editor_prefills_and_updates_target() {
        let (mut app, _repo) = test_app(Ok("[]"));
        app.switch_view(View::Manage);
        app.move_selection_down();
        app.open_edit_editor();

        let editor = app.editor.as_mut().unwrap();
        assert!(editor.is_edit());
        assert_eq!(editor.question.text(), "What is React?");
        editor.question = TextInput::multi_line().with_text("What is Svelte?");
        app.submit_editor();

        let card = app.store.find("2").unwrap();
        assert_eq!(card.question, "What is Svelte?");
        assert_eq!(app.store.cards()[1].id, "2");
    }

    #[test]
    fn test_blank_topic_is_rejected_without_request() {
        let (mut app, _repo) = test_app(Ok("[{\"question\":\"Q\",\"answer\":\"A\"}]"));
        app.switch_view(View::Generate);
        app.submit_generation();
        assert!(!app.generator.loading);
        assert_eq!(app.generator.error.as_deref(), Some(EMPTY_TOPIC_MESSAGE));
        app.run_pending_generation();
        assert_eq!(app.store.len(), 3);
    }

    #[test]
    fn test_service_failure_shows_generic_message() {
        let (mut app, _repo) = test_app(Err(500));
        app.switch_view(View::Generate);
        type_text(&mut app.generator.topic, "Chemistry");
        app.submit_generation();
        assert!(app.generator.loading);
        assert!(app.active_input_mut().is_none());
        app.run_pending_generation();

        assert!(!app.generator.loading);
        assert_eq!(app.generator.error.as_deref(), Some(GENERATION_FAILED_MESSAGE));
        assert_eq!(app.view, View::Generate);
        assert_eq!(app.store.len(), 3);
    }

    #[test]
    fn test_leaving_generate_view_resets_form() {
        let (mut app, _repo) = test_app(Ok("[]"));
        app.switch_view(View::Generate);
        type_text(&mut app.generator.topic, "Rust");
        app.generator.cycle_count(true);
        app.switch_view(View::Study);
        assert!(app.generator.topic.is_blank());
        assert_eq!(app.generator.count, 5);
    }

    #[test]
    fn test_editing_a_vanished_card_reports_it() {
        let (mut app, _repo) = test_app(Ok("[]"));
        app.open_edit_editor();
        app.store.delete("1").unwrap();
        app.submit_editor();

        assert!(app.editor.is_none());
        assert_eq!(app.store.len(), 2);
        assert_eq!(app.status.message.as_deref(), Some("Card no longer exists"));
    }

    #[test]
    fn test_edit_reports_update() {
        let (mut app, _repo) = test_app(Ok("[]"));
        app.open_edit_editor();
        app.submit_editor();
        assert_eq!(app.status.message.as_deref(), Some("Card updated"));
    }

    /// App over a deck of `size` cards in a fresh in-memory repository
    fn app_with_cards(size: usize) -> App {
        let cards: Vec<Flashcard> = (0..size)
            .map(|i| Flashcard::new(format!("Q{}", i), format!("A{}", i)))
            .collect();
        let repo = MemoryRepository::with_cards(&cards).unwrap();
        let store = CardStore::open(Box::new(repo)).unwrap();
        App::new(Config::default(), store, Gateway::new(Box::new(FixedReply(Ok("[]")))))
    }

    proptest! {
        #[test]
        fn prop_next_cycles_through_whole_deck(size in 1usize..20, start in 0usize..20) {
            let mut app = app_with_cards(size);
            app.study_index = start % size;
            for _ in 0..size {
                app.next_card();
            }
            prop_assert_eq!(app.study_index, start % size);
        }

        #[test]
        fn prop_delete_keeps_study_index_in_bounds(
            size in 1usize..15,
            start in 0usize..15,
            picks in proptest::collection::vec(0usize..15, 1..15),
        ) {
            let mut app = app_with_cards(size);
            app.study_index = start % size;
            for pick in picks {
                if app.store.is_empty() {
                    break;
                }
                // Mostly delete the displayed card, sometimes another one
                let index = if pick % 3 == 0 { pick % app.store.len() } else { app.study_index };
                let id = app.store.cards()[index].id.clone();
                app.delete_card(&id);
                prop_assert!(app.store.is_empty() || app.study_index < app.store.len());
                prop_assert!(app.current_card().is_some() || app.store.is_empty());
            }
        }
    }

    #[test]
    fn test_cycle_count_wraps() {
        let mut generator = GeneratorState::new(10);
        generator.cycle_count(true);
        assert_eq!(generator.count, 3);
        generator.cycle_count(false);
        assert_eq!(generator.count, 10);
    }
}
