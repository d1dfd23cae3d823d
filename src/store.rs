use tracing::debug;

use crate::models::{seed_cards, CardFormData, Flashcard, GeneratedCard};
use crate::storage::{CardRepository, StorageError};

/// Ordered card collection, most recent first.
///
/// Every mutation rewrites the whole collection through the repository
/// right after the in-memory change.
pub struct CardStore {
    cards: Vec<Flashcard>,
    repository: Box<dyn CardRepository>,
}

impl CardStore {
    /// Load the stored collection, or fall back to the seed cards
    pub fn open(repository: Box<dyn CardRepository>) -> Result<Self, StorageError> {
        let cards = match repository.load()? {
            Some(cards) => cards,
            None => {
                debug!("no stored collection, using seed cards");
                seed_cards()
            }
        };
        Ok(Self { cards, repository })
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Flashcard> {
        self.cards.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&Flashcard> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Prepend a new card. No validation happens here.
    pub fn add(&mut self, data: CardFormData) -> Result<Flashcard, StorageError> {
        let card = Flashcard::from_form(data);
        self.cards.insert(0, card.clone());
        debug!(id = %card.id, "card added");
        self.persist()?;
        Ok(card)
    }

    /// Replace question and answer of the matching card; false if none matched
    pub fn edit(&mut self, id: &str, data: CardFormData) -> Result<bool, StorageError> {
        let Some(card) = self.cards.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        card.question = data.question;
        card.answer = data.answer;
        debug!(id, "card edited");
        self.persist()?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        let before = self.cards.len();
        self.cards.retain(|c| c.id != id);
        if self.cards.len() == before {
            return Ok(false);
        }
        debug!(id, "card deleted");
        self.persist()?;
        Ok(true)
    }

    /// Prepend generated cards in their input order, returns how many were added
    pub fn bulk_add(&mut self, partials: Vec<GeneratedCard>) -> Result<usize, StorageError> {
        let mut cards: Vec<Flashcard> = partials.into_iter().map(Flashcard::from_generated).collect();
        let count = cards.len();
        cards.append(&mut self.cards);
        self.cards = cards;
        debug!(count, "generated cards added");
        self.persist()?;
        Ok(count)
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        self.repository.save(&self.cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRepository;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn open_store() -> (CardStore, MemoryRepository) {
        let repo = MemoryRepository::new();
        let store = CardStore::open(Box::new(repo.clone())).unwrap();
        (store, repo)
    }

    fn generated(q: &str, a: &str) -> GeneratedCard {
        GeneratedCard {
            question: Some(q.to_string()),
            answer: Some(a.to_string()),
        }
    }

    #[test]
    fn test_open_without_document_uses_seed_and_writes_nothing() {
        let (store, repo) = open_store();
        assert_eq!(store.len(), 3);
        assert!(repo.document().is_none());
    }

    #[test]
    fn test_open_with_document_uses_it() {
        let repo = MemoryRepository::with_cards(&seed_cards()[..1]).unwrap();
        let store = CardStore::open(Box::new(repo)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.cards()[0].id, "1");
    }

    #[test]
    fn test_add_prepends_and_persists() {
        let (mut store, repo) = open_store();
        let card = store.add(CardFormData::new("New?", "Yes")).unwrap();
        assert_eq!(store.cards()[0], card);
        assert_eq!(store.len(), 4);
        assert_eq!(repo.stored_len(), Some(4));
    }

    #[test]
    fn test_edit_keeps_id_and_created_at() {
        let (mut store, repo) = open_store();
        let original = store.cards()[1].clone();
        assert!(store.edit(&original.id, CardFormData::new("Q2", "A2")).unwrap());

        let edited = store.find(&original.id).unwrap();
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.created_at, original.created_at);
        assert_eq!(edited.question, "Q2");
        assert_eq!(edited.answer, "A2");
        assert_eq!(repo.load().unwrap().unwrap()[1].question, "Q2");
    }

    #[test]
    fn test_edit_unknown_id_is_noop() {
        let (mut store, repo) = open_store();
        assert!(!store.edit("missing", CardFormData::new("Q", "A")).unwrap());
        assert!(repo.document().is_none());
    }

    #[test]
    fn test_delete_removes_matching_card() {
        let (mut store, repo) = open_store();
        assert!(store.delete("2").unwrap());
        let ids: Vec<&str> = store.cards().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(repo.stored_len(), Some(2));
        assert!(!store.delete("2").unwrap());
    }

    #[test]
    fn test_bulk_add_prepends_in_input_order() {
        let (mut store, repo) = open_store();
        store.add(CardFormData::new("Manual", "Card")).unwrap();
        let added = store
            .bulk_add(vec![generated("G1", "A1"), generated("G2", "A2"), GeneratedCard::default()])
            .unwrap();

        assert_eq!(added, 3);
        let questions: Vec<&str> = store.cards().iter().take(4).map(|c| c.question.as_str()).collect();
        assert_eq!(questions, vec!["G1", "G2", "", "Manual"]);
        assert_eq!(repo.stored_len(), Some(7));
    }

    #[test]
    fn test_reload_reproduces_collection() {
        let (mut store, repo) = open_store();
        store.add(CardFormData::new("Q", "A")).unwrap();
        let reopened = CardStore::open(Box::new(repo)).unwrap();
        assert_eq!(reopened.cards(), store.cards());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add,
        Edit(usize),
        Delete(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Add),
            (0usize..16).prop_map(Op::Edit),
            (0usize..16).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn prop_ids_stay_unique(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let (mut store, _repo) = open_store();
            for op in ops {
                match op {
                    Op::Add => {
                        store.add(CardFormData::new("q", "a")).unwrap();
                    }
                    Op::Edit(i) => {
                        if let Some(id) = store.get(i % store.len().max(1)).map(|c| c.id.clone()) {
                            store.edit(&id, CardFormData::new("e", "e")).unwrap();
                        }
                    }
                    Op::Delete(i) => {
                        if let Some(id) = store.get(i % store.len().max(1)).map(|c| c.id.clone()) {
                            store.delete(&id).unwrap();
                        }
                    }
                }
                let ids: HashSet<&str> = store.cards().iter().map(|c| c.id.as_str()).collect();
                prop_assert_eq!(ids.len(), store.len());
            }
        }
    }
}
