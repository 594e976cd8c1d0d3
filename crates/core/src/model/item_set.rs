use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::model::ids::ItemId;
use crate::model::item::Item;
use crate::model::kind::{Difficulty, SessionKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemSetError {
    #[error("item set cannot be empty")]
    Empty,

    #[error("duplicate item id {0}")]
    DuplicateId(ItemId),

    #[error("item {item_id} is not a {expected} item")]
    KindMismatch {
        item_id: ItemId,
        expected: SessionKind,
    },
}

/// Ordered, immutable collection of items making up one session.
///
/// Cloning is cheap: the items are shared, which lets a replay reuse the exact
/// presentation order of a previous attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSet {
    kind: SessionKind,
    items: Arc<[Item]>,
}

impl ItemSet {
    /// Build an item set for the given kind.
    ///
    /// # Errors
    ///
    /// Returns `ItemSetError` if the list is empty, contains the same id twice,
    /// or mixes in an item of another kind.
    pub fn new(kind: SessionKind, items: Vec<Item>) -> Result<Self, ItemSetError> {
        if items.is_empty() {
            return Err(ItemSetError::Empty);
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.kind() != kind {
                return Err(ItemSetError::KindMismatch {
                    item_id: item.id(),
                    expected: kind,
                });
            }
            if !seen.insert(item.id()) {
                return Err(ItemSetError::DuplicateId(item.id()));
            }
        }

        Ok(Self {
            kind,
            items: items.into(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a constructed set; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    #[must_use]
    pub fn find(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == id)
    }
}

/// Filter sent to an item bank.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemQuery {
    pub query: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub company: Option<String>,
    pub limit: u32,
}

impl ItemQuery {
    #[must_use]
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Whether an item satisfies every constraint of this query (ignores `limit`).
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(q) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = q.to_lowercase();
            if !item.prompt().to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref() {
            if !item.category().eq_ignore_ascii_case(category.trim()) {
                return false;
            }
        }
        if let Some(difficulty) = self.difficulty {
            if item.difficulty() != difficulty {
                return false;
            }
        }
        if let Some(company) = self.company.as_deref() {
            match item.company() {
                Some(c) if c.eq_ignore_ascii_case(company.trim()) => {}
                _ => return false,
            }
        }
        true
    }
}
