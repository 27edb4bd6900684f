//! Visible/hidden item pool.
//!
//! Each category shows a capped number of items; the rest wait in a FIFO
//! reserve. Rejecting a visible item promotes the head of the reserve.

use crate::proposal::{ItemId, ProposalItem, ProposalSet};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from pool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("Item {id} is not visible in {category}")]
    NotVisible { category: Category, id: ItemId },
}

/// Proposal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Full games that fit the constraints.
    Achievable,
    /// Demos with a projected full-game plan.
    Demo,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Achievable, Category::Demo];

    /// How many items of this category are shown at once.
    pub fn visible_cap(self) -> usize {
        match self {
            Category::Achievable => 3,
            Category::Demo => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Achievable => f.write_str("achievable"),
            Category::Demo => f.write_str("demo"),
        }
    }
}

/// One category's visible list and reserve.
#[derive(Debug, Clone, Default, PartialEq)]
struct CategoryPool {
    visible: Vec<ProposalItem>,
    hidden: VecDeque<ProposalItem>,
}

impl CategoryPool {
    fn populate(category: Category, items: &[ProposalItem]) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(items.len());
        for item in items {
            if seen.insert(item.name.trim().to_lowercase()) {
                unique.push(item.clone());
            } else {
                warn!(%category, name = %item.name, "dropping duplicate proposal name");
            }
        }

        let cap = category.visible_cap().min(unique.len());
        let hidden: VecDeque<ProposalItem> = unique.split_off(cap).into();
        Self {
            visible: unique,
            hidden,
        }
    }
}

/// Pool of proposal items across both categories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPool {
    achievable: CategoryPool,
    demo: CategoryPool,
}

impl ItemPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn category(&self, category: Category) -> &CategoryPool {
        match category {
            Category::Achievable => &self.achievable,
            Category::Demo => &self.demo,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut CategoryPool {
        match category {
            Category::Achievable => &mut self.achievable,
            Category::Demo => &mut self.demo,
        }
    }

    /// Replace the pool contents with a fresh proposal set.
    pub fn populate(&mut self, set: &ProposalSet) {
        self.achievable = CategoryPool::populate(Category::Achievable, &set.achievable);
        self.demo = CategoryPool::populate(Category::Demo, &set.demo);
        debug!(
            achievable_visible = self.achievable.visible.len(),
            achievable_hidden = self.achievable.hidden.len(),
            demo_visible = self.demo.visible.len(),
            demo_hidden = self.demo.hidden.len(),
            "pool populated"
        );
    }

    /// Remove a visible item and promote the next reserve item, if any.
    /// Returns the id of the promoted item.
    pub fn reject(&mut self, category: Category, id: ItemId) -> Result<Option<ItemId>, PoolError> {
        let pool = self.category_mut(category);
        let index = pool
            .visible
            .iter()
            .position(|item| item.id == id)
            .ok_or(PoolError::NotVisible { category, id })?;

        let rejected = pool.visible.remove(index);
        let promoted = pool.hidden.pop_front();
        let promoted_id = promoted.as_ref().map(|item| item.id);
        if let Some(item) = promoted {
            pool.visible.push(item);
        }

        debug!(
            %category,
            rejected = %rejected.name,
            promoted = ?promoted_id,
            "item rejected"
        );
        Ok(promoted_id)
    }

    pub fn visible(&self, category: Category) -> &[ProposalItem] {
        &self.category(category).visible
    }

    pub fn hidden(&self, category: Category) -> impl Iterator<Item = &ProposalItem> {
        self.category(category).hidden.iter()
    }

    pub fn hidden_len(&self, category: Category) -> usize {
        self.category(category).hidden.len()
    }

    pub fn is_visible(&self, category: Category, id: ItemId) -> bool {
        self.visible(category).iter().any(|item| item.id == id)
    }

    /// Find an item anywhere in the pool.
    pub fn find(&self, id: ItemId) -> Option<&ProposalItem> {
        Category::ALL.iter().find_map(|&category| {
            let pool = self.category(category);
            pool.visible
                .iter()
                .chain(pool.hidden.iter())
                .find(|item| item.id == id)
        })
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|&category| {
            let pool = self.category(category);
            pool.visible.is_empty() && pool.hidden.is_empty()
        })
    }
}
