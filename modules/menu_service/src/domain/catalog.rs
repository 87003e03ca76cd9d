//! Menu board grouping for display

use crate::contract::MenuItem;

/// Items of one category, in list order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub category: String,
    pub items: Vec<MenuItem>,
}

/// Items grouped by category, categories in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuBoard {
    pub groups: Vec<CategoryGroup>,
}

impl MenuBoard {
    /// Public board: available items only
    pub fn available(items: &[MenuItem]) -> Self {
        Self::group(items.iter().filter(|item| item.is_available))
    }

    /// Admin board: every item
    pub fn all(items: &[MenuItem]) -> Self {
        Self::group(items.iter())
    }

    fn group<'a>(items: impl Iterator<Item = &'a MenuItem>) -> Self {
        let mut groups: Vec<CategoryGroup> = Vec::new();
        for item in items {
            match groups.iter_mut().find(|g| g.category == item.category) {
                Some(group) => group.items.push(item.clone()),
                None => groups.push(CategoryGroup {
                    category: item.category.clone(),
                    items: vec![item.clone()],
                }),
            }
        }
        Self { groups }
    }

    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
