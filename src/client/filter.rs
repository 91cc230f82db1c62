//! Pure filter/search evaluation over a held link list.

use std::collections::BTreeSet;

use crate::domain::links::Link;
use crate::domain::types::Category;

/// Case-insensitive substring match over title, URL, description and tags.
/// A blank query matches every link.
pub fn matches_query(link: &Link, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let contains = |field: &str| field.to_lowercase().contains(&needle);

    link.title.as_deref().is_some_and(contains)
        || contains(&link.url)
        || link.description.as_deref().is_some_and(contains)
        || link.tags.iter().any(|tag| contains(tag))
}

/// Links of `category` matching `query` and carrying every selected tag,
/// newest first. Links created at the same instant keep their input order.
pub fn filter_links(
    links: &[Link],
    category: Category,
    query: &str,
    selected_tags: &[String],
) -> Vec<Link> {
    let mut visible: Vec<Link> = links
        .iter()
        .filter(|link| category.admits(link.is_favorite, link.is_deleted))
        .filter(|link| matches_query(link, query))
        .filter(|link| selected_tags.iter().all(|tag| link.has_tag(tag)))
        .cloned()
        .collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    visible
}

/// Every distinct tag across `links`, sorted.
pub fn all_tags(links: &[Link]) -> Vec<String> {
    links
        .iter()
        .flat_map(|link| link.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The user's current view: category tab, search input and tag chips.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    search_query: String,
    search_mode: bool,
    selected_tags: Vec<String>,
    category: Category,
}

impl FilterState {
    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn is_search_mode(&self) -> bool {
        self.search_mode
    }

    pub fn selected_tags(&self) -> &[String] {
        &self.selected_tags
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// Leaving search mode clears the query.
    pub fn set_search_mode(&mut self, active: bool) {
        self.search_mode = active;
        if !active {
            self.search_query.clear();
        }
    }

    /// Select or deselect `tag`, compared in its normalized form.
    pub fn toggle_tag(&mut self, tag: &str) {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return;
        }
        if let Some(index) = self.selected_tags.iter().position(|selected| *selected == tag) {
            self.selected_tags.remove(index);
        } else {
            self.selected_tags.push(tag);
        }
    }

    pub fn clear_tags(&mut self) {
        self.selected_tags.clear();
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    /// Back to the inbox with no query and no tags. Search mode is kept.
    pub fn reset(&mut self) {
        self.search_query.clear();
        self.selected_tags.clear();
        self.category = Category::Inbox;
    }

    pub fn apply(&self, links: &[Link]) -> Vec<Link> {
        filter_links(links, self.category, &self.search_query, &self.selected_tags)
    }
}
