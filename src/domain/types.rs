//! Shared domain enumerations for link listings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category a link is listed under, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Every link that is not soft-deleted.
    #[default]
    Inbox,
    /// Favorite links that are not soft-deleted.
    Favorites,
    /// Soft-deleted links.
    Trash,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Inbox => "inbox",
            Category::Favorites => "favorites",
            Category::Trash => "trash",
        }
    }

    /// Whether a link with the given flags belongs to this category.
    pub fn admits(self, is_favorite: bool, is_deleted: bool) -> bool {
        match self {
            Category::Inbox => !is_deleted,
            Category::Favorites => is_favorite && !is_deleted,
            Category::Trash => is_deleted,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inbox" => Ok(Category::Inbox),
            "favorites" => Ok(Category::Favorites),
            "trash" => Ok(Category::Trash),
            _ => Err(()),
        }
    }
}

/// Which links of a workspace a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    All,
    Category(Category),
}

impl LinkScope {
    pub fn admits(self, is_favorite: bool, is_deleted: bool) -> bool {
        match self {
            LinkScope::All => true,
            LinkScope::Category(category) => category.admits(is_favorite, is_deleted),
        }
    }
}

impl fmt::Display for LinkScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkScope::All => f.write_str("all"),
            LinkScope::Category(category) => write!(f, "cat:{category}"),
        }
    }
}
