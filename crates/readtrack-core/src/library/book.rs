use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LibraryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookStatus {
    #[default]
    WantToRead,
    Reading,
    Completed,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::WantToRead => "want-to-read",
            BookStatus::Reading => "reading",
            BookStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "want-to-read" | "to-read" | "wishlist" => Ok(BookStatus::WantToRead),
            "reading" | "in-progress" => Ok(BookStatus::Reading),
            "completed" | "finished" | "done" => Ok(BookStatus::Completed),
            other => Err(LibraryError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub status: BookStatus,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// 0.0 .. 100.0 through the book, when both page counts are known.
    pub fn progress_pct(&self) -> Option<f64> {
        let total = self.total_pages.filter(|t| *t > 0)?;
        let current = self.current_page.unwrap_or(0);
        Some((current as f64 / total as f64 * 100.0).min(100.0))
    }
}

/// Input for adding a book to the library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    pub current_page: Option<u32>,
    pub total_pages: Option<u32>,
}

impl NewBook {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), LibraryError> {
        if self.title.trim().is_empty() {
            return Err(LibraryError::EmptyTitle);
        }
        check_page(self.current_page, self.total_pages)
    }

    pub fn into_book(self, id: String, now: DateTime<Utc>) -> Result<Book, LibraryError> {
        self.validate()?;
        Ok(Book {
            id,
            title: self.title.trim().to_string(),
            author: self.author.filter(|a| !a.trim().is_empty()),
            status: BookStatus::WantToRead,
            current_page: self.current_page,
            total_pages: self.total_pages,
            added_at: now,
            updated_at: now,
        })
    }
}

/// A page must not exceed the total when both are known.
pub fn check_page(page: Option<u32>, total: Option<u32>) -> Result<(), LibraryError> {
    match (page, total) {
        (Some(page), Some(total)) if page > total => Err(LibraryError::InvalidPage { page, total }),
        _ => Ok(()),
    }
}
