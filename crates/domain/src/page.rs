use std::path::Path;

use crate::DomainError;

/// Extension of the layered working format every page is stored in.
pub const PAGE_EXTENSION: &str = "ora";

/// Base name of the page seeded into every new book.
pub const TEMPLATE_PAGE: &str = "Template";

/// Longest base name kept; leaves room for `.ora` under the 255 byte limit.
pub const MAX_PAGE_NAME_CHARS: usize = 251;

const ILLEGAL_CHARACTERS: &[char] = &[
    '\\', '/', ':', '*', '?', '"', '<', '>', '|', '^', '\'', '!', '$', '@', '&', '(', ')', '+',
    '~', ',', '=',
];

/// A page base name that is safe to use as a file name inside `pages/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageName {
    base: String,
    truncated: bool,
}

impl PageName {
    /// Normalizes user input into a page name.
    ///
    /// Leading `.` and `-` are stripped, reserved characters become `_`, and
    /// the result is cut to [`MAX_PAGE_NAME_CHARS`] characters. Truncation is
    /// not an error; it is reported through [`PageName::was_truncated`].
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        if input.trim().is_empty() {
            return Err(DomainError::EmptyName);
        }

        let stripped = input.trim_start_matches(['.', '-']);
        if stripped.trim().is_empty() {
            return Err(DomainError::InvalidName(input.to_string()));
        }

        let replaced: String = stripped
            .chars()
            .map(|c| {
                if ILLEGAL_CHARACTERS.contains(&c) || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect();

        let truncated = replaced.chars().count() > MAX_PAGE_NAME_CHARS;
        let base = if truncated {
            replaced.chars().take(MAX_PAGE_NAME_CHARS).collect()
        } else {
            replaced
        };

        Ok(Self { base, truncated })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    /// File name inside `pages/`, e.g. `page01.ora`.
    pub fn file_name(&self) -> String {
        page_file_name(&self.base)
    }
}

pub fn page_file_name(base: &str) -> String {
    format!("{base}.{PAGE_EXTENSION}")
}

/// Strips the extension from a stored page file name.
pub fn page_base_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}

/// Page names are compared without regard to case so a book stays valid when
/// copied to a case-insensitive filesystem.
pub fn same_page_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}
