//! Filename classification.
//!
//! A batch uses exactly one strategy: extension lookup through a
//! [`CategoryTable`], or case-insensitive keyword matching against the whole
//! file name.

use crate::file_category::{Category, CategoryTable};
use crate::file_organizer::{OrganizeError, OrganizeResult};

/// A single keyword as typed plus its lower-cased form used for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Keyword {
    original: String,
    lowered: String,
}

/// An ordered, non-empty list of keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<Keyword>,
}

impl KeywordSet {
    /// Parses a comma separated keyword string.
    ///
    /// Pieces are trimmed, empty pieces dropped and case-insensitive
    /// duplicates keep only their first occurrence.
    ///
    /// # Errors
    ///
    /// `OrganizeError::NoKeywords` when nothing is left, and
    /// `OrganizeError::InvalidKeyword` for keywords that cannot name a folder.
    ///
    /// # Examples
    ///
    /// ```
    /// use downsort::classifier::KeywordSet;
    ///
    /// let keywords = KeywordSet::parse(" invoice, ,Memo ,INVOICE").unwrap();
    /// assert_eq!(keywords.as_strings(), vec!["invoice", "Memo"]);
    /// assert!(KeywordSet::parse(" , ").is_err());
    /// ```
    pub fn parse(raw: &str) -> OrganizeResult<Self> {
        let mut keywords: Vec<Keyword> = Vec::new();

        for piece in raw.split(',') {
            let original = piece.trim();
            if original.is_empty() {
                continue;
            }
            validate_keyword(original)?;

            let lowered = original.to_lowercase();
            if keywords.iter().any(|k| k.lowered == lowered) {
                continue;
            }
            keywords.push(Keyword {
                original: original.to_string(),
                lowered,
            });
        }

        if keywords.is_empty() {
            return Err(OrganizeError::NoKeywords);
        }
        Ok(Self { keywords })
    }

    /// The keywords in input order, as typed.
    pub fn as_strings(&self) -> Vec<&str> {
        self.keywords.iter().map(|k| k.original.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Returns the keywords contained in `file_name`, in input order.
    pub fn matches(&self, file_name: &str) -> Vec<&str> {
        let name = file_name.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| name.contains(&k.lowered))
            .map(|k| k.original.as_str())
            .collect()
    }
}

/// Rejects keywords that would escape or collapse the per-keyword folders.
fn validate_keyword(keyword: &str) -> OrganizeResult<()> {
    let reason = if keyword.contains(['/', '\\']) {
        "keywords cannot contain path separators"
    } else if keyword == "." || keyword == ".." {
        "keywords cannot be '.' or '..'"
    } else {
        return Ok(());
    };

    Err(OrganizeError::InvalidKeyword {
        keyword: keyword.to_string(),
        reason: reason.to_string(),
    })
}

/// Keywords that matched a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    matched: Vec<String>,
    pub separate_folders: bool,
}

impl KeywordMatch {
    /// Returns `None` when nothing matched.
    fn new(matched: Vec<&str>, separate_folders: bool) -> Option<Self> {
        if matched.is_empty() {
            return None;
        }
        Some(Self {
            matched: matched.into_iter().map(str::to_string).collect(),
            separate_folders,
        })
    }

    /// The first matching keyword in input order.
    pub fn primary(&self) -> &str {
        // never empty, see `new`
        &self.matched[0]
    }

    pub fn matched(&self) -> &[String] {
        &self.matched
    }
}

/// Where a file should go, decided from its name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Category(Category),
    Keywords(KeywordMatch),
    /// Keyword mode only: the file stays where it is.
    NoMatch,
}

/// The strategy selected for one batch.
#[derive(Debug, Clone, Copy)]
pub enum Classifier<'a> {
    Extension(&'a CategoryTable),
    Keywords {
        keywords: &'a KeywordSet,
        separate_folders: bool,
    },
}

impl Classifier<'_> {
    /// Classifies a single file name.
    ///
    /// ```
    /// use downsort::classifier::{Classification, Classifier, KeywordSet};
    /// use downsort::file_category::{Category, CategoryTable};
    ///
    /// let by_extension = Classifier::Extension(CategoryTable::standard());
    /// assert_eq!(
    ///     by_extension.classify("photo.png"),
    ///     Classification::Category(Category::Images)
    /// );
    ///
    /// let keywords = KeywordSet::parse("invoice").unwrap();
    /// let by_keyword = Classifier::Keywords { keywords: &keywords, separate_folders: false };
    /// assert_eq!(by_keyword.classify("memo.txt"), Classification::NoMatch);
    /// ```
    pub fn classify(&self, file_name: &str) -> Classification {
        match self {
            Classifier::Extension(table) => {
                Classification::Category(table.category_for_file_name(file_name))
            }
            Classifier::Keywords {
                keywords,
                separate_folders,
            } => KeywordMatch::new(keywords.matches(file_name), *separate_folders)
                .map(Classification::Keywords)
                .unwrap_or(Classification::NoMatch),
        }
    }

    /// Short label of the strategy, used in reports.
    pub fn mode_label(&self) -> &'static str {
        match self {
            Classifier::Extension(_) => "category",
            Classifier::Keywords { .. } => "keywords",
        }
    }
}
