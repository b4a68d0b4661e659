use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an intake item.
///
/// Only `New -> Owned` is produced today. The other named states are kept
/// for classification work, and anything unrecognized is carried verbatim in
/// `Other` so stored values always round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntakeStatus {
    New,
    Matched,
    NeedsReview,
    Owned,
    Archived,
    Other(String),
}

impl IntakeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Matched => "matched",
            Self::NeedsReview => "needs_review",
            Self::Owned => "owned",
            Self::Archived => "archived",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for IntakeStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "new" => Self::New,
            "matched" => Self::Matched,
            "needs_review" => Self::NeedsReview,
            "owned" => Self::Owned,
            "archived" => Self::Archived,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for IntakeStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<IntakeStatus> for String {
    fn from(status: IntakeStatus) -> Self {
        match status {
            IntakeStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for IntakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical or digital form of an owned book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnedFormat {
    #[default]
    Hardcover,
    Paperback,
    Ebook,
    Audiobook,
    Other,
}

impl OwnedFormat {
    pub const ALL: [OwnedFormat; 5] = [
        Self::Hardcover,
        Self::Paperback,
        Self::Ebook,
        Self::Audiobook,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hardcover => "hardcover",
            Self::Paperback => "paperback",
            Self::Ebook => "ebook",
            Self::Audiobook => "audiobook",
            Self::Other => "other",
        }
    }

    /// Lenient parse used for user input: case and surrounding whitespace are
    /// ignored, and anything outside the vocabulary becomes `Other`.
    pub fn normalize(raw: &str) -> Self {
        let wanted = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .unwrap_or(Self::Other)
    }
}

impl fmt::Display for OwnedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
