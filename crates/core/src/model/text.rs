use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextError {
    #[error("{language} text must not be empty")]
    Empty { language: Language },
    #[error("unknown language code: {0}")]
    UnknownLanguage(String),
}

/// Languages every piece of learner-facing text is authored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "he")]
    Hebrew,
    #[serde(rename = "fa")]
    Persian,
}

impl Language {
    /// Two-letter code used by storage columns (`question_he`, `question_fa`).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::Hebrew => "he",
            Language::Persian => "fa",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "he" | "hebrew" => Ok(Language::Hebrew),
            "fa" | "persian" | "farsi" => Ok(Language::Persian),
            other => Err(TextError::UnknownLanguage(other.to_owned())),
        }
    }
}

/// Text that exists in both supported languages.
///
/// Both sides are validated non-blank at construction, so lookups never fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBilingualText")]
pub struct BilingualText {
    he: String,
    fa: String,
}

#[derive(Deserialize)]
struct RawBilingualText {
    he: String,
    fa: String,
}

impl TryFrom<RawBilingualText> for BilingualText {
    type Error = TextError;

    fn try_from(raw: RawBilingualText) -> Result<Self, Self::Error> {
        Self::new(raw.he, raw.fa)
    }
}

impl BilingualText {
    /// # Errors
    ///
    /// Returns `TextError::Empty` naming the first blank side.
    pub fn new(he: impl Into<String>, fa: impl Into<String>) -> Result<Self, TextError> {
        let he = he.into();
        let fa = fa.into();
        if he.trim().is_empty() {
            return Err(TextError::Empty {
                language: Language::Hebrew,
            });
        }
        if fa.trim().is_empty() {
            return Err(TextError::Empty {
                language: Language::Persian,
            });
        }
        Ok(Self { he, fa })
    }

    #[must_use]
    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Hebrew => &self.he,
            Language::Persian => &self.fa,
        }
    }

    #[must_use]
    pub fn hebrew(&self) -> &str {
        &self.he
    }

    #[must_use]
    pub fn persian(&self) -> &str {
        &self.fa
    }
}
