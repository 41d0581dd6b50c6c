use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::text::{BilingualText, Language, TextError};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("option index out of range (0-3): {0}")]
    InvalidOption(i64),

    #[error("category must not be empty")]
    EmptyCategory,

    #[error("invalid {field} text: {source}")]
    Text {
        field: &'static str,
        #[source]
        source: TextError,
    },
}

//
// ─── CATEGORY ─────────────────────────────────────────────────────────────────
//

/// Topical tag grouping questions (e.g. traffic signs, right of way).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyCategory` for blank tags.
    pub fn new(tag: impl Into<String>) -> Result<Self, QuestionError> {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(QuestionError::EmptyCategory);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Category {
    type Error = QuestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── OPTION INDEX ─────────────────────────────────────────────────────────────
//

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Index of one of the four answer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OptionIndex(u8);

impl OptionIndex {
    pub const ALL: [OptionIndex; OPTION_COUNT] =
        [OptionIndex(0), OptionIndex(1), OptionIndex(2), OptionIndex(3)];

    /// # Errors
    ///
    /// Returns `QuestionError::InvalidOption` if the index is not in 0-3.
    pub fn new(index: u8) -> Result<Self, QuestionError> {
        if usize::from(index) < OPTION_COUNT {
            Ok(Self(index))
        } else {
            Err(QuestionError::InvalidOption(i64::from(index)))
        }
    }

    /// Converts a stored integer, rejecting negatives and values above 3.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidOption` on out-of-range values.
    pub fn from_i64(value: i64) -> Result<Self, QuestionError> {
        u8::try_from(value)
            .map_err(|_| QuestionError::InvalidOption(value))
            .and_then(Self::new)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }

    /// Display label: A, B, C or D.
    #[must_use]
    pub fn letter(self) -> char {
        char::from(b'A' + self.0)
    }

    /// Parses a label (`A`-`D`, case-insensitive) or a 1-based digit (`1`-`4`).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let mut chars = label.trim().chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        let index = match c.to_ascii_uppercase() {
            'A'..='D' => (c.to_ascii_uppercase() as u8) - b'A',
            '1'..='4' => (c as u8) - b'1',
            _ => return None,
        };
        Self::new(index).ok()
    }
}

impl TryFrom<u8> for OptionIndex {
    type Error = QuestionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OptionIndex> for u8 {
    fn from(value: OptionIndex) -> Self {
        value.0
    }
}

//
// ─── QUESTION TYPES ───────────────────────────────────────────────────────────
//

/// Unvalidated bilingual text as authored in seed files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDraft {
    pub he: String,
    pub fa: String,
}

impl TextDraft {
    fn validate(self, field: &'static str) -> Result<BilingualText, QuestionError> {
        BilingualText::new(self.he, self.fa).map_err(|source| QuestionError::Text { field, source })
    }
}

/// Question as authored, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(default)]
    pub id: Option<u64>,
    pub category: String,
    pub prompt: TextDraft,
    pub options: [TextDraft; OPTION_COUNT],
    pub correct_option: u8,
    pub explanation: TextDraft,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl QuestionDraft {
    /// # Errors
    ///
    /// Returns `QuestionError` for a blank category, blank text on either side,
    /// or a correct option outside 0-3.
    pub fn validate(self) -> Result<ValidatedQuestion, QuestionError> {
        let category = Category::new(self.category)?;
        let prompt = self.prompt.validate("prompt")?;
        let [a, b, c, d] = self.options;
        let options = [
            a.validate("option A")?,
            b.validate("option B")?,
            c.validate("option C")?,
            d.validate("option D")?,
        ];
        let correct_option = OptionIndex::new(self.correct_option)?;
        let explanation = self.explanation.validate("explanation")?;

        Ok(ValidatedQuestion {
            category,
            prompt,
            options,
            correct_option,
            explanation,
            active: self.active,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub category: Category,
    pub prompt: BilingualText,
    pub options: [BilingualText; OPTION_COUNT],
    pub correct_option: OptionIndex,
    pub explanation: BilingualText,
    pub active: bool,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            category: self.category,
            prompt: self.prompt,
            options: self.options,
            correct_option: self.correct_option,
            explanation: self.explanation,
            active: self.active,
        }
    }
}

/// A multiple-choice question owned by the question store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub category: Category,
    pub prompt: BilingualText,
    pub options: [BilingualText; OPTION_COUNT],
    pub correct_option: OptionIndex,
    pub explanation: BilingualText,
    pub active: bool,
}

impl Question {
    #[must_use]
    pub fn is_correct(&self, selected: OptionIndex) -> bool {
        self.correct_option == selected
    }

    /// Resolves every text field in one language.
    #[must_use]
    pub fn localized(&self, language: Language) -> LocalizedQuestion<'_> {
        LocalizedQuestion {
            id: self.id,
            category: &self.category,
            prompt: self.prompt.get(language),
            options: [
                self.options[0].get(language),
                self.options[1].get(language),
                self.options[2].get(language),
                self.options[3].get(language),
            ],
            explanation: self.explanation.get(language),
        }
    }
}

/// A question rendered in a single language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizedQuestion<'a> {
    pub id: QuestionId,
    pub category: &'a Category,
    pub prompt: &'a str,
    pub options: [&'a str; OPTION_COUNT],
    pub explanation: &'a str,
}

impl<'a> LocalizedQuestion<'a> {
    /// Options paired with their A-D labels.
    pub fn labelled_options(&self) -> impl Iterator<Item = (OptionIndex, &'a str)> + '_ {
        OptionIndex::ALL.into_iter().zip(self.options)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> TextDraft {
        TextDraft {
            he: format!("{s} he"),
            fa: format!("{s} fa"),
        }
    }

    fn draft(correct: u8) -> QuestionDraft {
        QuestionDraft {
            id: None,
            category: "signs".into(),
            prompt: text("prompt"),
            options: [text("a"), text("b"), text("c"), text("d")],
            correct_option: correct,
            explanation: text("why"),
            active: true,
        }
    }

    #[test]
    fn valid_draft_validates_and_assigns_id() {
        let question = draft(2).validate().unwrap().assign_id(QuestionId::new(7));
        assert_eq!(question.id, QuestionId::new(7));
        assert_eq!(question.category.as_str(), "signs");
        assert!(question.is_correct(OptionIndex::new(2).unwrap()));
        assert!(!question.is_correct(OptionIndex::new(0).unwrap()));
    }

    #[test]
    fn correct_option_must_be_in_range() {
        let err = draft(4).validate().unwrap_err();
        assert_eq!(err, QuestionError::InvalidOption(4));
    }

    #[test]
    fn blank_option_text_names_the_field() {
        let mut d = draft(0);
        d.options[1].fa = " ".into();
        let err = d.validate().unwrap_err();
        assert!(matches!(err, QuestionError::Text { field: "option B", .. }));
    }

    #[test]
    fn blank_category_is_rejected() {
        let mut d = draft(0);
        d.category = "   ".into();
        assert_eq!(d.validate().unwrap_err(), QuestionError::EmptyCategory);
    }

    #[test]
    fn localized_view_uses_one_language() {
        let question = draft(1).validate().unwrap().assign_id(QuestionId::new(1));
        let view = question.localized(Language::Persian);
        assert_eq!(view.prompt, "prompt fa");
        assert_eq!(view.options, ["a fa", "b fa", "c fa", "d fa"]);
        assert_eq!(view.explanation, "why fa");
        let labels: Vec<char> = view.labelled_options().map(|(i, _)| i.letter()).collect();
        assert_eq!(labels, vec!['A', 'B', 'C', 'D']);
    }

    #[test]
    fn option_labels_parse() {
        assert_eq!(OptionIndex::from_label("b"), OptionIndex::new(1).ok());
        assert_eq!(OptionIndex::from_label("4"), OptionIndex::new(3).ok());
        assert_eq!(OptionIndex::from_label("E"), None);
        assert_eq!(OptionIndex::from_label("AB"), None);
        assert!(OptionIndex::from_i64(-1).is_err());
    }

    #[test]
    fn draft_deserializes_with_default_active() {
        let json = r#"{
            "category": "right-of-way",
            "prompt": {"he": "q", "fa": "q"},
            "options": [
                {"he": "a", "fa": "a"}, {"he": "b", "fa": "b"},
                {"he": "c", "fa": "c"}, {"he": "d", "fa": "d"}
            ],
            "correct_option": 3,
            "explanation": {"he": "e", "fa": "e"}
        }"#;
        let d: QuestionDraft = serde_json::from_str(json).unwrap();
        assert!(d.active);
        assert_eq!(d.id, None);
        let question = d.validate().unwrap();
        assert_eq!(question.correct_option, OptionIndex::new(3).unwrap());
    }

    #[test]
    fn stored_question_json_is_validated() {
        let question = draft(1).validate().unwrap().assign_id(QuestionId::new(3));
        let json = serde_json::to_value(&question).unwrap();
        let back: Question = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, question);

        let mut blank = json.clone();
        blank["prompt"]["fa"] = serde_json::Value::from("");
        assert!(serde_json::from_value::<Question>(blank).is_err());

        let mut out_of_range = json;
        out_of_range["correct_option"] = serde_json::Value::from(7);
        assert!(serde_json::from_value::<Question>(out_of_range).is_err());
    }
}
