//! Topics: documentation comments bound to a location and a symbol.

use serde::{Deserialize, Serialize};

use crate::{AccessLevel, DocketError, NumberSet, Symbol};

/// Result of [`Topic::database_compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseCompareResult {
    Equal,
    NotEqual,
    /// Same topic, but the stored row needs new line numbers and/or body.
    EqualExceptLineNumbersAndBody,
}

/// Everything known about one documentation topic.
///
/// IDs of zero mean "not set". A topic fresh from a parser has no
/// `topic_id` or `ending_symbol_id`; both are assigned when it is added to
/// the code database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topic {
    pub topic_id: u32,
    pub file_id: u32,
    pub language_id: u32,
    comment_line_number: u32,
    code_line_number: u32,
    pub title: Option<String>,
    /// Comment body in markup form.
    pub body: Option<String>,
    pub symbol: Symbol,
    pub ending_symbol_id: u32,
    pub topic_type_id: u32,
    pub access_level: AccessLevel,
    tags: NumberSet,

    // Parse-time only. Not stored and not compared.
    #[serde(skip)]
    undecorated_title: Option<String>,
    #[serde(skip)]
    pub uses_plural_keyword: bool,
}

impl Topic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare against another topic for reconciliation purposes.
    ///
    /// `topic_id` and `ending_symbol_id` are ignored since one side usually
    /// comes fresh from a parse. Cheap integer fields are checked first, then
    /// strings, then tags; line numbers and body only decide between `Equal`
    /// and `EqualExceptLineNumbersAndBody`.
    pub fn database_compare(&self, other: &Topic) -> DatabaseCompareResult {
        if self.topic_type_id != other.topic_type_id
            || self.access_level != other.access_level
            || self.title != other.title
            || self.symbol != other.symbol
            || self.file_id != other.file_id
            || self.language_id != other.language_id
        {
            return DatabaseCompareResult::NotEqual;
        }

        if self.tags != other.tags {
            return DatabaseCompareResult::NotEqual;
        }

        // Through the accessors so unset line numbers substitute for each other.
        if self.code_line_number() != other.code_line_number()
            || self.comment_line_number() != other.comment_line_number()
            || self.body != other.body
        {
            return DatabaseCompareResult::EqualExceptLineNumbersAndBody;
        }

        DatabaseCompareResult::Equal
    }

    /// Line the comment starts on, falling back to the code line if unset.
    /// Zero if neither is set.
    pub fn comment_line_number(&self) -> u32 {
        if self.comment_line_number == 0 {
            self.code_line_number
        } else {
            self.comment_line_number
        }
    }

    pub fn set_comment_line_number(&mut self, line: u32) {
        self.comment_line_number = line;
    }

    /// Line the code element starts on, falling back to the comment line if
    /// unset. Zero if neither is set.
    pub fn code_line_number(&self) -> u32 {
        if self.code_line_number == 0 {
            self.comment_line_number
        } else {
            self.code_line_number
        }
    }

    pub fn set_code_line_number(&mut self, line: u32) {
        self.code_line_number = line;
    }

    pub fn add_tag_id(&mut self, tag_id: u32) {
        self.tags.add(tag_id);
    }

    pub fn has_tag_id(&self, tag_id: u32) -> bool {
        self.tags.contains(tag_id)
    }

    pub fn tags(&self) -> &NumberSet {
        &self.tags
    }

    /// Stored form of the tag set, or `None` when there are no tags.
    pub fn tag_string(&self) -> Option<String> {
        if self.tags.is_empty() {
            None
        } else {
            Some(self.tags.to_string())
        }
    }

    /// Replace the tag set from its stored form. `None`, `""` and `{}` all
    /// clear it.
    pub fn set_tag_string(&mut self, tags: Option<&str>) -> Result<(), DocketError> {
        self.tags = match tags {
            Some(s) if !s.trim().is_empty() => s.parse()?,
            _ => NumberSet::new(),
        };
        Ok(())
    }

    /// The title with decorations that aren't part of the symbol removed,
    /// such as trailing parentheses. Returns [`Topic::title`] when unset.
    pub fn undecorated_title(&self) -> Option<&str> {
        self.undecorated_title.as_deref().or(self.title.as_deref())
    }

    /// Setting this to `None` or to the title itself clears it.
    pub fn set_undecorated_title(&mut self, undecorated: Option<String>) {
        self.undecorated_title = match undecorated {
            Some(u) if Some(&u) != self.title.as_ref() => Some(u),
            _ => None,
        };
    }
}
