//! Token-level cursor.

use std::cmp::Ordering;
use std::fmt;

use regex::{Match, Regex};

use crate::tokenizer::text_eq;
use crate::{TokenType, Tokenizer, TokenizerError};

/// A copyable cursor on one token of a [`Tokenizer`].
///
/// Moving past either end never fails. The cursor remembers how far out of
/// bounds it went, so an equal and opposite move lands exactly where it
/// started. Reads while out of bounds return empty values.
#[derive(Clone, Copy)]
pub struct TokenIterator<'t> {
    tokenizer: &'t Tokenizer,
    token_index: isize,
    raw_text_index: usize,
    line_number: usize,
}

impl<'t> TokenIterator<'t> {
    pub(crate) fn new(
        tokenizer: &'t Tokenizer,
        token_index: isize,
        raw_text_index: usize,
        line_number: usize,
    ) -> Self {
        Self {
            tokenizer,
            token_index,
            raw_text_index,
            line_number,
        }
    }

    // ── Movement ────────────────────────────────────────────────────────

    /// Move to the next token. Returns whether the cursor is still in bounds.
    pub fn next(&mut self) -> bool {
        self.next_by(1)
    }

    /// Move forward `count` tokens. Returns whether the cursor is in bounds.
    pub fn next_by(&mut self, count: usize) -> bool {
        let from = self.token_index;
        let to = from.saturating_add_unsigned(count);

        for index in from.max(0)..to.min(self.token_count()) {
            let token = self.tokenizer.token(index as usize);
            self.raw_text_index += token.length as usize;
            if token.token_type == TokenType::LineBreak {
                self.line_number += 1;
            }
        }

        self.token_index = to;
        self.is_in_bounds()
    }

    /// Move to the previous token. Returns whether the cursor is still in
    /// bounds.
    pub fn previous(&mut self) -> bool {
        self.previous_by(1)
    }

    /// Move back `count` tokens. Returns whether the cursor is in bounds.
    pub fn previous_by(&mut self, count: usize) -> bool {
        let from = self.token_index;
        let to = from.saturating_sub_unsigned(count);

        for index in (to.max(0)..from.min(self.token_count())).rev() {
            let token = self.tokenizer.token(index as usize);
            self.raw_text_index -= token.length as usize;
            if token.token_type == TokenType::LineBreak {
                self.line_number -= 1;
            }
        }

        self.token_index = to;
        self.is_in_bounds()
    }

    /// Move forward over exactly `characters` bytes of raw text.
    ///
    /// Fails without moving if that doesn't end on a token boundary.
    pub fn next_by_characters(&mut self, characters: usize) -> Result<bool, TokenizerError> {
        let count = self
            .tokens_in_characters(characters)
            .ok_or(TokenizerError::NotOnTokenBoundary { characters })?;
        Ok(self.next_by(count))
    }

    /// How many tokens starting here cover exactly `characters` bytes, or
    /// `None` if the span doesn't end on a token boundary.
    pub fn tokens_in_characters(&self, characters: usize) -> Option<usize> {
        if characters == 0 {
            return Some(0);
        }
        if !self.is_in_bounds() {
            return None;
        }

        let mut covered = 0;
        let mut count = 0;
        for index in self.token_index as usize..self.tokenizer.token_count() {
            covered += self.tokenizer.token(index).length as usize;
            count += 1;
            match covered.cmp(&characters) {
                Ordering::Less => continue,
                Ordering::Equal => return Some(count),
                Ordering::Greater => return None,
            }
        }
        None
    }

    // ── Reading ─────────────────────────────────────────────────────────

    pub fn is_in_bounds(&self) -> bool {
        self.token_index >= 0 && self.token_index < self.token_count()
    }

    /// The token's current type, or [`TokenType::Null`] out of bounds.
    pub fn token_type(&self) -> TokenType {
        if self.is_in_bounds() {
            self.tokenizer.token(self.token_index as usize).token_type
        } else {
            TokenType::Null
        }
    }

    /// The token's type if it is fundamental, otherwise the fundamental type
    /// of its first character. [`TokenType::Null`] out of bounds.
    pub fn fundamental_type(&self) -> TokenType {
        match self.token_type() {
            token_type if token_type.is_fundamental() => token_type,
            _ => self
                .character()
                .map_or(TokenType::Null, Tokenizer::fundamental_type_of),
        }
    }

    /// The token's text, or `""` out of bounds.
    pub fn text(&self) -> &'t str {
        let length = self.raw_text_length();
        &self.tokenizer.raw_text()[self.raw_text_index..self.raw_text_index + length]
    }

    /// First character of the token.
    pub fn character(&self) -> Option<char> {
        self.text().chars().next()
    }

    /// Length of the token in bytes, or zero out of bounds.
    pub fn raw_text_length(&self) -> usize {
        if self.is_in_bounds() {
            self.tokenizer.token(self.token_index as usize).length as usize
        } else {
            0
        }
    }

    /// Byte offset of the token in the raw text. Clamped to either end when
    /// out of bounds.
    pub fn raw_text_index(&self) -> usize {
        self.raw_text_index
    }

    pub fn token_index(&self) -> isize {
        self.token_index
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn tokenizer(&self) -> &'t Tokenizer {
        self.tokenizer
    }

    pub fn append_token_to(&self, output: &mut String) {
        output.push_str(self.text());
    }

    // ── Matching ────────────────────────────────────────────────────────

    /// Whether this single token is exactly `text`.
    pub fn matches_token(&self, text: &str, ignore_case: bool) -> bool {
        self.is_in_bounds() && text_eq(self.text(), text, ignore_case)
    }

    /// Whether `text` starts at this token and ends on a token boundary,
    /// possibly spanning several tokens.
    pub fn matches_across_tokens(&self, text: &str, ignore_case: bool) -> bool {
        if text.is_empty() || !self.is_in_bounds() {
            return false;
        }

        let rest = &self.tokenizer.raw_text()[self.raw_text_index..];
        rest.is_char_boundary(text.len())
            && text_eq(&rest[..text.len()], text, ignore_case)
            && self.tokens_in_characters(text.len()).is_some()
    }

    /// Match `regex` against this token's text alone. Only a match starting
    /// at the token's first character counts; it may end before the token
    /// does.
    ///
    /// The match's offsets are relative to the token. Add
    /// [`raw_text_index`](Self::raw_text_index) for offsets into the raw text.
    pub fn matches_regex(&self, regex: &Regex) -> Option<Match<'t>> {
        if !self.is_in_bounds() {
            return None;
        }
        regex.find(self.text()).filter(|m| m.start() == 0)
    }

    // ── Reclassification ────────────────────────────────────────────────

    /// Reclassify this token. Visible through every iterator on the same
    /// tokenizer.
    ///
    /// Line breaks can't be converted in either direction since the line
    /// index depends on them.
    pub fn change_type(&self, new_type: TokenType) -> Result<(), TokenizerError> {
        if !self.is_in_bounds() {
            return Err(TokenizerError::OutOfBounds);
        }
        let index = self.token_index as usize;
        check_conversion(self.tokenizer.token(index).token_type, new_type)?;
        self.tokenizer.set_token_type(index, new_type);
        Ok(())
    }

    /// Reclassify every token in the next `characters` bytes.
    ///
    /// The span must end on a token boundary, and every token in it must be
    /// convertible. On failure no token is changed.
    pub fn change_type_by_characters(
        &self,
        new_type: TokenType,
        characters: usize,
    ) -> Result<(), TokenizerError> {
        let count = self
            .tokens_in_characters(characters)
            .ok_or(TokenizerError::NotOnTokenBoundary { characters })?;
        if count == 0 {
            return Ok(());
        }

        let first = self.token_index as usize;
        for index in first..first + count {
            check_conversion(self.tokenizer.token(index).token_type, new_type)?;
        }
        for index in first..first + count {
            self.tokenizer.set_token_type(index, new_type);
        }
        Ok(())
    }

    // ── Comparison ──────────────────────────────────────────────────────

    /// Order two iterators by position. Fails if they belong to different
    /// tokenizers.
    pub fn compare(&self, other: &TokenIterator<'_>) -> Result<Ordering, TokenizerError> {
        self.partial_cmp(other)
            .ok_or(TokenizerError::DifferentTokenizers)
    }

    fn token_count(&self) -> isize {
        self.tokenizer.token_count() as isize
    }
}

fn check_conversion(from: TokenType, to: TokenType) -> Result<(), TokenizerError> {
    if from == TokenType::LineBreak || to == TokenType::LineBreak || to == TokenType::Null {
        return Err(TokenizerError::InvalidConversion { from, to });
    }
    Ok(())
}

impl PartialEq for TokenIterator<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tokenizer, other.tokenizer) && self.token_index == other.token_index
    }
}

impl Eq for TokenIterator<'_> {}

impl PartialOrd for TokenIterator<'_> {
    /// `None` for iterators over different tokenizers.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        std::ptr::eq(self.tokenizer, other.tokenizer)
            .then(|| self.token_index.cmp(&other.token_index))
    }
}

impl fmt::Debug for TokenIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIterator")
            .field("token_index", &self.token_index)
            .field("raw_text_index", &self.raw_text_index)
            .field("line_number", &self.line_number)
            .field("token_type", &self.token_type())
            .field("text", &self.text())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_tokens_and_tracks_lines() {
        let tokenizer = Tokenizer::new("a b\nc");
        let mut it = tokenizer.first_token();
        let mut seen = Vec::new();
        while it.is_in_bounds() {
            seen.push((it.text(), it.line_number()));
            it.next();
        }
        assert_eq!(
            seen,
            vec![("a", 1), (" ", 1), ("b", 1), ("\n", 1), ("c", 2)]
        );
    }

    #[test]
    fn starting_line_number_offsets_lines() {
        let tokenizer = Tokenizer::new("x\ny").starting_at_line(40);
        let mut it = tokenizer.first_token();
        assert_eq!(it.line_number(), 40);
        it.next_by(2);
        assert_eq!(it.line_number(), 41);
    }

    #[test]
    fn overshoot_is_remembered() {
        let tokenizer = Tokenizer::new("a b");
        let mut it = tokenizer.first_token();
        assert!(!it.next_by(5));
        assert_eq!(it.token_index(), 5);
        assert_eq!(it.raw_text_index(), 3);
        assert!(it.previous_by(4));
        assert!(it.previous());
        assert_eq!(it, tokenizer.first_token());

        assert!(!it.previous_by(2));
        assert_eq!(it.raw_text_index(), 0);
        assert!(it.next_by(2));
        assert_eq!(it.text(), "a");
    }

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let tokenizer = Tokenizer::new("a");
        let mut it = tokenizer.first_token();
        it.next();
        assert_eq!(it.text(), "");
        assert_eq!(it.character(), None);
        assert_eq!(it.token_type(), TokenType::Null);
        assert_eq!(it.raw_text_length(), 0);
        assert!(!it.matches_token("", false));
        assert!(!it.matches_across_tokens("a", false));
    }

    #[test]
    fn tokens_in_characters_requires_alignment() {
        let tokenizer = Tokenizer::new("foo.bar baz");
        let it = tokenizer.first_token();
        assert_eq!(it.tokens_in_characters(0), Some(0));
        assert_eq!(it.tokens_in_characters(3), Some(1));
        assert_eq!(it.tokens_in_characters(7), Some(3));
        assert_eq!(it.tokens_in_characters(2), None);
        assert_eq!(it.tokens_in_characters(100), None);
    }

    #[test]
    fn next_by_characters_fails_without_moving() {
        let tokenizer = Tokenizer::new("foo.bar");
        let mut it = tokenizer.first_token();
        assert_eq!(
            it.next_by_characters(5),
            Err(TokenizerError::NotOnTokenBoundary { characters: 5 })
        );
        assert_eq!(it.token_index(), 0);
        assert_eq!(it.next_by_characters(4), Ok(true));
        assert_eq!(it.text(), "bar");
    }

    #[test]
    fn change_type_is_shared() {
        let tokenizer = Tokenizer::new("fn main");
        let it = tokenizer.first_token();
        it.change_type(TokenType::Keyword).unwrap();

        assert_eq!(tokenizer.first_token().token_type(), TokenType::Keyword);
        assert_eq!(it.fundamental_type(), TokenType::Text);
    }

    #[test]
    fn fundamental_type_keeps_a_fundamental_reclassification() {
        let tokenizer = Tokenizer::new("nbsp x");
        let mut it = tokenizer.first_token();
        it.change_type(TokenType::Whitespace).unwrap();
        assert_eq!(it.fundamental_type(), TokenType::Whitespace);

        it.next_by(10);
        assert_eq!(it.fundamental_type(), TokenType::Null);
    }

    #[test]
    fn change_type_rejects_line_breaks_and_null() {
        let tokenizer = Tokenizer::new("a\nb");
        let mut it = tokenizer.first_token();
        assert!(matches!(
            it.change_type(TokenType::LineBreak),
            Err(TokenizerError::InvalidConversion { .. })
        ));
        assert!(it.change_type(TokenType::Null).is_err());

        it.next();
        assert_eq!(
            it.change_type(TokenType::Text),
            Err(TokenizerError::InvalidConversion {
                from: TokenType::LineBreak,
                to: TokenType::Text
            })
        );

        it.next_by(5);
        assert_eq!(
            it.change_type(TokenType::Text),
            Err(TokenizerError::OutOfBounds)
        );
    }

    #[test]
    fn change_type_by_characters_is_all_or_nothing() {
        let tokenizer = Tokenizer::new("// x\ny");
        let it = tokenizer.first_token();
        it.change_type_by_characters(TokenType::CommentSymbol, 2).unwrap();
        let types: Vec<_> = tokenizer.tokens().map(|t| t.token_type).collect();
        assert_eq!(types[..2], [TokenType::CommentSymbol; 2]);

        // Spans the line break, so nothing changes.
        assert!(it.change_type_by_characters(TokenType::Operator, 5).is_err());
        assert_eq!(tokenizer.first_token().token_type(), TokenType::CommentSymbol);

        assert_eq!(
            it.change_type_by_characters(TokenType::Operator, 100),
            Err(TokenizerError::NotOnTokenBoundary { characters: 100 })
        );
    }

    #[test]
    fn matches_across_tokens_needs_boundaries() {
        let tokenizer = Tokenizer::new("std::vec");
        let it = tokenizer.first_token();
        assert!(it.matches_across_tokens("std::", false));
        assert!(it.matches_across_tokens("STD::VEC", true));
        assert!(!it.matches_across_tokens("st", false));
        assert!(!it.matches_across_tokens("std::vector", false));
        assert!(it.matches_token("std", false));
        assert!(!it.matches_token("std::", false));
    }

    #[test]
    fn regex_must_match_at_cursor() {
        let tokenizer = Tokenizer::new("x = 0x1F;");
        let number = Regex::new(r"0x[0-9A-F]+").unwrap();
        let mut it = tokenizer.first_token();
        assert!(it.matches_regex(&number).is_none());
        it.next_by(4);
        assert_eq!(it.matches_regex(&number).map(|m| m.as_str()), Some("0x1F"));
    }

    #[test]
    fn regex_stays_within_the_token() {
        let tokenizer = Tokenizer::new("foo(x)");
        let it = tokenizer.first_token();
        assert_eq!(it.text(), "foo");
        assert!(it.matches_regex(&Regex::new(r"[a-z]+\(x").unwrap()).is_none());

        let prefix = it.matches_regex(&Regex::new(r"fo").unwrap()).unwrap();
        assert_eq!(prefix.as_str(), "fo");
        assert_eq!(prefix.range(), 0..2);

        let mut paren = it;
        paren.next_by(2);
        let x = paren.matches_regex(&Regex::new(r"x").unwrap()).unwrap();
        assert_eq!(paren.raw_text_index() + x.start(), 4);
    }

    #[test]
    fn append_token_to_builds_text() {
        let tokenizer = Tokenizer::new("a+b");
        let mut it = tokenizer.first_token();
        let mut out = String::new();
        while it.is_in_bounds() {
            it.append_token_to(&mut out);
            it.next();
        }
        assert_eq!(out, "a+b");
    }

    #[test]
    fn comparison_requires_same_tokenizer() {
        let first = Tokenizer::new("a b");
        let second = Tokenizer::new("a b");
        let a = first.first_token();
        let mut b = a;
        b.next();
        assert!(a < b);
        assert_eq!(a.compare(&b), Ok(Ordering::Less));

        let other = second.first_token();
        assert_ne!(a, other);
        assert_eq!(a.partial_cmp(&other), None);
        assert_eq!(a.compare(&other), Err(TokenizerError::DifferentTokenizers));
    }
}
