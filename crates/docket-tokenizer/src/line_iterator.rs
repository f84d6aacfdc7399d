//! Line-level cursor.

use std::cmp::Ordering;
use std::fmt;

use regex::{Match, Regex};

use crate::{TokenIterator, TokenType, Tokenizer, TokenizerError};

/// Which tokens of a line count as its content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LineBoundsMode {
    /// Every token including the line break.
    #[default]
    Everything,
    /// Leading and trailing whitespace and the line break are excluded.
    ExcludeWhitespace,
    /// Like `ExcludeWhitespace`, and leading and trailing comment symbols and
    /// decorations are excluded too.
    CommentContent,
}

impl LineBoundsMode {
    fn is_skippable(self, token_type: TokenType) -> bool {
        match self {
            Self::Everything => false,
            Self::ExcludeWhitespace => {
                matches!(token_type, TokenType::Whitespace | TokenType::LineBreak)
            }
            Self::CommentContent => matches!(
                token_type,
                TokenType::Whitespace
                    | TokenType::LineBreak
                    | TokenType::CommentSymbol
                    | TokenType::CommentDecoration
            ),
        }
    }
}

/// A copyable cursor on one line of a [`Tokenizer`].
///
/// Follows the same out-of-bounds rules as [`TokenIterator`]: moves never
/// fail, overshoot is remembered, and reads out of bounds return empty
/// values.
#[derive(Clone, Copy)]
pub struct LineIterator<'t> {
    tokenizer: &'t Tokenizer,
    line_index: isize,
    /// First token of the line, clamped to either end when out of bounds.
    token_index: usize,
    raw_text_index: usize,
}

impl<'t> LineIterator<'t> {
    pub(crate) fn new(
        tokenizer: &'t Tokenizer,
        line_index: isize,
        token_index: usize,
        raw_text_index: usize,
    ) -> Self {
        Self {
            tokenizer,
            line_index,
            token_index,
            raw_text_index,
        }
    }

    // ── Movement ────────────────────────────────────────────────────────

    pub fn next(&mut self) -> bool {
        self.next_by(1)
    }

    /// Move forward `count` lines. Returns whether the cursor is in bounds.
    pub fn next_by(&mut self, count: usize) -> bool {
        let from = self.line_index;
        let to = from.saturating_add_unsigned(count);

        for index in from.max(0)..to.min(self.line_count()) {
            let line = self.tokenizer.line(index as usize);
            self.token_index += line.token_length as usize;
            self.raw_text_index += line.raw_text_length as usize;
        }

        self.line_index = to;
        self.is_in_bounds()
    }

    pub fn previous(&mut self) -> bool {
        self.previous_by(1)
    }

    /// Move back `count` lines. Returns whether the cursor is in bounds.
    pub fn previous_by(&mut self, count: usize) -> bool {
        let from = self.line_index;
        let to = from.saturating_sub_unsigned(count);

        for index in (to.max(0)..from.min(self.line_count())).rev() {
            let line = self.tokenizer.line(index as usize);
            self.token_index -= line.token_length as usize;
            self.raw_text_index -= line.raw_text_length as usize;
        }

        self.line_index = to;
        self.is_in_bounds()
    }

    // ── Reading ─────────────────────────────────────────────────────────

    pub fn is_in_bounds(&self) -> bool {
        self.line_index >= 0 && self.line_index < self.line_count()
    }

    /// Line number, counted from the tokenizer's starting line. Saturates at
    /// zero when far out of bounds before the start.
    pub fn line_number(&self) -> usize {
        let start = self.tokenizer.starting_line_number();
        if self.line_index >= 0 {
            start.saturating_add(self.line_index as usize)
        } else {
            start.saturating_sub(self.line_index.unsigned_abs())
        }
    }

    pub fn line_index(&self) -> isize {
        self.line_index
    }

    pub fn tokenizer(&self) -> &'t Tokenizer {
        self.tokenizer
    }

    /// First token within the bounds. Equal to the end bound when the line is
    /// empty under `mode`.
    pub fn first_token(&self, mode: LineBoundsMode) -> TokenIterator<'t> {
        self.bounds(mode).0
    }

    /// Start (inclusive) and end (exclusive) token iterators of the line's
    /// content under `mode`. Both sit at the line's position when out of
    /// bounds.
    pub fn bounds(&self, mode: LineBoundsMode) -> (TokenIterator<'t>, TokenIterator<'t>) {
        let mut start = TokenIterator::new(
            self.tokenizer,
            self.token_index as isize,
            self.raw_text_index,
            self.line_number(),
        );
        if !self.is_in_bounds() {
            return (start, start);
        }

        let mut end = start;
        end.next_by(self.tokenizer.line(self.line_index as usize).token_length as usize);

        while start < end && mode.is_skippable(start.token_type()) {
            start.next();
        }
        while start < end {
            let mut last = end;
            last.previous();
            if !mode.is_skippable(last.token_type()) {
                break;
            }
            end = last;
        }

        (start, end)
    }

    /// Byte offsets of the line's content under `mode`.
    pub fn raw_text_bounds(&self, mode: LineBoundsMode) -> (usize, usize) {
        let (start, end) = self.bounds(mode);
        (start.raw_text_index(), end.raw_text_index())
    }

    /// The line's content under `mode`, or `""` out of bounds.
    pub fn text(&self, mode: LineBoundsMode) -> &'t str {
        let (start, end) = self.raw_text_bounds(mode);
        &self.tokenizer.raw_text()[start..end]
    }

    /// Whether the line has no content under `mode`.
    pub fn is_empty(&self, mode: LineBoundsMode) -> bool {
        let (start, end) = self.bounds(mode);
        start == end
    }

    /// Column of the first content token under `mode`, with tabs expanded
    /// to the tokenizer's tab stops. Everything before that token counts,
    /// including comment symbols skipped by `CommentContent`.
    pub fn indent(&self, mode: LineBoundsMode) -> usize {
        let (start, _) = self.raw_text_bounds(mode);
        let width = self.tokenizer.tab_width();

        self.tokenizer.raw_text()[self.raw_text_index..start]
            .chars()
            .fold(0, |indent, c| {
                if c == '\t' {
                    let indent = indent + width;
                    indent - indent % width
                } else {
                    indent + 1
                }
            })
    }

    /// Search the line's content under `mode` with `regex`.
    ///
    /// The match's offsets are relative to that content. Add the first value
    /// of [`raw_text_bounds`](Self::raw_text_bounds) for offsets into the raw
    /// text.
    pub fn match_regex(&self, regex: &Regex, mode: LineBoundsMode) -> Option<Match<'t>> {
        if !self.is_in_bounds() {
            return None;
        }
        regex.find(self.text(mode))
    }

    // ── Searching ───────────────────────────────────────────────────────

    /// The first token within the bounds that is exactly `text`.
    pub fn find_token(
        &self,
        text: &str,
        ignore_case: bool,
        mode: LineBoundsMode,
    ) -> Option<TokenIterator<'t>> {
        let (mut it, end) = self.bounds(mode);
        while it < end {
            if it.matches_token(text, ignore_case) {
                return Some(it);
            }
            it.next();
        }
        None
    }

    /// The first occurrence of `text` within the bounds that starts and ends
    /// on token boundaries. It may span several tokens.
    pub fn find_across_tokens(
        &self,
        text: &str,
        ignore_case: bool,
        mode: LineBoundsMode,
    ) -> Option<TokenIterator<'t>> {
        let (mut it, end) = self.bounds(mode);
        let limit = end.raw_text_index();
        while it < end {
            if it.raw_text_index() + text.len() > limit {
                break;
            }
            if it.matches_across_tokens(text, ignore_case) {
                return Some(it);
            }
            it.next();
        }
        None
    }

    // ── Comparison ──────────────────────────────────────────────────────

    /// Order two iterators by position. Fails if they belong to different
    /// tokenizers.
    pub fn compare(&self, other: &LineIterator<'_>) -> Result<Ordering, TokenizerError> {
        self.partial_cmp(other)
            .ok_or(TokenizerError::DifferentTokenizers)
    }

    fn line_count(&self) -> isize {
        self.tokenizer.line_count() as isize
    }
}

impl PartialEq for LineIterator<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tokenizer, other.tokenizer) && self.line_index == other.line_index
    }
}

impl Eq for LineIterator<'_> {}

impl PartialOrd for LineIterator<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        std::ptr::eq(self.tokenizer, other.tokenizer)
            .then(|| self.line_index.cmp(&other.line_index))
    }
}

impl fmt::Debug for LineIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineIterator")
            .field("line_index", &self.line_index)
            .field("token_index", &self.token_index)
            .field("raw_text_index", &self.raw_text_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LineBoundsMode::*;

    /// Mark leading `//` and trailing `*` runs the way a comment parser would.
    fn mark_comment(tokenizer: &Tokenizer) {
        let mut it = tokenizer.first_token();
        while it.is_in_bounds() {
            match it.text() {
                "/" => it.change_type(TokenType::CommentSymbol).unwrap(),
                "*" => it.change_type(TokenType::CommentDecoration).unwrap(),
                _ => {}
            }
            it.next();
        }
    }

    #[test]
    fn bounds_modes_trim_progressively() {
        let tokenizer = Tokenizer::new("  // text here **  \nnext");
        mark_comment(&tokenizer);
        let line = tokenizer.first_line();

        assert_eq!(line.text(Everything), "  // text here **  \n");
        assert_eq!(line.text(ExcludeWhitespace), "// text here **");
        assert_eq!(line.text(CommentContent), "text here");
    }

    #[test]
    fn blank_lines_are_empty_unless_everything() {
        let tokenizer = Tokenizer::new("a\n   \nb");
        let mut line = tokenizer.first_line();
        line.next();
        assert!(line.is_empty(ExcludeWhitespace));
        assert!(!line.is_empty(Everything));
        assert_eq!(line.first_token(ExcludeWhitespace), line.bounds(ExcludeWhitespace).1);
    }

    #[test]
    fn line_overshoot_is_remembered() {
        let tokenizer = Tokenizer::new("a\nb\nc");
        let mut line = tokenizer.first_line();
        line.next();
        let second = line;

        assert!(!line.next_by(10));
        assert_eq!(line.text(Everything), "");
        assert_eq!(line.indent(Everything), 0);
        assert!(line.previous_by(10));
        assert_eq!(line, second);
        assert_eq!(line.text(Everything), "b\n");
        assert_eq!(line.line_number(), 2);
    }

    #[test]
    fn line_numbers_follow_starting_line() {
        let tokenizer = Tokenizer::new("a\nb").starting_at_line(10);
        let mut line = tokenizer.first_line();
        assert_eq!(line.line_number(), 10);
        line.next();
        assert_eq!(line.line_number(), 11);
        assert_eq!(line.first_token(Everything).line_number(), 11);
        line.previous_by(20);
        assert_eq!(line.line_number(), 0);
    }

    #[test]
    fn indent_expands_tabs_to_stops() {
        let tokenizer = Tokenizer::new("\tx\n  \tx\n     x\n// x").with_tab_width(4);
        mark_comment(&tokenizer);
        let mut line = tokenizer.first_line();
        assert_eq!(line.indent(ExcludeWhitespace), 4);
        line.next();
        assert_eq!(line.indent(ExcludeWhitespace), 4);
        line.next();
        assert_eq!(line.indent(ExcludeWhitespace), 5);
        line.next();
        assert_eq!(line.indent(ExcludeWhitespace), 0);
        assert_eq!(line.indent(CommentContent), 3);
    }

    #[test]
    fn find_token_within_bounds() {
        let tokenizer = Tokenizer::new("// Function: Foo\n");
        mark_comment(&tokenizer);
        let line = tokenizer.first_line();

        let found = line.find_token("function", true, CommentContent).unwrap();
        assert_eq!(found.text(), "Function");
        assert!(line.find_token("function", false, CommentContent).is_none());
        assert!(line.find_token("/", false, CommentContent).is_none());
        assert!(line.find_token("/", false, Everything).is_some());
    }

    #[test]
    fn find_across_tokens_respects_boundaries() {
        let tokenizer = Tokenizer::new("call std::vec::Vec here");
        let line = tokenizer.first_line();

        let found = line
            .find_across_tokens("std::vec", false, Everything)
            .unwrap();
        assert_eq!(found.raw_text_index(), 5);
        assert!(line.find_across_tokens("d::v", false, Everything).is_none());
        assert!(line.find_across_tokens("here\n", false, Everything).is_none());
        assert!(line.find_across_tokens("", false, Everything).is_none());
    }

    #[test]
    fn find_does_not_cross_the_bounds() {
        let tokenizer = Tokenizer::new("a b  \n");
        let line = tokenizer.first_line();
        assert!(line.find_across_tokens("b  ", false, Everything).is_some());
        assert!(line.find_across_tokens("b  ", false, ExcludeWhitespace).is_none());
    }

    #[test]
    fn regex_searches_line_content() {
        let tokenizer = Tokenizer::new("  let x = 12;  \nlet y = 3;");
        let number = Regex::new(r"\d+").unwrap();
        let line = tokenizer.first_line();
        assert_eq!(
            line.match_regex(&number, ExcludeWhitespace).map(|m| m.as_str()),
            Some("12")
        );

        let mut second = line;
        second.next();
        let found = second.match_regex(&number, ExcludeWhitespace).unwrap();
        assert_eq!(found.start(), 8);
        let (content_start, _) = second.raw_text_bounds(ExcludeWhitespace);
        let raw = content_start + found.start();
        assert_eq!(&tokenizer.raw_text()[raw..raw + found.len()], "3");
    }

    #[test]
    fn comparison_requires_same_tokenizer() {
        let first = Tokenizer::new("a\nb");
        let second = Tokenizer::new("a\nb");
        let a = first.first_line();
        let mut b = a;
        b.next();
        assert_eq!(a.compare(&b), Ok(Ordering::Less));
        assert_eq!(
            a.compare(&second.first_line()),
            Err(TokenizerError::DifferentTokenizers)
        );
    }
}
