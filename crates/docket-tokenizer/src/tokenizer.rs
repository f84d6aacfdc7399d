//! Splitting raw text into fundamental tokens and lines.

use std::cell::Cell;

use docket_core::TokenizerConfig;

use crate::{Line, LineIterator, Token, TokenIterator, TokenType, TokenizerError};

/// Tab stop width used when none is configured.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Raw text plus its partition into tokens and lines.
///
/// Token boundaries and the text are fixed once constructed. Token types can
/// be reclassified through any [`TokenIterator`], and the change is visible
/// through every other iterator over the same tokenizer. Because types live in
/// `Cell`s a tokenizer is confined to one thread at a time; parse different
/// files with different tokenizers.
#[derive(Debug)]
pub struct Tokenizer {
    raw_text: String,
    tokens: Vec<Cell<Token>>,
    lines: Vec<Line>,
    starting_line_number: usize,
    tab_width: usize,
}

impl Tokenizer {
    /// Tokenize `raw_text`. Line numbers start at one.
    ///
    /// # Panics
    ///
    /// If the text is longer than `u32::MAX` bytes. Use
    /// [`try_new`](Self::try_new) for input of unknown size.
    pub fn new(raw_text: impl Into<String>) -> Self {
        match Self::try_new(raw_text) {
            Ok(tokenizer) => tokenizer,
            Err(e) => panic!("{e}"),
        }
    }

    /// Tokenize `raw_text`, failing if it is longer than `u32::MAX` bytes.
    pub fn try_new(raw_text: impl Into<String>) -> Result<Self, TokenizerError> {
        let raw_text = raw_text.into();
        check_length(raw_text.len())?;

        let (tokens, lines) = tokenize(&raw_text);

        Ok(Self {
            raw_text,
            tokens,
            lines,
            starting_line_number: 1,
            tab_width: DEFAULT_TAB_WIDTH,
        })
    }

    /// Apply the tokenizer settings from a [`TokenizerConfig`].
    pub fn with_config(self, config: &TokenizerConfig) -> Self {
        self.with_tab_width(config.tab_width)
    }

    /// Number the first line `line_number`, for text that is a section of a
    /// larger file.
    pub fn starting_at_line(mut self, line_number: usize) -> Self {
        self.starting_line_number = line_number;
        self
    }

    /// Set the tab stop width used by [`LineIterator::indent`]. Zero is
    /// treated as one.
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width.max(1);
        self
    }

    /// Which fundamental type a character tokenizes as.
    pub fn fundamental_type_of(c: char) -> TokenType {
        match c {
            '\n' | '\r' => TokenType::LineBreak,
            c if c.is_whitespace() => TokenType::Whitespace,
            c if c.is_alphanumeric() || c == '_' || !c.is_ascii() => TokenType::Text,
            _ => TokenType::Symbol,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Current state of every token, in order.
    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.tokens.iter().map(Cell::get)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn starting_line_number(&self) -> usize {
        self.starting_line_number
    }

    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// An iterator on the first token.
    pub fn first_token(&self) -> TokenIterator<'_> {
        TokenIterator::new(self, 0, 0, self.starting_line_number)
    }

    /// An iterator on the first line.
    pub fn first_line(&self) -> LineIterator<'_> {
        LineIterator::new(self, 0, 0, 0)
    }

    /// The raw text from `start` up to but not including `end`. Empty if `end`
    /// comes first.
    pub fn text_between(
        &self,
        start: &TokenIterator<'_>,
        end: &TokenIterator<'_>,
    ) -> Result<&str, TokenizerError> {
        if !std::ptr::eq(start.tokenizer(), self) || !std::ptr::eq(end.tokenizer(), self) {
            return Err(TokenizerError::DifferentTokenizers);
        }

        let (from, to) = (start.raw_text_index(), end.raw_text_index());
        Ok(if from < to {
            &self.raw_text[from..to]
        } else {
            ""
        })
    }

    pub(crate) fn token(&self, index: usize) -> Token {
        self.tokens[index].get()
    }

    pub(crate) fn set_token_type(&self, index: usize, token_type: TokenType) {
        let cell = &self.tokens[index];
        cell.set(Token {
            token_type,
            ..cell.get()
        });
    }

    pub(crate) fn line(&self, index: usize) -> Line {
        self.lines[index]
    }
}

fn check_length(bytes: usize) -> Result<(), TokenizerError> {
    match u32::try_from(bytes) {
        Ok(_) => Ok(()),
        Err(_) => Err(TokenizerError::TextTooLarge { bytes }),
    }
}

fn tokenize(raw_text: &str) -> (Vec<Cell<Token>>, Vec<Line>) {
    let mut tokens = Vec::new();
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut chars = raw_text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token_type = Tokenizer::fundamental_type_of(c);
        let mut end = start + c.len_utf8();

        match token_type {
            TokenType::LineBreak => {
                if c == '\r' && matches!(chars.peek(), Some(&(_, '\n'))) {
                    chars.next();
                    end += 1;
                }
            }
            TokenType::Whitespace | TokenType::Text => {
                while let Some(&(i, next)) = chars.peek() {
                    if Tokenizer::fundamental_type_of(next) != token_type {
                        break;
                    }
                    chars.next();
                    end = i + next.len_utf8();
                }
            }
            // Every symbol character is its own token.
            _ => {}
        }

        // The whole text fits in a u32, so every token does too.
        let length = (end - start) as u32;
        tokens.push(Cell::new(Token { length, token_type }));
        line.token_length += 1;
        line.raw_text_length += length;

        if token_type == TokenType::LineBreak {
            lines.push(line);
            line = Line::default();
        }
    }

    if line.token_length > 0 || lines.is_empty() {
        lines.push(line);
    }

    (tokens, lines)
}

/// Compare two strings, optionally ignoring case.
pub(crate) fn text_eq(a: &str, b: &str, ignore_case: bool) -> bool {
    if !ignore_case {
        a == b
    } else if a.is_ascii() && b.is_ascii() {
        a.eq_ignore_ascii_case(b)
    } else {
        a.chars()
            .flat_map(char::to_lowercase)
            .eq(b.chars().flat_map(char::to_lowercase))
    }
}
