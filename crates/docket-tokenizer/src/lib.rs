//! docket-tokenizer: Token and line iteration over source text.
//!
//! A [`Tokenizer`] splits raw text into a flat sequence of typed tokens and a
//! parallel per-line index. Parsers walk it with lightweight, copyable
//! cursors:
//!
//! - **token**: [`Token`], [`TokenType`] and [`Line`] records
//! - **tokenizer**: the fundamental-type classifier and the token/line arrays
//! - **token_iterator**: [`TokenIterator`], token-by-token movement, matching
//!   and type reclassification
//! - **line_iterator**: [`LineIterator`], line-by-line movement, bounds,
//!   indents and searches within a line
//!
//! Cursors may move past either end without failing. Reads at an out-of-bounds
//! position return empty values; only mutation or misuse returns a
//! [`TokenizerError`].

pub mod error;
pub mod line_iterator;
pub mod token;
pub mod token_iterator;
pub mod tokenizer;

pub use error::TokenizerError;
pub use line_iterator::{LineBoundsMode, LineIterator};
pub use token::{Line, Token, TokenType};
pub use token_iterator::TokenIterator;
pub use tokenizer::Tokenizer;
