//! Token and line records stored by a [`Tokenizer`](crate::Tokenizer).

use std::fmt;

/// The type of a token.
///
/// The first group are fundamental types assigned during tokenization. The
/// rest are only ever assigned by parsers reclassifying tokens afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Never a live token. Returned when reading out of bounds.
    Null,
    Text,
    Whitespace,
    LineBreak,
    Symbol,

    // Reclassified types
    CommentSymbol,
    CommentDecoration,
    Keyword,
    Identifier,
    Number,
    StringLiteral,
    Operator,
}

impl TokenType {
    /// Whether this is one of the types tokenization itself produces.
    pub fn is_fundamental(self) -> bool {
        matches!(
            self,
            Self::Null | Self::Text | Self::Whitespace | Self::LineBreak | Self::Symbol
        )
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Text => write!(f, "text"),
            Self::Whitespace => write!(f, "whitespace"),
            Self::LineBreak => write!(f, "line break"),
            Self::Symbol => write!(f, "symbol"),
            Self::CommentSymbol => write!(f, "comment symbol"),
            Self::CommentDecoration => write!(f, "comment decoration"),
            Self::Keyword => write!(f, "keyword"),
            Self::Identifier => write!(f, "identifier"),
            Self::Number => write!(f, "number"),
            Self::StringLiteral => write!(f, "string literal"),
            Self::Operator => write!(f, "operator"),
        }
    }
}

/// One token: a length in bytes of the raw text and a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub length: u32,
    pub token_type: TokenType,
}

/// One physical line, as counts of the tokens and raw text bytes it covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Line {
    pub token_length: u32,
    pub raw_text_length: u32,
}
