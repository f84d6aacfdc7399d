use crate::TokenType;

/// Errors from misusing tokenizer iterators. Reading past either end is not an
/// error; these all indicate a bug in the calling parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizerError {
    /// Offsets are stored as `u32`, which bounds the text length.
    #[error("Text of {bytes} bytes is too large to tokenize")]
    TextTooLarge { bytes: usize },

    #[error("Tried to change a token while the iterator was out of bounds")]
    OutOfBounds,

    #[error("Can't convert a {from} token to {to}")]
    InvalidConversion { from: TokenType, to: TokenType },

    #[error("Moving {characters} characters doesn't end on a token boundary")]
    NotOnTokenBoundary { characters: usize },

    #[error("Can't compare the positions of iterators from different tokenizers")]
    DifferentTokenizers,
}
