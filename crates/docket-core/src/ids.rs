//! ID allocation state shared by every accessor of one code database.

use crate::{DocketError, NumberSet};

/// The sets of IDs currently in use, plus ending symbols that lost a
/// reference and may need their row removed.
///
/// None of this is part of the SQL transaction, so it must only be mutated
/// while holding the database's write lock. A rollback does not restore it;
/// callers that roll back keep a copy to put back.
#[derive(Debug, Clone, Default)]
pub struct IdAllocators {
    pub used_topic_ids: NumberSet,
    pub used_ending_symbol_ids: NumberSet,
    pub ending_symbol_ids_to_check: NumberSet,
}

impl IdAllocators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest topic ID not in use.
    pub fn next_topic_id(&self) -> Result<u32, DocketError> {
        self.used_topic_ids
            .lowest_available()
            .ok_or(DocketError::IdsExhausted("topic"))
    }

    /// Lowest ending symbol ID not in use.
    pub fn next_ending_symbol_id(&self) -> Result<u32, DocketError> {
        self.used_ending_symbol_ids
            .lowest_available()
            .ok_or(DocketError::IdsExhausted("ending symbol"))
    }
}
