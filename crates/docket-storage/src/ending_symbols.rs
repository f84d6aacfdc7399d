//! Ending symbol lookups and cleanup.

use docket_core::{Cancel, DocketError, EndingSymbol, LockLevel, NumberSet, Topic};
use rusqlite::{params, Connection, OptionalExtension};

use crate::topics::topics_by_ending_symbol;
use crate::{unexpected, Accessor};

pub(crate) fn query_ending_symbol_id(
    conn: &Connection,
    ending_symbol: &EndingSymbol,
) -> Result<Option<u32>, DocketError> {
    conn.query_row(
        "SELECT ending_symbol_id FROM ending_symbols WHERE ending_symbol = ?1",
        params![ending_symbol.as_str()],
        |row| row.get(0),
    )
    .optional()
    .map_err(unexpected("GetEndingSymbolID"))
}

pub(crate) fn query_ending_symbol(
    conn: &Connection,
    ending_symbol_id: u32,
) -> Result<Option<EndingSymbol>, DocketError> {
    conn.query_row(
        "SELECT ending_symbol FROM ending_symbols WHERE ending_symbol_id = ?1",
        params![ending_symbol_id],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map(|found| found.map(EndingSymbol::new))
    .map_err(unexpected("GetEndingSymbol"))
}

impl Accessor<'_> {
    /// The ID of an ending symbol's row, if any topic has used it.
    pub fn get_ending_symbol_id(
        &self,
        ending_symbol: &EndingSymbol,
    ) -> Result<Option<u32>, DocketError> {
        self.check_at_least("GetEndingSymbolID", LockLevel::ReadOnly)?;
        query_ending_symbol_id(&self.conn, ending_symbol)
    }

    pub fn get_ending_symbol(
        &self,
        ending_symbol_id: u32,
    ) -> Result<Option<EndingSymbol>, DocketError> {
        self.check_at_least("GetEndingSymbol", LockLevel::ReadOnly)?;
        query_ending_symbol(&self.conn, ending_symbol_id)
    }

    /// Every topic whose symbol ends in `ending_symbol`, across all files,
    /// ordered by file and comment line. These are the candidates when
    /// resolving a link to that name.
    pub fn get_topics_by_ending_symbol(
        &self,
        ending_symbol: &EndingSymbol,
        cancel: Cancel<'_>,
    ) -> Result<Vec<Topic>, DocketError> {
        self.check_at_least("GetTopicsByEndingSymbol", LockLevel::ReadOnly)?;
        topics_by_ending_symbol(&self.conn, ending_symbol, cancel)
    }

    /// Ending symbol IDs that lost a reference since the last cleanup.
    pub fn ending_symbol_ids_to_check(&self) -> Result<NumberSet, DocketError> {
        Ok(self
            .ids("EndingSymbolIDsToCheck")?
            .ending_symbol_ids_to_check
            .clone())
    }

    /// Delete the rows of queued ending symbols that no topic references any
    /// more and free their IDs. Requires at least read/possible write; the
    /// lock is only upgraded when something is queued. Returns how many rows
    /// were deleted.
    pub fn cleanup_ending_symbols(&mut self) -> Result<usize, DocketError> {
        const OPERATION: &str = "CleanupEndingSymbols";

        self.require_at_least(OPERATION, LockLevel::ReadPossibleWrite)?;
        let pending = self.ending_symbol_ids_to_check()?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut unreferenced = Vec::new();
        for id in pending.iter() {
            let referenced: bool = self
                .conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM topics WHERE ending_symbol_id = ?1)",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(unexpected(OPERATION))?;
            if !referenced {
                unreferenced.push(id);
            }
        }

        let (deleted, _) = self.lazy_transaction(|accessor| {
            accessor.require_at_least(OPERATION, LockLevel::ReadWrite)?;

            for &id in &unreferenced {
                accessor.begin_if_needed()?;
                accessor
                    .conn
                    .execute(
                        "DELETE FROM ending_symbols WHERE ending_symbol_id = ?1",
                        params![id],
                    )
                    .map_err(unexpected(OPERATION))?;
            }

            let ids = accessor.ids_mut(OPERATION)?;
            for &id in &unreferenced {
                ids.used_ending_symbol_ids.remove(id);
            }
            ids.ending_symbol_ids_to_check.clear();
            Ok(unreferenced.len())
        })?;

        tracing::info!(
            "Ending symbol cleanup checked {} and deleted {deleted}",
            pending.len()
        );
        Ok(deleted)
    }
}
