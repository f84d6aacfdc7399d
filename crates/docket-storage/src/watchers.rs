//! Change notification for topics.

use docket_core::{never_cancel, DocketError, EndingSymbol, Topic};
use rusqlite::Connection;

use crate::ending_symbols::{query_ending_symbol, query_ending_symbol_id};
use crate::topics::{topics_by_ending_symbol, topics_in_file};
use crate::Accessor;

/// Receives every topic change made through any accessor of a
/// [`CodeDb`](crate::CodeDb).
///
/// Notifications are delivered synchronously on the writing thread, while it
/// holds the write lock and the watcher list is locked, so implementations
/// must return promptly and must not register or remove watchers.
pub trait ChangeWatcher: Send + Sync {
    /// Called after `topic` was stored. Its IDs are set.
    fn on_add_topic(&self, topic: &Topic, event: &EventAccessor<'_>);

    /// Called before `old_topic` is changed to the new values.
    fn on_update_topic(
        &self,
        old_topic: &Topic,
        new_comment_line_number: u32,
        new_code_line_number: u32,
        new_body: Option<&str>,
        event: &EventAccessor<'_>,
    );

    /// Called after `topic` was removed.
    fn on_delete_topic(&self, topic: &Topic, event: &EventAccessor<'_>);
}

/// Read-only queries over the connection that made a change, for use inside
/// a [`ChangeWatcher`] callback. Sees the change even before its transaction
/// commits.
pub struct EventAccessor<'a> {
    conn: &'a Connection,
}

impl<'a> EventAccessor<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn get_topics_in_file(&self, file_id: u32) -> Result<Vec<Topic>, DocketError> {
        topics_in_file(self.conn, file_id, &never_cancel)
    }

    pub fn get_topics_by_ending_symbol(
        &self,
        ending_symbol: &EndingSymbol,
    ) -> Result<Vec<Topic>, DocketError> {
        topics_by_ending_symbol(self.conn, ending_symbol, &never_cancel)
    }

    pub fn get_ending_symbol_id(
        &self,
        ending_symbol: &EndingSymbol,
    ) -> Result<Option<u32>, DocketError> {
        query_ending_symbol_id(self.conn, ending_symbol)
    }

    pub fn get_ending_symbol(
        &self,
        ending_symbol_id: u32,
    ) -> Result<Option<EndingSymbol>, DocketError> {
        query_ending_symbol(self.conn, ending_symbol_id)
    }
}

impl Accessor<'_> {
    /// Deliver one notification to every watcher in registration order.
    pub(crate) fn notify(&self, deliver: impl Fn(&dyn ChangeWatcher, &EventAccessor<'_>)) {
        let watchers = self.db.watchers();
        if watchers.is_empty() {
            return;
        }
        let event = EventAccessor::new(&self.conn);
        for watcher in watchers.iter() {
            deliver(watcher.as_ref(), &event);
        }
    }
}
