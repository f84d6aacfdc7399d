//! Topic storage and per-file reconciliation.

use docket_core::{
    never_cancel, AccessLevel, Cancel, DatabaseCompareResult, DocketError, EndingSymbol,
    LockLevel, Symbol, Topic,
};
use rusqlite::{params, Connection, Params, Row};

use crate::ending_symbols::query_ending_symbol_id;
use crate::{unexpected, Accessor};

const TOPIC_COLUMNS: &str = "topic_id, file_id, language_id, comment_line_number, \
    code_line_number, title, body, symbol, ending_symbol_id, topic_type_id, access_level, tags";

/// What [`Accessor::update_topics_in_file`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    /// New topics that matched a stored topic exactly.
    pub unchanged: usize,
    /// Whether a transaction was opened and committed. False when nothing
    /// needed to change.
    pub committed: bool,
    /// Whether cancellation stopped the reconciliation early. Whatever was
    /// applied before that point is still committed.
    pub cancelled: bool,
}

impl ReconcileSummary {
    pub fn changes(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

/// Internal row struct for topic deserialization.
struct TopicRow {
    topic_id: u32,
    file_id: u32,
    language_id: u32,
    comment_line_number: u32,
    code_line_number: u32,
    title: String,
    body: Option<String>,
    symbol: String,
    ending_symbol_id: u32,
    topic_type_id: u32,
    access_level: i64,
    tags: Option<String>,
}

impl TopicRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            topic_id: row.get(0)?,
            file_id: row.get(1)?,
            language_id: row.get(2)?,
            comment_line_number: row.get(3)?,
            code_line_number: row.get(4)?,
            title: row.get(5)?,
            body: row.get(6)?,
            symbol: row.get(7)?,
            ending_symbol_id: row.get(8)?,
            topic_type_id: row.get(9)?,
            access_level: row.get(10)?,
            tags: row.get(11)?,
        })
    }

    fn into_topic(self) -> Result<Topic, DocketError> {
        let mut topic = Topic::new();
        topic.topic_id = self.topic_id;
        topic.file_id = self.file_id;
        topic.language_id = self.language_id;
        topic.set_comment_line_number(self.comment_line_number);
        topic.set_code_line_number(self.code_line_number);
        topic.title = Some(self.title);
        topic.body = self.body;
        topic.symbol = Symbol::from_symbol_string(self.symbol)?;
        topic.ending_symbol_id = self.ending_symbol_id;
        topic.topic_type_id = self.topic_type_id;
        topic.access_level = AccessLevel::try_from(self.access_level)?;
        topic.set_tag_string(self.tags.as_deref())?;
        Ok(topic)
    }
}

/// Run a topic query, polling `cancel` between rows. A cancelled query
/// returns the rows read so far.
fn query_topics<P: Params>(
    conn: &Connection,
    operation: &'static str,
    filter: &str,
    params: P,
    cancel: Cancel<'_>,
) -> Result<Vec<Topic>, DocketError> {
    let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE {filter}");
    let mut stmt = conn.prepare(&sql).map_err(unexpected(operation))?;
    let mut rows = stmt.query(params).map_err(unexpected(operation))?;

    let mut topics = Vec::new();
    while let Some(row) = rows.next().map_err(unexpected(operation))? {
        if cancel() {
            break;
        }
        let topic = TopicRow::from_row(row)
            .map_err(unexpected(operation))?
            .into_topic()?;
        topics.push(topic);
    }
    Ok(topics)
}

pub(crate) fn topics_in_file(
    conn: &Connection,
    file_id: u32,
    cancel: Cancel<'_>,
) -> Result<Vec<Topic>, DocketError> {
    query_topics(
        conn,
        "GetTopicsInFile",
        "file_id = ?1 ORDER BY comment_line_number, topic_id",
        params![file_id],
        cancel,
    )
}

pub(crate) fn topics_by_ending_symbol(
    conn: &Connection,
    ending_symbol: &EndingSymbol,
    cancel: Cancel<'_>,
) -> Result<Vec<Topic>, DocketError> {
    query_topics(
        conn,
        "GetTopicsByEndingSymbol",
        "ending_symbol_id = (SELECT ending_symbol_id FROM ending_symbols WHERE ending_symbol = ?1) \
         ORDER BY file_id, comment_line_number, topic_id",
        params![ending_symbol.as_str()],
        cancel,
    )
}

fn validation_result(operation: &'static str, problems: Vec<&str>) -> Result<(), DocketError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(DocketError::Validation {
            operation,
            problems: problems.into_iter().map(String::from).collect(),
        })
    }
}

/// A topic about to be added must not have IDs yet and must have every
/// required field.
fn validate_new_topic(topic: &Topic) -> Result<(), DocketError> {
    let mut problems = Vec::new();
    if topic.topic_id != 0 {
        problems.push("TopicID must be zero");
    }
    if topic.ending_symbol_id != 0 {
        problems.push("EndingSymbolID must be zero");
    }
    if topic.file_id == 0 {
        problems.push("FileID must be set");
    }
    if topic.language_id == 0 {
        problems.push("LanguageID must be set");
    }
    if topic.comment_line_number() == 0 {
        problems.push("CommentLineNumber must be set");
    }
    if topic.title.as_deref().map_or(true, str::is_empty) {
        problems.push("Title must be set");
    }
    if topic.symbol.is_empty() {
        problems.push("Symbol must be set");
    }
    if topic.topic_type_id == 0 {
        problems.push("TopicTypeID must be set");
    }
    validation_result("AddTopic", problems)
}

impl Accessor<'_> {
    /// All stored topics in a file, ordered by comment line. Requires at least
    /// a read-only lock.
    ///
    /// Cancellation is checked between rows; a cancelled call returns what
    /// was read so far, which the caller should discard.
    pub fn get_topics_in_file(
        &self,
        file_id: u32,
        cancel: Cancel<'_>,
    ) -> Result<Vec<Topic>, DocketError> {
        self.check_at_least("GetTopicsInFile", LockLevel::ReadOnly)?;
        topics_in_file(&self.conn, file_id, cancel)
    }

    /// Store a new topic, assigning its topic and ending symbol IDs.
    /// Requires read/write, upgrading a read/possible write lock.
    ///
    /// The ending symbol row is shared with any other topic whose symbol ends
    /// the same way.
    pub fn add_topic(&mut self, topic: &mut Topic) -> Result<(), DocketError> {
        const OPERATION: &str = "AddTopic";

        validate_new_topic(topic)?;
        self.require_at_least(OPERATION, LockLevel::ReadWrite)?;

        let ending_symbol = topic.symbol.last_segment();
        let ending_symbol_id = match query_ending_symbol_id(&self.conn, &ending_symbol)? {
            Some(id) => {
                // Back in use, so no longer a deletion candidate.
                self.ids_mut(OPERATION)?.ending_symbol_ids_to_check.remove(id);
                id
            }
            None => {
                let id = self.ids(OPERATION)?.next_ending_symbol_id()?;
                self.conn
                    .execute(
                        "INSERT INTO ending_symbols (ending_symbol_id, ending_symbol) VALUES (?1, ?2)",
                        params![id, ending_symbol.as_str()],
                    )
                    .map_err(unexpected("AddTopic inserting ending symbol"))?;
                self.ids_mut(OPERATION)?.used_ending_symbol_ids.add(id);
                id
            }
        };

        let topic_id = self.ids(OPERATION)?.next_topic_id()?;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO topics ({TOPIC_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    topic_id,
                    topic.file_id,
                    topic.language_id,
                    topic.comment_line_number(),
                    topic.code_line_number(),
                    topic.title,
                    topic.body,
                    topic.symbol.as_str(),
                    ending_symbol_id,
                    topic.topic_type_id,
                    topic.access_level.as_i64(),
                    topic.tag_string(),
                ],
            )
            .map_err(unexpected(OPERATION))?;
        self.ids_mut(OPERATION)?.used_topic_ids.add(topic_id);

        topic.topic_id = topic_id;
        topic.ending_symbol_id = ending_symbol_id;

        tracing::debug!(
            "Added topic {topic_id} \"{}\" ({}) in file {}",
            topic.title.as_deref().unwrap_or_default(),
            topic.symbol,
            topic.file_id
        );

        let topic: &Topic = topic;
        self.notify(|watcher, event| watcher.on_add_topic(topic, event));
        Ok(())
    }

    /// Change a stored topic's line numbers and body, the only fields that
    /// can differ between topics that compare as
    /// [`DatabaseCompareResult::EqualExceptLineNumbersAndBody`].
    ///
    /// Watchers see `old_topic` before it is changed.
    pub fn update_topic(
        &mut self,
        old_topic: &mut Topic,
        new_comment_line_number: u32,
        new_code_line_number: u32,
        new_body: Option<String>,
    ) -> Result<(), DocketError> {
        const OPERATION: &str = "UpdateTopic";

        let mut problems = Vec::new();
        if old_topic.topic_id == 0 {
            problems.push("TopicID must be set");
        }
        if new_comment_line_number == 0 && new_code_line_number == 0 {
            problems.push("CommentLineNumber must be set");
        }
        validation_result(OPERATION, problems)?;
        self.require_at_least(OPERATION, LockLevel::ReadWrite)?;

        // Resolve the fallbacks the same way Topic does.
        let comment_line = match new_comment_line_number {
            0 => new_code_line_number,
            line => line,
        };
        let code_line = match new_code_line_number {
            0 => new_comment_line_number,
            line => line,
        };

        let changed = self
            .conn
            .execute(
                "UPDATE topics SET comment_line_number = ?1, code_line_number = ?2, body = ?3
                 WHERE topic_id = ?4",
                params![comment_line, code_line, new_body, old_topic.topic_id],
            )
            .map_err(unexpected(OPERATION))?;
        if changed != 1 {
            return Err(DocketError::UnexpectedResult {
                operation: OPERATION,
                code: None,
                message: format!("{changed} rows changed for topic {}", old_topic.topic_id),
            });
        }

        tracing::debug!(
            "Updated topic {} to lines {comment_line}/{code_line}",
            old_topic.topic_id
        );

        {
            let topic: &Topic = old_topic;
            self.notify(|watcher, event| {
                watcher.on_update_topic(
                    topic,
                    new_comment_line_number,
                    new_code_line_number,
                    new_body.as_deref(),
                    event,
                )
            });
        }

        old_topic.set_comment_line_number(new_comment_line_number);
        old_topic.set_code_line_number(new_code_line_number);
        old_topic.body = new_body;
        Ok(())
    }

    /// Remove a stored topic. Its topic ID becomes free and its ending symbol
    /// is queued for [`cleanup_ending_symbols`](Self::cleanup_ending_symbols)
    /// rather than deleted here, since another topic may reuse it in the same
    /// batch.
    pub fn delete_topic(&mut self, topic: &Topic) -> Result<(), DocketError> {
        const OPERATION: &str = "DeleteTopic";

        let mut problems = Vec::new();
        if topic.topic_id == 0 {
            problems.push("TopicID must be set");
        }
        if topic.ending_symbol_id == 0 {
            problems.push("EndingSymbolID must be set");
        }
        validation_result(OPERATION, problems)?;
        self.require_at_least(OPERATION, LockLevel::ReadWrite)?;

        self.conn
            .execute(
                "DELETE FROM topics WHERE topic_id = ?1",
                params![topic.topic_id],
            )
            .map_err(unexpected(OPERATION))?;

        let ids = self.ids_mut(OPERATION)?;
        ids.used_topic_ids.remove(topic.topic_id);
        ids.ending_symbol_ids_to_check.add(topic.ending_symbol_id);

        tracing::debug!("Deleted topic {} in file {}", topic.topic_id, topic.file_id);

        self.notify(|watcher, event| watcher.on_delete_topic(topic, event));
        Ok(())
    }

    /// Bring the stored topics for `file_id` in line with `new_topics`.
    ///
    /// Each new topic is matched against the first remaining stored topic
    /// that doesn't compare [`DatabaseCompareResult::NotEqual`], in comment
    /// line order. Exact matches need no write, near matches are updated,
    /// and unmatched new topics are added. Stored topics nothing matched are
    /// deleted. Every new topic leaves with the IDs of the row it now
    /// represents.
    ///
    /// Requires at least read/possible write. The lock is only upgraded, and
    /// a transaction only opened, once the first change is needed; a
    /// reconciliation with nothing to change never blocks readers.
    ///
    /// `cancel` is checked between topics. Cancelling commits the changes
    /// applied so far and returns with `cancelled` set.
    pub fn update_topics_in_file(
        &mut self,
        file_id: u32,
        new_topics: &mut [Topic],
        cancel: Cancel<'_>,
    ) -> Result<ReconcileSummary, DocketError> {
        const OPERATION: &str = "UpdateTopicsInFile";

        let mismatched: Vec<String> = new_topics
            .iter()
            .filter(|topic| topic.file_id != file_id)
            .map(|topic| {
                format!(
                    "Topic \"{}\" has FileID {} instead of {file_id}",
                    topic.title.as_deref().unwrap_or_default(),
                    topic.file_id
                )
            })
            .collect();
        if !mismatched.is_empty() {
            return Err(DocketError::Validation {
                operation: OPERATION,
                problems: mismatched,
            });
        }

        self.require_at_least(OPERATION, LockLevel::ReadPossibleWrite)?;

        let old_topics = topics_in_file(&self.conn, file_id, &never_cancel)?;
        let (mut summary, committed) = self
            .lazy_transaction(|accessor| accessor.apply_changes(old_topics, new_topics, cancel))?;
        summary.committed = committed;

        tracing::info!(
            "Reconciled file {file_id}: {} added, {} updated, {} deleted, {} unchanged{}",
            summary.added,
            summary.updated,
            summary.deleted,
            summary.unchanged,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        Ok(summary)
    }

    fn apply_changes(
        &mut self,
        mut old_topics: Vec<Topic>,
        new_topics: &mut [Topic],
        cancel: Cancel<'_>,
    ) -> Result<ReconcileSummary, DocketError> {
        let mut summary = ReconcileSummary::default();

        for new_topic in new_topics.iter_mut() {
            if cancel() {
                summary.cancelled = true;
                return Ok(summary);
            }

            let matched = old_topics
                .iter()
                .enumerate()
                .find_map(|(i, old_topic)| match new_topic.database_compare(old_topic) {
                    DatabaseCompareResult::NotEqual => None,
                    result => Some((i, result)),
                });

            match matched {
                Some((i, result)) => {
                    let mut old_topic = old_topics.remove(i);
                    if result == DatabaseCompareResult::EqualExceptLineNumbersAndBody {
                        self.begin_if_needed()?;
                        self.update_topic(
                            &mut old_topic,
                            new_topic.comment_line_number(),
                            new_topic.code_line_number(),
                            new_topic.body.clone(),
                        )?;
                        summary.updated += 1;
                    } else {
                        summary.unchanged += 1;
                    }
                    new_topic.topic_id = old_topic.topic_id;
                    new_topic.ending_symbol_id = old_topic.ending_symbol_id;
                }
                None => {
                    self.begin_if_needed()?;
                    self.add_topic(new_topic)?;
                    summary.added += 1;
                }
            }
        }

        for old_topic in &old_topics {
            if cancel() {
                summary.cancelled = true;
                return Ok(summary);
            }
            self.begin_if_needed()?;
            self.delete_topic(old_topic)?;
            summary.deleted += 1;
        }

        Ok(summary)
    }

    /// Delete every stored topic in a file inside one transaction. Requires
    /// at least read/possible write. Returns how many were deleted.
    pub fn delete_topics_in_file(
        &mut self,
        file_id: u32,
        cancel: Cancel<'_>,
    ) -> Result<usize, DocketError> {
        const OPERATION: &str = "DeleteTopicsInFile";

        self.require_at_least(OPERATION, LockLevel::ReadPossibleWrite)?;

        let topics = topics_in_file(&self.conn, file_id, &never_cancel)?;
        if topics.is_empty() {
            return Ok(0);
        }

        let (deleted, _) = self.lazy_transaction(|accessor| {
            let mut deleted = 0;
            for topic in &topics {
                if cancel() {
                    break;
                }
                accessor.begin_if_needed()?;
                accessor.delete_topic(topic)?;
                deleted += 1;
            }
            Ok(deleted)
        })?;

        tracing::info!("Deleted {deleted} topics in file {file_id}");
        Ok(deleted)
    }
}
