//! Defines the transaction record model and the shapes used to edit it.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};

use crate::tenant::TenantId;

/// Alias for the opaque string identifier assigned to transaction records.
///
/// Ids are produced by the client that creates the record, globally unique,
/// and immutable after creation.
pub type RecordId = String;

/// The classification applied to expenses that do not declare one.
pub const DEFAULT_EXPENSE_TYPE: &str = "operational";

/// Whether a transaction earned or spent money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money flowing in.
    Income,
    /// Money flowing out.
    Expense,
}

/// A row of the replicated `transactions` table.
///
/// Rows are created locally through [TransactionRecord::draft] or merged in
/// from the remote store by the replica's remote-origin upsert. The
/// `version`/`dirty`/`updated_at` bookkeeping belongs to the replica store;
/// callers edit rows through [RecordPatch] rather than mutating them
/// directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Opaque unique identifier, immutable after creation.
    pub id: RecordId,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// The calendar date the transaction happened on.
    pub date: Date,
    /// Optional clock-time companion to `datetime`.
    pub time: Option<Time>,
    /// Full timestamp; the sole sort key for recency ordering.
    pub datetime: OffsetDateTime,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Free-form classification, e.g. "Travel".
    pub category: String,
    /// The client or counterparty the transaction relates to.
    pub client_name: String,
    /// Expense classification; defaults to [DEFAULT_EXPENSE_TYPE].
    pub expense_type: String,
    /// Monetary amount in minor units. Never floating point.
    pub amount_cents: i64,
    /// Opaque identifier of the device that produced the last edit.
    pub source_device: String,
    /// Optimistic concurrency token; starts at 1, +1 per local mutation.
    pub version: i64,
    /// When the row was last mutated, locally or remotely.
    pub updated_at: OffsetDateTime,
    /// Non-null marks a soft delete. Tombstoned rows are excluded from date,
    /// range, point, and aggregate queries but stay physically present so
    /// the deletion can still be pushed to the remote store.
    pub deleted_at: Option<OffsetDateTime>,
    /// Whether the row carries local changes not yet acknowledged remotely.
    pub dirty: bool,
    /// The tenant the row belongs to.
    pub company_id: TenantId,
}

impl TransactionRecord {
    /// Start a draft for a locally created record.
    ///
    /// Shortcut for [RecordDraft] for discoverability.
    pub fn draft(id: &str, kind: TransactionKind, date: Date, amount_cents: i64) -> RecordDraft {
        RecordDraft {
            id: id.to_owned(),
            kind,
            date,
            amount_cents,
            time: None,
            datetime: None,
            description: String::new(),
            category: String::new(),
            client_name: String::new(),
            expense_type: None,
            source_device: String::new(),
            version: None,
        }
    }

    /// Whether the row has been soft deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A builder for locally created records.
///
/// Required fields are taken by [TransactionRecord::draft]; everything else
/// has a sensible default and can be set with the chained methods. The draft
/// is turned into a row by the replica store's local insert, which owns the
/// dirty-flag and tenant assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    /// Opaque unique identifier for the new record.
    pub id: RecordId,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// The calendar date the transaction happened on.
    pub date: Date,
    /// Monetary amount in minor units.
    pub amount_cents: i64,
    /// Optional clock time. Also feeds the default `datetime`.
    pub time: Option<Time>,
    /// Full timestamp. Defaults to `date` at `time` (or midnight) UTC.
    pub datetime: Option<OffsetDateTime>,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Free-form classification.
    pub category: String,
    /// The client or counterparty the transaction relates to.
    pub client_name: String,
    /// Expense classification; [DEFAULT_EXPENSE_TYPE] when unset.
    pub expense_type: Option<String>,
    /// Opaque identifier of the producing device.
    pub source_device: String,
    /// Starting version; 1 when unset.
    pub version: Option<i64>,
}

impl RecordDraft {
    /// Set the clock time of the transaction.
    pub fn time(mut self, time: Time) -> Self {
        self.time = Some(time);
        self
    }

    /// Set the full timestamp used for recency ordering.
    pub fn datetime(mut self, datetime: OffsetDateTime) -> Self {
        self.datetime = Some(datetime);
        self
    }

    /// Set the description.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set the category.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }

    /// Set the client name.
    pub fn client_name(mut self, client_name: &str) -> Self {
        self.client_name = client_name.to_owned();
        self
    }

    /// Set the expense classification.
    pub fn expense_type(mut self, expense_type: &str) -> Self {
        self.expense_type = Some(expense_type.to_owned());
        self
    }

    /// Set the producing device identifier.
    pub fn source_device(mut self, source_device: &str) -> Self {
        self.source_device = source_device.to_owned();
        self
    }

    /// Set the starting version counter.
    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    /// Finalize the draft into a row owned by `tenant`.
    ///
    /// Local creations are dirty until the sync driver acknowledges them.
    pub(crate) fn into_record(self, tenant: TenantId, now: OffsetDateTime) -> TransactionRecord {
        let datetime = self.datetime.unwrap_or_else(|| {
            self.date
                .with_time(self.time.unwrap_or(Time::MIDNIGHT))
                .assume_utc()
        });

        TransactionRecord {
            id: self.id,
            kind: self.kind,
            date: self.date,
            time: self.time,
            datetime,
            description: self.description,
            category: self.category,
            client_name: self.client_name,
            expense_type: self
                .expense_type
                .unwrap_or_else(|| DEFAULT_EXPENSE_TYPE.to_owned()),
            amount_cents: self.amount_cents,
            source_device: self.source_device,
            version: self.version.unwrap_or(1),
            updated_at: now,
            deleted_at: None,
            dirty: true,
            company_id: tenant,
        }
    }
}

/// The fields a local update may change, as an explicit partial merge.
///
/// Only fields that are `Some` are applied; everything else is left
/// unchanged. The replica store increments `version`, sets the dirty flag,
/// and refreshes `updated_at` for every applied patch regardless of which
/// fields it carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// Replace the transaction kind.
    pub kind: Option<TransactionKind>,
    /// Replace the calendar date.
    pub date: Option<Date>,
    /// Replace the clock time.
    pub time: Option<Time>,
    /// Replace the ordering timestamp.
    pub datetime: Option<OffsetDateTime>,
    /// Replace the description.
    pub description: Option<String>,
    /// Replace the category.
    pub category: Option<String>,
    /// Replace the client name.
    pub client_name: Option<String>,
    /// Replace the expense classification.
    pub expense_type: Option<String>,
    /// Replace the amount.
    pub amount_cents: Option<i64>,
    /// Replace the producing device identifier.
    pub source_device: Option<String>,
    /// `Some(Some(_))` sets the tombstone, `Some(None)` clears it, `None`
    /// leaves it untouched.
    pub deleted_at: Option<Option<OffsetDateTime>>,
}

impl RecordPatch {
    /// A patch that changes nothing by itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the amount.
    pub fn amount_cents(mut self, amount_cents: i64) -> Self {
        self.amount_cents = Some(amount_cents);
        self
    }

    /// Replace the description.
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// Replace the category.
    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_owned());
        self
    }

    /// Replace the client name.
    pub fn client_name(mut self, client_name: &str) -> Self {
        self.client_name = Some(client_name.to_owned());
        self
    }

    /// Replace the expense classification.
    pub fn expense_type(mut self, expense_type: &str) -> Self {
        self.expense_type = Some(expense_type.to_owned());
        self
    }

    /// Replace the transaction kind.
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Replace the calendar date.
    pub fn date(mut self, date: Date) -> Self {
        self.date = Some(date);
        self
    }

    /// Replace the ordering timestamp.
    pub fn datetime(mut self, datetime: OffsetDateTime) -> Self {
        self.datetime = Some(datetime);
        self
    }

    /// Replace the producing device identifier.
    pub fn source_device(mut self, source_device: &str) -> Self {
        self.source_device = Some(source_device.to_owned());
        self
    }

    /// Mark the record soft deleted as of `at`.
    pub fn soft_delete(mut self, at: OffsetDateTime) -> Self {
        self.deleted_at = Some(Some(at));
        self
    }

    /// Clear a previous soft delete.
    pub fn restore(mut self) -> Self {
        self.deleted_at = Some(None);
        self
    }

    /// Apply the present fields to `record`.
    ///
    /// Version, dirty flag, and `updated_at` are the replica store's
    /// responsibility, not the patch's.
    pub(crate) fn apply_to(self, record: &mut TransactionRecord) {
        if let Some(kind) = self.kind {
            record.kind = kind;
        }
        if let Some(date) = self.date {
            record.date = date;
        }
        if let Some(time) = self.time {
            record.time = Some(time);
        }
        if let Some(datetime) = self.datetime {
            record.datetime = datetime;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(client_name) = self.client_name {
            record.client_name = client_name;
        }
        if let Some(expense_type) = self.expense_type {
            record.expense_type = expense_type;
        }
        if let Some(amount_cents) = self.amount_cents {
            record.amount_cents = amount_cents;
        }
        if let Some(source_device) = self.source_device {
            record.source_device = source_device;
        }
        if let Some(deleted_at) = self.deleted_at {
            record.deleted_at = deleted_at;
        }
    }
}

#[cfg(test)]
mod record_tests {
    use time::{
        OffsetDateTime,
        macros::{date, datetime, time},
    };

    use crate::tenant::TenantId;

    use super::{DEFAULT_EXPENSE_TYPE, RecordPatch, TransactionKind, TransactionRecord};

    fn now() -> OffsetDateTime {
        datetime!(2024-05-01 12:00 UTC)
    }

    #[test]
    fn draft_applies_defaults() {
        let record = TransactionRecord::draft("t1", TransactionKind::Expense, date!(2024 - 05 - 01), 1250)
            .into_record(TenantId::new("acme"), now());

        assert_eq!(record.expense_type, DEFAULT_EXPENSE_TYPE);
        assert_eq!(record.version, 1);
        assert!(record.dirty, "locally created records must start dirty");
        assert_eq!(record.deleted_at, None);
    }

    #[test]
    fn draft_datetime_defaults_to_date_at_time() {
        let record = TransactionRecord::draft("t1", TransactionKind::Income, date!(2024 - 05 - 01), 1000)
            .time(time!(09:30))
            .into_record(TenantId::new("acme"), now());

        assert_eq!(record.datetime, datetime!(2024-05-01 09:30 UTC));
    }

    #[test]
    fn draft_datetime_defaults_to_midnight_without_time() {
        let record = TransactionRecord::draft("t1", TransactionKind::Income, date!(2024 - 05 - 01), 1000)
            .into_record(TenantId::new("acme"), now());

        assert_eq!(record.datetime, datetime!(2024-05-01 00:00 UTC));
    }

    #[test]
    fn draft_keeps_supplied_version() {
        let record = TransactionRecord::draft("t1", TransactionKind::Income, date!(2024 - 05 - 01), 1000)
            .version(7)
            .into_record(TenantId::new("acme"), now());

        assert_eq!(record.version, 7);
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut record =
            TransactionRecord::draft("t1", TransactionKind::Expense, date!(2024 - 05 - 01), 1250)
                .description("taxi")
                .category("travel")
                .into_record(TenantId::new("acme"), now());

        RecordPatch::new()
            .amount_cents(2000)
            .apply_to(&mut record);

        assert_eq!(record.amount_cents, 2000);
        assert_eq!(record.description, "taxi");
        assert_eq!(record.category, "travel");
    }

    #[test]
    fn patch_sets_and_clears_tombstone() {
        let mut record =
            TransactionRecord::draft("t1", TransactionKind::Expense, date!(2024 - 05 - 01), 1250)
                .into_record(TenantId::new("acme"), now());

        RecordPatch::new().soft_delete(now()).apply_to(&mut record);
        assert!(record.is_deleted());

        RecordPatch::new().restore().apply_to(&mut record);
        assert!(!record.is_deleted());
    }

    #[test]
    fn empty_patch_leaves_fields_unchanged() {
        let mut record =
            TransactionRecord::draft("t1", TransactionKind::Expense, date!(2024 - 05 - 01), 1250)
                .into_record(TenantId::new("acme"), now());
        let before = record.clone();

        RecordPatch::new().apply_to(&mut record);

        assert_eq!(record, before);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Income).unwrap(),
            "\"income\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionKind::Expense).unwrap(),
            "\"expense\""
        );
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = TransactionRecord::draft("t1", TransactionKind::Expense, date!(2024 - 05 - 01), 1250)
            .time(time!(09:30))
            .description("taxi")
            .source_device("device-a")
            .into_record(TenantId::new("acme"), now());

        let blob = serde_json::to_string(&record).unwrap();
        let parsed: TransactionRecord = serde_json::from_str(&blob).unwrap();

        assert_eq!(parsed, record);
    }
}
