use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::domain::types::{
    ExternalId, ImportRunId, ImportRunItemId, ImportTaskId, ItemCount, TypeConstraintError,
};

/// Lifecycle of an import run: `pending -> running -> completed | failed`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImportRunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ImportRunStatus {
    /// String representation used in persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl Display for ImportRunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ImportRunStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "import run status: {other}"
            ))),
        }
    }
}

/// Item counters of a run.
///
/// `processed == created + updated + failed` holds at every committed state.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RunCounters {
    pub total: ItemCount,
    pub processed: ItemCount,
    pub created: ItemCount,
    pub updated: ItemCount,
    pub failed: ItemCount,
}

impl RunCounters {
    pub fn is_consistent(&self) -> bool {
        self.processed.get() == self.created.get() + self.updated.get() + self.failed.get()
    }
}

/// Counter increments caused by appending one audit item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub processed: i32,
    pub created: i32,
    pub updated: i32,
    pub failed: i32,
}

impl CounterDelta {
    /// Increments for `item`. Brand sub-items leave every counter untouched.
    pub fn for_item(item: &NewImportRunItem) -> Self {
        if !item.item_type.is_counted() {
            return Self::default();
        }
        let mut delta = Self {
            processed: 1,
            ..Self::default()
        };
        match item.status {
            ItemStatus::Created => delta.created = 1,
            ItemStatus::Updated => delta.updated = 1,
            ItemStatus::Failed => delta.failed = 1,
        }
        delta
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One timestamped execution of an import task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportRun {
    pub id: ImportRunId,
    pub import_task_id: ImportTaskId,
    pub status: ImportRunStatus,
    pub counters: RunCounters,
    pub error_message: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Kind of local entity an audit item refers to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Category,
    Product,
    Brand,
}

impl ItemType {
    /// String representation used in persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Product => "product",
            Self::Brand => "brand",
        }
    }

    /// Brand rows are incidental to product records and do not move the run
    /// counters.
    pub const fn is_counted(self) -> bool {
        !matches!(self, Self::Brand)
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ItemType {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "category" => Ok(Self::Category),
            "product" => Ok(Self::Product),
            "brand" => Ok(Self::Brand),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "import item type: {other}"
            ))),
        }
    }
}

/// Result of processing one source record.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Created,
    Updated,
    Failed,
}

impl ItemStatus {
    /// String representation used in persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Failed => "failed",
        }
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ItemStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "failed" => Ok(Self::Failed),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "import item status: {other}"
            ))),
        }
    }
}

/// Whether a reconciler inserted a new local record or updated a matched one.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Created,
    Updated,
}

impl From<UpsertAction> for ItemStatus {
    fn from(value: UpsertAction) -> Self {
        match value {
            UpsertAction::Created => Self::Created,
            UpsertAction::Updated => Self::Updated,
        }
    }
}

/// Append-only audit record for one attempted source record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportRunItem {
    pub id: ImportRunItemId,
    pub import_run_id: ImportRunId,
    /// Source id as sent by the source; `None` when the record carried no
    /// usable id.
    pub source_id: Option<String>,
    /// Raw source payload kept for debugging and replay.
    pub payload: String,
    pub item_type: ItemType,
    pub local_id: Option<i32>,
    pub status: ItemStatus,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Data required to append an [`ImportRunItem`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewImportRunItem {
    pub source_id: Option<String>,
    pub payload: String,
    pub item_type: ItemType,
    pub local_id: Option<i32>,
    pub status: ItemStatus,
    pub error_message: Option<String>,
}

impl NewImportRunItem {
    /// Item for a record that was reconciled into local id `local_id`.
    pub fn succeeded(
        item_type: ItemType,
        source_id: Option<&ExternalId>,
        payload: &serde_json::Value,
        local_id: i32,
        action: UpsertAction,
    ) -> Self {
        Self {
            source_id: source_id.map(|id| id.as_str().to_string()),
            payload: payload.to_string(),
            item_type,
            local_id: Some(local_id),
            status: action.into(),
            error_message: None,
        }
    }

    /// Item for a record whose conversion failed.
    pub fn failed(
        item_type: ItemType,
        source_id: Option<&ExternalId>,
        payload: &serde_json::Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.map(|id| id.as_str().to_string()),
            payload: payload.to_string(),
            item_type,
            local_id: None,
            status: ItemStatus::Failed,
            error_message: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!ImportRunStatus::Pending.is_terminal());
        assert!(!ImportRunStatus::Running.is_terminal());
        assert!(ImportRunStatus::Completed.is_terminal());
        assert!(ImportRunStatus::Failed.is_terminal());
    }

    #[test]
    fn failed_item_has_no_local_id() {
        let payload = serde_json::json!({ "id": 5 });
        let item = NewImportRunItem::failed(
            ItemType::Product,
            Some(&ExternalId::new("5").unwrap()),
            &payload,
            "bad price",
        );
        assert_eq!(item.status, ItemStatus::Failed);
        assert_eq!(item.local_id, None);
        assert_eq!(item.source_id.as_deref(), Some("5"));
        assert_eq!(item.payload, r#"{"id":5}"#);
    }

    #[test]
    fn brand_items_do_not_count() {
        assert!(ItemType::Category.is_counted());
        assert!(ItemType::Product.is_counted());
        assert!(!ItemType::Brand.is_counted());

        let payload = serde_json::json!({ "name": "Acme" });
        let brand = NewImportRunItem::succeeded(
            ItemType::Brand,
            None,
            &payload,
            3,
            UpsertAction::Created,
        );
        assert!(CounterDelta::for_item(&brand).is_empty());
    }

    #[test]
    fn delta_keeps_processed_equal_to_outcomes() {
        let payload = serde_json::json!({});
        let updated = NewImportRunItem::succeeded(
            ItemType::Category,
            None,
            &payload,
            1,
            UpsertAction::Updated,
        );
        let delta = CounterDelta::for_item(&updated);
        assert_eq!(delta.processed, 1);
        assert_eq!(delta.updated, 1);
        assert_eq!(delta.created + delta.failed, 0);
    }
}
