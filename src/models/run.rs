use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::run::{
    ImportRun as DomainImportRun, ImportRunItem as DomainImportRunItem, ImportRunStatus,
    ItemStatus, ItemType, NewImportRunItem as DomainNewImportRunItem, RunCounters,
};
use crate::domain::types::{ItemCount, TypeConstraintError};

/// Diesel model representing the `import_runs` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::import_runs)]
pub struct ImportRun {
    pub id: i32,
    pub import_task_id: i32,
    pub status: String,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub total_items: i32,
    pub processed_items: i32,
    pub created_items: i32,
    pub updated_items: i32,
    pub failed_items: i32,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::import_runs)]
pub struct NewImportRun<'a> {
    pub import_task_id: i32,
    pub status: &'a str,
}

/// Diesel model representing the `import_run_items` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::import_run_items)]
pub struct ImportRunItem {
    pub id: i32,
    pub import_run_id: i32,
    pub source_id: Option<String>,
    pub payload: String,
    pub item_type: String,
    pub local_id: Option<i32>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::import_run_items)]
pub struct NewImportRunItem<'a> {
    pub import_run_id: i32,
    pub source_id: Option<&'a str>,
    pub payload: &'a str,
    pub item_type: &'a str,
    pub local_id: Option<i32>,
    pub status: &'a str,
    pub error_message: Option<&'a str>,
}

impl TryFrom<ImportRun> for DomainImportRun {
    type Error = TypeConstraintError;

    fn try_from(run: ImportRun) -> Result<Self, Self::Error> {
        Ok(Self {
            id: run.id.try_into()?,
            import_task_id: run.import_task_id.try_into()?,
            status: ImportRunStatus::try_from(run.status.as_str())?,
            counters: RunCounters {
                total: ItemCount::new(run.total_items)?,
                processed: ItemCount::new(run.processed_items)?,
                created: ItemCount::new(run.created_items)?,
                updated: ItemCount::new(run.updated_items)?,
                failed: ItemCount::new(run.failed_items)?,
            },
            error_message: run.error_message,
            started_at: run.started_at,
            finished_at: run.finished_at,
            created_at: run.created_at,
            updated_at: run.updated_at,
        })
    }
}

impl TryFrom<ImportRunItem> for DomainImportRunItem {
    type Error = TypeConstraintError;

    fn try_from(item: ImportRunItem) -> Result<Self, Self::Error> {
        Ok(Self {
            id: item.id.try_into()?,
            import_run_id: item.import_run_id.try_into()?,
            source_id: item.source_id,
            payload: item.payload,
            item_type: ItemType::try_from(item.item_type.as_str())?,
            local_id: item.local_id,
            status: ItemStatus::try_from(item.status.as_str())?,
            error_message: item.error_message,
            created_at: item.created_at,
        })
    }
}

impl<'a> NewImportRunItem<'a> {
    pub fn from_domain(run_id: i32, item: &'a DomainNewImportRunItem) -> Self {
        Self {
            import_run_id: run_id,
            source_id: item.source_id.as_deref(),
            payload: &item.payload,
            item_type: item.item_type.as_str(),
            local_id: item.local_id,
            status: item.status.as_str(),
            error_message: item.error_message.as_deref(),
        }
    }
}
