use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::task::{
    CategorySelector, ImportKind, ImportTask as DomainImportTask,
    NewImportTask as DomainNewImportTask,
};
use crate::domain::types::{TaskName, TypeConstraintError};

/// Diesel model representing the `import_tasks` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::import_tasks)]
pub struct ImportTask {
    pub id: i32,
    pub name: String,
    pub source_config_id: i32,
    pub target_category_id: Option<i32>,
    pub seller_id: i32,
    pub import_type: String,
    pub source_category_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::import_tasks)]
pub struct NewImportTask<'a> {
    pub name: &'a str,
    pub source_config_id: i32,
    pub target_category_id: Option<i32>,
    pub seller_id: i32,
    pub import_type: &'a str,
    pub source_category_id: Option<&'a str>,
}

impl TryFrom<ImportTask> for DomainImportTask {
    type Error = TypeConstraintError;

    fn try_from(task: ImportTask) -> Result<Self, Self::Error> {
        Ok(Self {
            id: task.id.try_into()?,
            name: TaskName::new(task.name)?,
            source_config_id: task.source_config_id.try_into()?,
            target_category_id: task.target_category_id.map(TryInto::try_into).transpose()?,
            seller_id: task.seller_id.try_into()?,
            kind: ImportKind::try_from(task.import_type.as_str())?,
            selector: CategorySelector::from_column(task.source_category_id)?,
            created_at: task.created_at,
            updated_at: task.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewImportTask> for NewImportTask<'a> {
    fn from(task: &'a DomainNewImportTask) -> Self {
        Self {
            name: task.name.as_str(),
            source_config_id: task.source_config_id.get(),
            target_category_id: task.target_category_id.map(|id| id.get()),
            seller_id: task.seller_id.get(),
            import_type: task.kind.as_str(),
            source_category_id: task.selector.to_column(),
        }
    }
}
