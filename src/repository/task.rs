use diesel::prelude::*;

use pushkind_common::repository::errors::RepositoryResult;

use crate::domain::task::{ImportTask, NewImportTask};
use crate::domain::types::ImportTaskId;
use crate::models::task::{ImportTask as DbImportTask, NewImportTask as DbNewImportTask};
use crate::repository::{DieselRepository, ImportTaskReader, ImportTaskWriter};

impl ImportTaskReader for DieselRepository {
    fn get_import_task_by_id(&self, id: ImportTaskId) -> RepositoryResult<Option<ImportTask>> {
        use crate::schema::import_tasks;

        let mut conn = self.conn()?;

        let task = import_tasks::table
            .filter(import_tasks::id.eq(id.get()))
            .first::<DbImportTask>(&mut conn)
            .optional()?;

        Ok(task.map(TryInto::try_into).transpose()?)
    }
}

impl ImportTaskWriter for DieselRepository {
    fn create_import_task(&self, task: &NewImportTask) -> RepositoryResult<ImportTask> {
        use crate::schema::import_tasks;

        let mut conn = self.conn()?;
        let db_task: DbNewImportTask = task.into();

        let created = diesel::insert_into(import_tasks::table)
            .values(&db_task)
            .get_result::<DbImportTask>(&mut conn)?;

        Ok(created.try_into()?)
    }
}
