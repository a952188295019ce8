use chrono::NaiveDateTime;
use diesel::prelude::*;

use pushkind_common::repository::errors::{RepositoryError, RepositoryResult};

use crate::domain::run::{
    CounterDelta, ImportRun, ImportRunItem, ImportRunStatus, NewImportRunItem,
};
use crate::domain::types::{ImportRunId, ImportTaskId};
use crate::models::run::{
    ImportRun as DbImportRun, ImportRunItem as DbImportRunItem, NewImportRun as DbNewImportRun,
    NewImportRunItem as DbNewImportRunItem,
};
use crate::repository::{
    DieselRepository, ImportRunItemReader, ImportRunReader, ImportRunWriter, RunItemListQuery,
};

impl ImportRunReader for DieselRepository {
    fn get_import_run_by_id(&self, id: ImportRunId) -> RepositoryResult<Option<ImportRun>> {
        use crate::schema::import_runs;

        let mut conn = self.conn()?;

        let run = import_runs::table
            .filter(import_runs::id.eq(id.get()))
            .first::<DbImportRun>(&mut conn)
            .optional()?;

        Ok(run.map(TryInto::try_into).transpose()?)
    }

    fn list_import_runs(&self, task_id: ImportTaskId) -> RepositoryResult<Vec<ImportRun>> {
        use crate::schema::import_runs;

        let mut conn = self.conn()?;

        let runs = import_runs::table
            .filter(import_runs::import_task_id.eq(task_id.get()))
            .order(import_runs::id.desc())
            .load::<DbImportRun>(&mut conn)?
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<ImportRun>, _>>()?;

        Ok(runs)
    }
}

impl ImportRunWriter for DieselRepository {
    fn create_import_run(&self, task_id: ImportTaskId) -> RepositoryResult<ImportRun> {
        use crate::schema::import_runs;

        let mut conn = self.conn()?;

        let created = diesel::insert_into(import_runs::table)
            .values(DbNewImportRun {
                import_task_id: task_id.get(),
                status: ImportRunStatus::Pending.as_str(),
            })
            .get_result::<DbImportRun>(&mut conn)?;

        Ok(created.try_into()?)
    }

    fn start_import_run(
        &self,
        id: ImportRunId,
        started_at: NaiveDateTime,
    ) -> RepositoryResult<Option<ImportRun>> {
        use crate::schema::import_runs;

        let mut conn = self.conn()?;

        // The status filter makes the pending check and the transition one
        // statement, so two workers cannot both start the same run.
        let started = diesel::update(
            import_runs::table
                .filter(import_runs::id.eq(id.get()))
                .filter(import_runs::status.eq(ImportRunStatus::Pending.as_str())),
        )
        .set((
            import_runs::status.eq(ImportRunStatus::Running.as_str()),
            import_runs::started_at.eq(Some(started_at)),
            import_runs::updated_at.eq(diesel::dsl::now),
        ))
        .get_result::<DbImportRun>(&mut conn)
        .optional()?;

        Ok(started.map(TryInto::try_into).transpose()?)
    }

    fn add_import_run_total(&self, id: ImportRunId, delta: i32) -> RepositoryResult<ImportRun> {
        use crate::schema::import_runs;

        let mut conn = self.conn()?;

        let updated = diesel::update(import_runs::table.filter(import_runs::id.eq(id.get())))
            .set((
                import_runs::total_items.eq(import_runs::total_items + delta.max(0)),
                import_runs::updated_at.eq(diesel::dsl::now),
            ))
            .get_result::<DbImportRun>(&mut conn)?;

        Ok(updated.try_into()?)
    }

    fn record_import_run_item(
        &self,
        id: ImportRunId,
        item: &NewImportRunItem,
    ) -> RepositoryResult<ImportRunItem> {
        use crate::schema::{import_run_items, import_runs};

        let mut conn = self.conn()?;
        let delta = CounterDelta::for_item(item);

        let inserted = conn.immediate_transaction::<_, RepositoryError, _>(|conn| {
            let inserted = diesel::insert_into(import_run_items::table)
                .values(DbNewImportRunItem::from_domain(id.get(), item))
                .get_result::<DbImportRunItem>(conn)?;

            if !delta.is_empty() {
                let affected =
                    diesel::update(import_runs::table.filter(import_runs::id.eq(id.get())))
                        .set((
                            import_runs::processed_items
                                .eq(import_runs::processed_items + delta.processed),
                            import_runs::created_items
                                .eq(import_runs::created_items + delta.created),
                            import_runs::updated_items
                                .eq(import_runs::updated_items + delta.updated),
                            import_runs::failed_items.eq(import_runs::failed_items + delta.failed),
                            import_runs::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)?;
                if affected == 0 {
                    return Err(diesel::result::Error::NotFound.into());
                }
            }

            Ok(inserted)
        })?;

        Ok(inserted.try_into()?)
    }

    fn finish_import_run(
        &self,
        id: ImportRunId,
        status: ImportRunStatus,
        error_message: Option<&str>,
        finished_at: NaiveDateTime,
    ) -> RepositoryResult<ImportRun> {
        use crate::schema::import_runs;

        let mut conn = self.conn()?;

        let finished = diesel::update(import_runs::table.filter(import_runs::id.eq(id.get())))
            .set((
                import_runs::status.eq(status.as_str()),
                import_runs::error_message.eq(error_message),
                import_runs::finished_at.eq(Some(finished_at)),
                import_runs::updated_at.eq(diesel::dsl::now),
            ))
            .get_result::<DbImportRun>(&mut conn)?;

        Ok(finished.try_into()?)
    }
}

impl ImportRunItemReader for DieselRepository {
    fn list_run_items(
        &self,
        query: RunItemListQuery,
    ) -> RepositoryResult<(usize, Vec<ImportRunItem>)> {
        use crate::schema::import_run_items;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = import_run_items::table
                .filter(import_run_items::import_run_id.eq(query.run_id.get()))
                .into_boxed::<diesel::sqlite::Sqlite>();
            if let Some(status) = query.status {
                items = items.filter(import_run_items::status.eq(status.as_str()));
            }
            if let Some(item_type) = query.item_type {
                items = items.filter(import_run_items::item_type.eq(item_type.as_str()));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let mut items = query_builder();
        if let Some(pagination) = &query.pagination {
            let offset = ((pagination.page.max(1) - 1) * pagination.per_page) as i64;
            let limit = pagination.per_page as i64;
            items = items.offset(offset).limit(limit);
        }

        let items = items
            .order(import_run_items::id.asc())
            .load::<DbImportRunItem>(&mut conn)?
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<ImportRunItem>, _>>()?;

        Ok((total, items))
    }
}
