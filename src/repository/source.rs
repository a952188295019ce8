use diesel::prelude::*;

use pushkind_common::repository::errors::RepositoryResult;

use crate::domain::source::{NewSourceConfig, SourceConfig};
use crate::domain::types::{SourceConfigId, SourceSlug};
use crate::models::source::{NewSource as DbNewSource, Source as DbSource};
use crate::repository::{DieselRepository, SourceReader, SourceWriter};

impl SourceReader for DieselRepository {
    fn get_source_by_id(&self, id: SourceConfigId) -> RepositoryResult<Option<SourceConfig>> {
        use crate::schema::sources;

        let mut conn = self.conn()?;

        let source = sources::table
            .filter(sources::id.eq(id.get()))
            .first::<DbSource>(&mut conn)
            .optional()?;

        Ok(source.map(TryInto::try_into).transpose()?)
    }

    fn get_source_by_slug(&self, slug: &SourceSlug) -> RepositoryResult<Option<SourceConfig>> {
        use crate::schema::sources;

        let mut conn = self.conn()?;

        let source = sources::table
            .filter(sources::slug.eq(slug.as_str()))
            .first::<DbSource>(&mut conn)
            .optional()?;

        Ok(source.map(TryInto::try_into).transpose()?)
    }
}

impl SourceWriter for DieselRepository {
    fn create_source(&self, source: &NewSourceConfig) -> RepositoryResult<SourceConfig> {
        use crate::schema::sources;

        let mut conn = self.conn()?;
        let db_source: DbNewSource = source.into();

        let created = diesel::insert_into(sources::table)
            .values(&db_source)
            .get_result::<DbSource>(&mut conn)?;

        Ok(created.try_into()?)
    }
}
