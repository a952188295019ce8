use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use pushkind_common::repository::errors::{RepositoryError, RepositoryResult};

use crate::domain::category::{Category, CategoryDraft};
use crate::domain::slug::unique_slug;
use crate::domain::types::{CategoryId, ExternalId, SourceSlug};
use crate::models::category::{Category as DbCategory, CategoryChanges};
use crate::repository::{CategoryReader, CategoryWriter, DieselRepository};

fn category_slug_taken(
    conn: &mut SqliteConnection,
    slug: &str,
    exclude: Option<CategoryId>,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::categories;

    let mut query = categories::table
        .filter(categories::slug.eq(slug))
        .into_boxed::<diesel::sqlite::Sqlite>();
    if let Some(id) = exclude {
        query = query.filter(categories::id.ne(id.get()));
    }
    let count = query.count().get_result::<i64>(conn)?;
    Ok(count > 0)
}

impl CategoryReader for DieselRepository {
    fn get_category_by_id(&self, id: CategoryId) -> RepositoryResult<Option<Category>> {
        use crate::schema::categories;

        let mut conn = self.conn()?;

        let category = categories::table
            .filter(categories::id.eq(id.get()))
            .first::<DbCategory>(&mut conn)
            .optional()?;

        Ok(category.map(TryInto::try_into).transpose()?)
    }

    fn find_category_by_source(
        &self,
        source: &SourceSlug,
        source_id: &ExternalId,
    ) -> RepositoryResult<Option<Category>> {
        use crate::schema::categories;

        let mut conn = self.conn()?;

        let category = categories::table
            .filter(categories::source.eq(source.as_str()))
            .filter(categories::source_id.eq(source_id.as_str()))
            .first::<DbCategory>(&mut conn)
            .optional()?;

        Ok(category.map(TryInto::try_into).transpose()?)
    }

    fn is_category_slug_taken(
        &self,
        slug: &str,
        exclude: Option<CategoryId>,
    ) -> RepositoryResult<bool> {
        let mut conn = self.conn()?;
        Ok(category_slug_taken(&mut conn, slug, exclude)?)
    }
}

impl CategoryWriter for DieselRepository {
    fn save_category(
        &self,
        existing: Option<CategoryId>,
        draft: &CategoryDraft,
    ) -> RepositoryResult<Category> {
        use crate::schema::categories;

        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();

        // IMMEDIATE takes the write lock up front, so the slug check and the
        // write cannot interleave with another run.
        let saved = conn.immediate_transaction::<_, RepositoryError, _>(|conn| {
            let slug = unique_slug::<RepositoryError, _>(&draft.slug_base, |candidate| {
                Ok(category_slug_taken(conn, candidate, existing)?)
            })?;
            let changes = CategoryChanges::new(draft, &slug, now);

            let saved = match existing {
                Some(id) => diesel::update(categories::table.filter(categories::id.eq(id.get())))
                    .set(&changes)
                    .get_result::<DbCategory>(conn)?,
                None => diesel::insert_into(categories::table)
                    .values(&changes)
                    .get_result::<DbCategory>(conn)?,
            };
            Ok(saved)
        })?;

        Ok(saved.try_into()?)
    }

    fn set_category_parent(
        &self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> RepositoryResult<usize> {
        use crate::schema::categories;

        let mut conn = self.conn()?;

        let affected = diesel::update(categories::table.filter(categories::id.eq(id.get())))
            .set((
                categories::parent_id.eq(parent_id.map(|p| p.get())),
                categories::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut conn)?;

        Ok(affected)
    }
}
