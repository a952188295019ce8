use diesel::prelude::*;

use pushkind_common::repository::errors::{RepositoryError, RepositoryResult};

use crate::domain::brand::{Brand, NewBrand};
use crate::domain::run::UpsertAction;
use crate::domain::types::Slug;
use crate::models::brand::{Brand as DbBrand, NewBrand as DbNewBrand};
use crate::repository::{BrandReader, BrandWriter, DieselRepository};

impl BrandReader for DieselRepository {
    fn find_brand_by_slug(&self, slug: &Slug) -> RepositoryResult<Option<Brand>> {
        use crate::schema::brands;

        let mut conn = self.conn()?;

        let brand = brands::table
            .filter(brands::slug.eq(slug.as_str()))
            .first::<DbBrand>(&mut conn)
            .optional()?;

        Ok(brand.map(TryInto::try_into).transpose()?)
    }
}

impl BrandWriter for DieselRepository {
    fn upsert_brand(&self, brand: &NewBrand) -> RepositoryResult<(Brand, UpsertAction)> {
        use crate::schema::brands;

        let mut conn = self.conn()?;

        let (saved, action) = conn.immediate_transaction::<_, RepositoryError, _>(|conn| {
            let existing = brands::table
                .filter(brands::slug.eq(brand.slug.as_str()))
                .first::<DbBrand>(conn)
                .optional()?;
            if let Some(existing) = existing {
                return Ok((existing, UpsertAction::Updated));
            }
            let created = diesel::insert_into(brands::table)
                .values(DbNewBrand::from(brand))
                .get_result::<DbBrand>(conn)?;
            Ok((created, UpsertAction::Created))
        })?;

        Ok((saved.try_into()?, action))
    }
}
