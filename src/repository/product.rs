use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use pushkind_common::repository::errors::{RepositoryError, RepositoryResult};

use crate::domain::product::{
    Product, ProductChildren, ProductDetails, ProductDraft, ProductImage, ProductVariant,
};
use crate::domain::run::UpsertAction;
use crate::domain::slug::unique_slug;
use crate::domain::types::{ExternalId, ProductId, SourceSlug, StoredPath};
use crate::models::product::{
    NewProductImage as DbNewProductImage, NewProductVariant as DbNewProductVariant,
    Product as DbProduct, ProductChanges, ProductImage as DbProductImage,
    ProductVariant as DbProductVariant,
};
use crate::repository::{DieselRepository, ProductReader, ProductWriter, SavedProduct, TxError};

fn product_slug_taken(
    conn: &mut SqliteConnection,
    slug: &str,
    exclude: Option<ProductId>,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::products;

    let mut query = products::table
        .filter(products::slug.eq(slug))
        .into_boxed::<diesel::sqlite::Sqlite>();
    if let Some(id) = exclude {
        query = query.filter(products::id.ne(id.get()));
    }
    let count = query.count().get_result::<i64>(conn)?;
    Ok(count > 0)
}

impl ProductReader for DieselRepository {
    fn get_product_by_id(&self, id: ProductId) -> RepositoryResult<Option<Product>> {
        use crate::schema::products;

        let mut conn = self.conn()?;

        let product = products::table
            .filter(products::id.eq(id.get()))
            .first::<DbProduct>(&mut conn)
            .optional()?;

        Ok(product.map(TryInto::try_into).transpose()?)
    }

    fn find_product_by_source(
        &self,
        source: &SourceSlug,
        source_id: &ExternalId,
    ) -> RepositoryResult<Option<Product>> {
        use crate::schema::products;

        let mut conn = self.conn()?;

        let product = products::table
            .filter(products::source.eq(source.as_str()))
            .filter(products::source_id.eq(source_id.as_str()))
            .first::<DbProduct>(&mut conn)
            .optional()?;

        Ok(product.map(TryInto::try_into).transpose()?)
    }

    fn get_product_details(&self, id: ProductId) -> RepositoryResult<Option<ProductDetails>> {
        use crate::schema::{product_images, product_variants, products};

        let mut conn = self.conn()?;

        let Some(product) = products::table
            .filter(products::id.eq(id.get()))
            .first::<DbProduct>(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };

        let images = product_images::table
            .filter(product_images::product_id.eq(id.get()))
            .order((product_images::sort_order.asc(), product_images::id.asc()))
            .load::<DbProductImage>(&mut conn)?
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<ProductImage>, _>>()?;

        let variants = product_variants::table
            .filter(product_variants::product_id.eq(id.get()))
            .order(product_variants::id.asc())
            .load::<DbProductVariant>(&mut conn)?
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<ProductVariant>, _>>()?;

        Ok(Some(ProductDetails {
            product: product.try_into()?,
            images,
            variants,
        }))
    }

    fn is_product_slug_taken(
        &self,
        slug: &str,
        exclude: Option<ProductId>,
    ) -> RepositoryResult<bool> {
        let mut conn = self.conn()?;
        Ok(product_slug_taken(&mut conn, slug, exclude)?)
    }
}

impl ProductWriter for DieselRepository {
    fn save_product<E, F>(
        &self,
        existing: Option<ProductId>,
        draft: &ProductDraft,
        children: F,
    ) -> Result<SavedProduct, E>
    where
        F: FnOnce(&Product) -> Result<ProductChildren, E>,
        E: From<RepositoryError>,
    {
        use crate::schema::{product_images, product_variants, products};

        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();

        let saved = conn.immediate_transaction::<_, TxError<E>, _>(|conn| {
            let slug = unique_slug::<TxError<E>, _>(&draft.slug_base, |candidate| {
                Ok(product_slug_taken(conn, candidate, existing)?)
            })?;
            let changes = ProductChanges::new(draft, &slug, now);

            let (row, action, replaced_images) = match existing {
                Some(id) => {
                    let replaced = product_images::table
                        .filter(product_images::product_id.eq(id.get()))
                        .select(product_images::path)
                        .load::<String>(conn)?;
                    diesel::delete(
                        product_images::table.filter(product_images::product_id.eq(id.get())),
                    )
                    .execute(conn)?;
                    diesel::delete(
                        product_variants::table
                            .filter(product_variants::product_id.eq(id.get())),
                    )
                    .execute(conn)?;
                    let row = diesel::update(products::table.filter(products::id.eq(id.get())))
                        .set(&changes)
                        .get_result::<DbProduct>(conn)?;
                    (row, UpsertAction::Updated, replaced)
                }
                None => {
                    let row = diesel::insert_into(products::table)
                        .values(&changes)
                        .get_result::<DbProduct>(conn)?;
                    (row, UpsertAction::Created, Vec::new())
                }
            };

            let product: Product = row.try_into()?;
            let ProductChildren { images, variants } =
                children(&product).map_err(TxError::Caller)?;

            let image_rows: Vec<DbNewProductImage> = images
                .iter()
                .map(|image| DbNewProductImage::from_domain(product.id.get(), image))
                .collect();
            if !image_rows.is_empty() {
                diesel::insert_into(product_images::table)
                    .values(&image_rows)
                    .execute(conn)?;
            }

            let variant_rows: Vec<DbNewProductVariant> = variants
                .iter()
                .map(|variant| DbNewProductVariant::from_domain(product.id.get(), variant))
                .collect();
            if !variant_rows.is_empty() {
                diesel::insert_into(product_variants::table)
                    .values(&variant_rows)
                    .execute(conn)?;
            }

            let replaced_images = replaced_images
                .into_iter()
                .map(StoredPath::new)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(SavedProduct {
                product,
                action,
                replaced_images,
            })
        });

        saved.map_err(TxError::into_caller)
    }
}
