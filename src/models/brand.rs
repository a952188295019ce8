use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::brand::{Brand as DomainBrand, NewBrand as DomainNewBrand};
use crate::domain::types::{BrandName, Slug, TypeConstraintError};

/// Diesel model representing the `brands` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::brands)]
pub struct Brand {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::brands)]
pub struct NewBrand<'a> {
    pub name: &'a str,
    pub slug: &'a str,
}

impl TryFrom<Brand> for DomainBrand {
    type Error = TypeConstraintError;

    fn try_from(brand: Brand) -> Result<Self, Self::Error> {
        Ok(Self {
            id: brand.id.try_into()?,
            name: BrandName::new(brand.name)?,
            slug: Slug::new(brand.slug)?,
            created_at: brand.created_at,
            updated_at: brand.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewBrand> for NewBrand<'a> {
    fn from(brand: &'a DomainNewBrand) -> Self {
        Self {
            name: brand.name.as_str(),
            slug: brand.slug.as_str(),
        }
    }
}
