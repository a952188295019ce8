use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::category::{Category as DomainCategory, CategoryDraft};
use crate::domain::types::{CategoryName, ExternalId, Slug, SourceSlug, TypeConstraintError};

/// Diesel model representing the `categories` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::categories)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<i32>,
    pub is_active: bool,
    pub source: Option<String>,
    pub source_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Insertable/patchable form of [`Category`].
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::categories, treat_none_as_null = true)]
pub struct CategoryChanges<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub parent_id: Option<i32>,
    pub is_active: bool,
    pub source: Option<&'a str>,
    pub source_id: Option<&'a str>,
    pub updated_at: NaiveDateTime,
}

impl<'a> CategoryChanges<'a> {
    pub fn new(draft: &'a CategoryDraft, slug: &'a Slug, now: NaiveDateTime) -> Self {
        Self {
            name: draft.name.as_str(),
            slug: slug.as_str(),
            description: draft.description.as_deref(),
            parent_id: draft.parent_id.map(|id| id.get()),
            is_active: draft.is_active,
            source: draft.source.as_ref().map(|s| s.as_str()),
            source_id: draft.source_id.as_ref().map(|s| s.as_str()),
            updated_at: now,
        }
    }
}

impl TryFrom<Category> for DomainCategory {
    type Error = TypeConstraintError;

    fn try_from(category: Category) -> Result<Self, Self::Error> {
        Ok(Self {
            id: category.id.try_into()?,
            name: CategoryName::new(category.name)?,
            slug: Slug::new(category.slug)?,
            description: category.description,
            parent_id: category.parent_id.map(TryInto::try_into).transpose()?,
            is_active: category.is_active,
            source: category.source.map(SourceSlug::new).transpose()?,
            source_id: category.source_id.map(ExternalId::new).transpose()?,
            created_at: category.created_at,
            updated_at: category.updated_at,
        })
    }
}
