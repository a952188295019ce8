//! Reconciliation of external category records into the local tree.

use std::collections::HashSet;

use crate::domain::category::{Category, CategoryDraft};
use crate::domain::external::{CategoryNode, ExternalCategory};
use crate::domain::run::UpsertAction;
use crate::domain::slug::base_slug;
use crate::domain::source::SourceConfig;
use crate::domain::task::ImportTask;
use crate::domain::types::{CategoryId, CategoryName, ExternalId};
use crate::repository::{CategoryReader, CategoryWriter};
use crate::services::errors::ConversionError;

/// Selects `target` and all of its transitive descendants from a flat list.
///
/// The first scan collects the target and its direct children, then the scan
/// repeats until the included set stops growing, so descendants are found at
/// any depth whatever the order of `records`. The result keeps input order.
pub fn filter_subtree<T: CategoryNode + Clone>(records: &[T], target: &ExternalId) -> Vec<T> {
    let mut included: HashSet<ExternalId> = HashSet::from([target.clone()]);

    for record in records {
        if let Some(id) = record.external_id() {
            if record.external_parent_id().as_ref() == Some(target) {
                included.insert(id);
            }
        }
    }

    loop {
        let before = included.len();
        for record in records {
            if let (Some(id), Some(parent)) = (record.external_id(), record.external_parent_id()) {
                if included.contains(&parent) {
                    included.insert(id);
                }
            }
        }
        if included.len() == before {
            break;
        }
    }

    records
        .iter()
        .filter(|record| {
            record
                .external_id()
                .is_some_and(|id| included.contains(&id))
        })
        .cloned()
        .collect()
}

/// Result of reconciling one category record.
#[derive(Debug, Clone)]
pub struct CategoryOutcome {
    pub category: Category,
    pub action: UpsertAction,
    /// External parent that was not imported yet. The link is resolved again
    /// once every record of the run has been reconciled.
    pub pending_parent: Option<ExternalId>,
}

pub struct CategoryReconciler<'a, R> {
    repo: &'a R,
    source: &'a SourceConfig,
    task: &'a ImportTask,
}

impl<'a, R> CategoryReconciler<'a, R>
where
    R: CategoryReader + CategoryWriter,
{
    pub fn new(repo: &'a R, source: &'a SourceConfig, task: &'a ImportTask) -> Self {
        Self { repo, source, task }
    }

    /// Creates or updates the local category matched by
    /// `(source slug, record.id)`.
    pub fn reconcile(&self, record: &ExternalCategory) -> Result<CategoryOutcome, ConversionError> {
        let name = CategoryName::new(record.name.as_str())?;
        let existing = self
            .repo
            .find_category_by_source(&self.source.slug, &record.id)?;

        let (parent_id, pending_parent) = match &record.parent_id {
            Some(parent) if parent != &record.id => {
                match self.repo.find_category_by_source(&self.source.slug, parent)? {
                    Some(local) => (Some(local.id), None),
                    None => (None, Some(parent.clone())),
                }
            }
            _ => (self.task.target_category_id, None),
        };

        let draft = CategoryDraft {
            name,
            slug_base: base_slug(record.slug.as_deref(), &record.name, "category"),
            description: record
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            parent_id,
            is_active: existing.as_ref().is_none_or(|c| c.is_active),
            source: Some(self.source.slug.clone()),
            source_id: Some(record.id.clone()),
        };

        let action = if existing.is_some() {
            UpsertAction::Updated
        } else {
            UpsertAction::Created
        };
        let category = self
            .repo
            .save_category(existing.map(|c| c.id), &draft)?;

        Ok(CategoryOutcome {
            category,
            action,
            pending_parent,
        })
    }

    /// Second pass over children whose parent was missing when they were
    /// reconciled. Links that still cannot be resolved stay empty.
    ///
    /// Returns the number of links that were resolved.
    pub fn resolve_deferred_parents(&self, deferred: &[(CategoryId, ExternalId)]) -> usize {
        let mut resolved = 0;
        for (category_id, parent) in deferred {
            match self.repo.find_category_by_source(&self.source.slug, parent) {
                Ok(Some(local)) => match self.repo.set_category_parent(*category_id, Some(local.id))
                {
                    Ok(_) => resolved += 1,
                    Err(e) => {
                        log::error!("Failed to link category {category_id} to parent {parent}: {e}");
                    }
                },
                Ok(None) => {
                    log::warn!(
                        "Parent {parent} of category {category_id} is not in source {}, leaving it without parent",
                        self.source.slug
                    );
                }
                Err(e) => {
                    log::error!("Failed to look up parent {parent} of category {category_id}: {e}");
                }
            }
        }
        resolved
    }
}
