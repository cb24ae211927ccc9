//! Index Synchronizer
//!
//! Turns a committed [`ChangeSet`] into an [`IndexBatch`]. Documents are always
//! rebuilt whole from the committed state, so applying batches never depends on
//! earlier deltas:
//!
//! - touched content is re-indexed, or removed when it is no longer published,
//!   placed or present
//! - touched locations re-index the content placed there (moves and visibility
//!   changes mark every location of the subtree)

use crate::behaviors::FieldTypeRegistry;
use crate::db::{ChangeSet, RepositoryState};
use crate::models::ContentStatus;
use crate::search::document::{ContentDocument, TranslationDocument};
use crate::search::fulltext::tokenize_email;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Index updates of one commit
#[derive(Debug, Clone, Default)]
pub struct IndexBatch {
    /// Drop every document before applying the batch
    pub purge_all: bool,
    pub upserts: Vec<Arc<ContentDocument>>,
    /// Content ids to remove
    pub removals: Vec<u64>,
}

impl IndexBatch {
    pub fn is_empty(&self) -> bool {
        !self.purge_all && self.upserts.is_empty() && self.removals.is_empty()
    }
}

pub struct IndexSynchronizer<'a> {
    state: &'a RepositoryState,
    field_types: &'a FieldTypeRegistry,
}

impl<'a> IndexSynchronizer<'a> {
    pub fn new(state: &'a RepositoryState, field_types: &'a FieldTypeRegistry) -> Self {
        Self { state, field_types }
    }

    /// Batch for the changes of one commit
    pub fn batch_for(&self, changes: &ChangeSet) -> IndexBatch {
        let mut content_ids: BTreeSet<u64> = changes.touched_contents().collect();
        for location_id in &changes.changed_locations {
            if let Some(location) = self.state.location(*location_id) {
                if !location.is_root() {
                    content_ids.insert(location.content_id);
                }
            }
        }

        let mut batch = IndexBatch::default();
        for content_id in content_ids {
            match self.build_document(content_id) {
                Some(document) => batch.upserts.push(Arc::new(document)),
                None => batch.removals.push(content_id),
            }
        }
        batch
    }

    /// Batch that replaces the whole index
    pub fn full_batch(&self) -> IndexBatch {
        IndexBatch {
            purge_all: true,
            upserts: self
                .state
                .contents
                .keys()
                .filter_map(|id| self.build_document(*id))
                .map(Arc::new)
                .collect(),
            removals: Vec::new(),
        }
    }

    /// Document for the published version, if the content is searchable at all
    pub fn build_document(&self, content_id: u64) -> Option<ContentDocument> {
        let info = self.state.content_info(content_id)?;
        if info.status == ContentStatus::Trashed {
            return None;
        }
        let version = self.state.published_version(content_id)?;
        let content = self.state.load_content(content_id, version.info.version_no)?;
        let content_type = self.state.content_type(info.content_type_id)?;

        let mut translations = BTreeMap::new();
        for language in &version.info.language_codes {
            let mut translation = TranslationDocument {
                language_code: language.clone(),
                name: version
                    .info
                    .name(language)
                    .unwrap_or(&info.name)
                    .to_string(),
                ..Default::default()
            };

            for field in version.fields.iter().filter(|f| &f.language_code == language) {
                let searchable = content_type
                    .field_definition(&field.field_def_identifier)
                    .map(|definition| definition.is_searchable)
                    .unwrap_or(false);
                if !searchable {
                    continue;
                }

                if let Some(text) = self
                    .field_types
                    .search_text(&field.field_type_identifier, &field.value)
                {
                    if field.field_type_identifier == "email" {
                        translation.terms.add_tokens(tokenize_email(&text));
                    } else {
                        translation.terms.add_text(&text);
                    }
                }
                let comparable = self
                    .field_types
                    .comparable(&field.field_type_identifier, &field.value);
                if !comparable.is_empty() {
                    translation
                        .fields
                        .insert(field.field_def_identifier.clone(), comparable);
                }
            }
            translations.insert(language.clone(), translation);
        }

        Some(ContentDocument {
            content,
            content_type_identifier: content_type.identifier.clone(),
            locations: self
                .state
                .locations_of(content_id)
                .into_iter()
                .cloned()
                .collect(),
            translations,
        })
    }
}
