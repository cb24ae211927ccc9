//! Content Service - Versioned Content CRUD
//!
//! This module implements the content lifecycle:
//!
//! - creation of content items as a first draft, with requested placements
//! - drafts, draft updates and publishing
//! - version and translation removal
//! - deletion and copying of whole content items
//! - explicit relations between versions and content items
//!
//! # Version lifecycle
//!
//! New content starts as version 1 in `DRAFT`. Publishing a draft archives the
//! previously published version, so there is at most one `PUBLISHED` version.
//! Locations requested at creation are created on first publish.
//!
//! # Permissions
//!
//! | Operation | Policy |
//! |-----------|--------|
//! | load published | `content/read` |
//! | load drafts, archived versions | `content/versionread` |
//! | create, copy | `content/create` at the target locations |
//! | drafts, updates, relations, metadata | `content/edit` |
//! | publish | `content/publish` |
//! | delete version | `content/versionremove` |
//! | delete content or translation | `content/remove` for every affected language |

use crate::db::seed::STANDARD_SECTION_ID;
use crate::db::{RepositoryState, Sequence, StoredVersion};
use crate::models::{
    Content, ContentCreateStruct, ContentInfo, ContentMetadataUpdateStruct, ContentStatus,
    ContentUpdateStruct, Field, Location, LocationCreateStruct, Relation, RelationKind,
    ValidationError, VersionInfo, VersionStatus, ROOT_LOCATION_ID,
};
use crate::permissions::PermissionTarget;
use crate::services::content_fields::{relation_targets, FieldAssembler};
use crate::services::repository::{ReadContext, UnitOfWork};
use crate::services::{RepositoryError, Session};
use std::collections::BTreeSet;

pub struct ContentService<'a> {
    session: &'a Session,
}

impl<'a> ContentService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    //
    // LOADING
    //

    pub async fn load_content_info(&self, content_id: u64) -> Result<ContentInfo, RepositoryError> {
        self.session
            .read(|ctx| {
                let info = content_info_of(ctx.state, content_id)?;
                ctx.permissions().authorize(
                    "content",
                    "read",
                    &PermissionTarget::for_content(ctx.state, info),
                )?;
                Ok(info.clone())
            })
            .await
    }

    pub async fn load_content_info_by_remote_id(
        &self,
        remote_id: &str,
    ) -> Result<ContentInfo, RepositoryError> {
        self.session
            .read(|ctx| {
                let info = ctx
                    .state
                    .content_by_remote_id(remote_id)
                    .ok_or_else(|| RepositoryError::not_found("Content", remote_id))?;
                ctx.permissions().authorize(
                    "content",
                    "read",
                    &PermissionTarget::for_content(ctx.state, info),
                )?;
                Ok(info.clone())
            })
            .await
    }

    /// Version info of `version_no`, or of the current version when `None`
    pub async fn load_version_info(
        &self,
        content_info: &ContentInfo,
        version_no: Option<u32>,
    ) -> Result<VersionInfo, RepositoryError> {
        let content_id = content_info.id;
        self.session
            .read(|ctx| {
                let version = readable_version(ctx, content_id, version_no)?;
                Ok(version.info.clone())
            })
            .await
    }

    /// Every version of a content item, oldest first
    pub async fn load_versions(
        &self,
        content_info: &ContentInfo,
    ) -> Result<Vec<VersionInfo>, RepositoryError> {
        let content_id = content_info.id;
        self.session
            .read(|ctx| {
                let info = content_info_of(ctx.state, content_id)?;
                ctx.permissions().authorize(
                    "content",
                    "versionread",
                    &PermissionTarget::for_content(ctx.state, info),
                )?;
                Ok(ctx
                    .state
                    .versions_of(content_id)
                    .map(|version| version.info.clone())
                    .collect())
            })
            .await
    }

    /// Load a content item
    ///
    /// Without `version_no` the published version is loaded, or the latest
    /// draft of never published content. With `languages`, only fields in
    /// those languages are returned; content missing all of them is not found
    /// unless it is always available, in which case the main language is used.
    pub async fn load_content(
        &self,
        content_id: u64,
        languages: Option<&[String]>,
        version_no: Option<u32>,
    ) -> Result<Content, RepositoryError> {
        self.session
            .read(|ctx| load_content_in(ctx, content_id, languages, version_no))
            .await
    }

    pub async fn load_content_by_content_info(
        &self,
        content_info: &ContentInfo,
        languages: Option<&[String]>,
    ) -> Result<Content, RepositoryError> {
        self.load_content(content_info.id, languages, None).await
    }

    pub async fn load_content_by_remote_id(
        &self,
        remote_id: &str,
        languages: Option<&[String]>,
        version_no: Option<u32>,
    ) -> Result<Content, RepositoryError> {
        self.session
            .read(|ctx| {
                let content_id = ctx
                    .state
                    .content_by_remote_id(remote_id)
                    .map(|info| info.id)
                    .ok_or_else(|| RepositoryError::not_found("Content", remote_id))?;
                load_content_in(ctx, content_id, languages, version_no)
            })
            .await
    }

    //
    // CREATION
    //

    /// Create a content item as draft version 1
    ///
    /// `locations` are validated now and created when the draft is published.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown content type, section, language or parent
    /// - `InvalidArgument` for a duplicate remote id or a non-container parent
    /// - `Validation` for unknown fields, invalid or missing required values
    /// - `Unauthorized` without `content/create` at every parent
    pub async fn create_content(
        &self,
        create: ContentCreateStruct,
        locations: Vec<LocationCreateStruct>,
    ) -> Result<Content, RepositoryError> {
        self.session
            .write(|uow| {
                let inner = uow.inner;
                let content_type = uow
                    .state
                    .content_type(create.content_type_id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("ContentType", create.content_type_id))?;

                let languages: BTreeSet<String> = create.language_codes().into_iter().collect();
                for language in &languages {
                    if !uow.state.languages.contains_key(language) {
                        return Err(RepositoryError::not_found("Language", language));
                    }
                }

                let mut parents = Vec::with_capacity(locations.len());
                for location in &locations {
                    parents.push(container_parent(uow.state, location.parent_location_id)?.clone());
                    check_location_remote_id(uow.state, location.remote_id.as_deref())?;
                }

                let section_id = match create.section_id {
                    Some(section_id) => section_id,
                    None => parents
                        .first()
                        .and_then(|parent| uow.state.content_info(parent.content_id))
                        .map(|info| info.section_id)
                        .unwrap_or(STANDARD_SECTION_ID),
                };
                if !uow.state.sections.contains_key(&section_id) {
                    return Err(RepositoryError::not_found("Section", section_id));
                }
                let owner_id = create.owner_id.unwrap_or(uow.user.user_id);

                let parent_refs: Vec<_> = parents.iter().collect();
                let target =
                    PermissionTarget::for_creation(section_id, owner_id, content_type.id, &parent_refs)
                        .with_languages(languages.iter().cloned());
                uow.authorize("content", "create", &target)?;

                if let Some(remote_id) = &create.remote_id {
                    if uow.state.content_by_remote_id(remote_id).is_some() {
                        return Err(RepositoryError::invalid_argument(
                            "remoteId",
                            ValidationError::DuplicateRemoteId(remote_id.clone()).to_string(),
                        ));
                    }
                }

                let assembler = FieldAssembler {
                    content_type: &content_type,
                    registry: &inner.field_types,
                    main_language_code: &create.main_language_code,
                };
                let fields =
                    assembler.assemble(&languages, &[], &create.fields, &create.main_language_code)?;
                let names = assembler.names(&fields, &languages);

                let content_id = uow.state.next_id(Sequence::Content);
                let info = ContentInfo {
                    id: content_id,
                    content_type_id: content_type.id,
                    remote_id: create
                        .remote_id
                        .clone()
                        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
                    name: names
                        .get(&create.main_language_code)
                        .cloned()
                        .unwrap_or_default(),
                    section_id,
                    current_version_no: 1,
                    status: ContentStatus::Draft,
                    owner_id,
                    main_language_code: create.main_language_code.clone(),
                    main_location_id: None,
                    always_available: create
                        .always_available
                        .unwrap_or(content_type.default_always_available),
                    published_at: None,
                    modified_at: uow.now,
                };
                let version = StoredVersion {
                    info: VersionInfo {
                        content_id,
                        version_no: 1,
                        status: VersionStatus::Draft,
                        language_codes: languages.iter().cloned().collect(),
                        initial_language_code: create.main_language_code.clone(),
                        creator_id: uow.user.user_id,
                        names,
                        created_at: uow.now,
                        modified_at: uow.now,
                    },
                    fields,
                };

                uow.state.contents.insert(content_id, info);
                sync_field_relations(uow.state, content_id, 1, &version.fields)?;
                uow.state.versions.insert((content_id, 1), version);
                if !locations.is_empty() {
                    uow.state.pending_locations.insert(content_id, locations.clone());
                }
                uow.state.touch_content(content_id, uow.changes);

                tracing::debug!(
                    "Created content {} of type '{}'",
                    content_id,
                    content_type.identifier
                );
                loaded(uow.state, content_id, 1)
            })
            .await
    }

    /// Create a new draft from `version_no`, or from the current version
    pub async fn create_content_draft(
        &self,
        content_info: &ContentInfo,
        version_no: Option<u32>,
    ) -> Result<Content, RepositoryError> {
        let content_id = content_info.id;
        self.session
            .write(|uow| {
                let info = content_info_of(uow.state, content_id)?;
                uow.authorize("content", "edit", &PermissionTarget::for_content(uow.state, info))?;

                let source_no = match version_no {
                    Some(version_no) => version_no,
                    None => current_version_no(uow.state, content_id)
                        .ok_or_else(|| RepositoryError::not_found("Version", content_id))?,
                };
                let source = uow
                    .state
                    .version(content_id, source_no)
                    .cloned()
                    .ok_or_else(|| version_not_found(content_id, source_no))?;

                let draft_no = uow.state.latest_version_no(content_id) + 1;
                let draft = StoredVersion {
                    info: VersionInfo {
                        version_no: draft_no,
                        status: VersionStatus::Draft,
                        creator_id: uow.user.user_id,
                        created_at: uow.now,
                        modified_at: uow.now,
                        ..source.info.clone()
                    },
                    fields: source.fields,
                };
                uow.state.versions.insert((content_id, draft_no), draft);
                copy_relations(uow.state, content_id, source_no, content_id, draft_no);
                uow.state.touch_content(content_id, uow.changes);

                tracing::debug!("Created draft {} of content {}", draft_no, content_id);
                loaded(uow.state, content_id, draft_no)
            })
            .await
    }

    /// Apply field changes to a draft
    ///
    /// # Errors
    ///
    /// - `BadState` unless the version is a draft
    /// - `Validation` for unknown fields, invalid or missing required values
    /// - `Unauthorized` without `content/edit` for the touched languages
    pub async fn update_content(
        &self,
        version_info: &VersionInfo,
        update: ContentUpdateStruct,
    ) -> Result<Content, RepositoryError> {
        let (content_id, version_no) = (version_info.content_id, version_info.version_no);
        self.session
            .write(|uow| {
                let inner = uow.inner;
                let info = content_info_of(uow.state, content_id)?.clone();
                let version = uow
                    .state
                    .version(content_id, version_no)
                    .cloned()
                    .ok_or_else(|| version_not_found(content_id, version_no))?;
                if !version.info.is_draft() {
                    return Err(RepositoryError::bad_state(
                        "versionInfo",
                        format!("version {} of content {} is not a draft", version_no, content_id),
                    ));
                }

                let initial_language = update
                    .initial_language_code
                    .clone()
                    .unwrap_or_else(|| version.info.initial_language_code.clone());
                let touched: BTreeSet<String> = update
                    .fields
                    .iter()
                    .map(|f| f.language_code.clone().unwrap_or_else(|| initial_language.clone()))
                    .chain(std::iter::once(initial_language.clone()))
                    .collect();
                for language in &touched {
                    if !uow.state.languages.contains_key(language) {
                        return Err(RepositoryError::not_found("Language", language));
                    }
                }
                uow.authorize(
                    "content",
                    "edit",
                    &PermissionTarget::for_content(uow.state, &info)
                        .with_languages(touched.iter().cloned()),
                )?;

                let content_type = uow
                    .state
                    .content_type(info.content_type_id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("ContentType", info.content_type_id))?;
                let mut languages: BTreeSet<String> =
                    version.info.language_codes.iter().cloned().collect();
                languages.extend(touched);

                let assembler = FieldAssembler {
                    content_type: &content_type,
                    registry: &inner.field_types,
                    main_language_code: &info.main_language_code,
                };
                let fields =
                    assembler.assemble(&languages, &version.fields, &update.fields, &initial_language)?;
                let names = assembler.names(&fields, &languages);

                sync_field_relations(uow.state, content_id, version_no, &fields)?;
                let now = uow.now;
                if let Some(stored) = uow.state.versions.get_mut(&(content_id, version_no)) {
                    stored.info.language_codes = languages.into_iter().collect();
                    stored.info.initial_language_code = initial_language;
                    stored.info.names = names;
                    stored.info.modified_at = now;
                    stored.fields = fields;
                }
                uow.state.touch_content(content_id, uow.changes);
                loaded(uow.state, content_id, version_no)
            })
            .await
    }

    /// Publish a draft
    ///
    /// The previously published version becomes `ARCHIVED`; locations requested
    /// at creation are created now.
    pub async fn publish_version(&self, version_info: &VersionInfo) -> Result<Content, RepositoryError> {
        let (content_id, version_no) = (version_info.content_id, version_info.version_no);
        self.session
            .write(|uow| {
                let info = content_info_of(uow.state, content_id)?.clone();
                let version = uow
                    .state
                    .version(content_id, version_no)
                    .ok_or_else(|| version_not_found(content_id, version_no))?;
                if !version.info.is_draft() {
                    return Err(RepositoryError::bad_state(
                        "versionInfo",
                        format!("version {} of content {} is not a draft", version_no, content_id),
                    ));
                }
                let name = version
                    .info
                    .name(&info.main_language_code)
                    .map(str::to_string)
                    .unwrap_or_else(|| info.name.clone());
                uow.authorize(
                    "content",
                    "publish",
                    &PermissionTarget::for_content(uow.state, &info)
                        .with_languages(version.info.language_codes.iter().cloned()),
                )?;

                let previous = uow
                    .state
                    .published_version(content_id)
                    .map(|v| v.info.version_no);
                if let Some(previous) = previous {
                    if let Some(archived) = uow.state.versions.get_mut(&(content_id, previous)) {
                        archived.info.status = VersionStatus::Archived;
                    }
                }
                let now = uow.now;
                if let Some(published) = uow.state.versions.get_mut(&(content_id, version_no)) {
                    published.info.status = VersionStatus::Published;
                    published.info.modified_at = now;
                }
                if let Some(info) = uow.state.contents.get_mut(&content_id) {
                    info.current_version_no = version_no;
                    info.name = name;
                    info.modified_at = now;
                    if info.published_at.is_none() {
                        info.published_at = Some(now);
                    }
                    if info.status == ContentStatus::Draft {
                        info.status = ContentStatus::Published;
                    }
                }

                if let Some(pending) = uow.state.pending_locations.remove(&content_id) {
                    for create in pending {
                        if uow.state.location(create.parent_location_id).is_none() {
                            return Err(RepositoryError::not_found(
                                "Location",
                                create.parent_location_id,
                            ));
                        }
                        uow.state.create_location(content_id, &create, uow.changes);
                    }
                }
                uow.state.touch_content(content_id, uow.changes);

                tracing::info!(
                    "Published version {} of content {} (archived: {:?})",
                    version_no,
                    content_id,
                    previous
                );
                loaded(uow.state, content_id, version_no)
            })
            .await
    }

    /// Remove a draft or archived version
    ///
    /// # Errors
    ///
    /// `BadState` for the published version or the only version of the content.
    pub async fn delete_version(&self, version_info: &VersionInfo) -> Result<(), RepositoryError> {
        let (content_id, version_no) = (version_info.content_id, version_info.version_no);
        self.session
            .write(|uow| {
                let info = content_info_of(uow.state, content_id)?;
                let version = uow
                    .state
                    .version(content_id, version_no)
                    .ok_or_else(|| version_not_found(content_id, version_no))?;
                if version.info.is_published() {
                    return Err(RepositoryError::bad_state(
                        "versionInfo",
                        "the published version cannot be deleted",
                    ));
                }
                if uow.state.versions_of(content_id).count() == 1 {
                    return Err(RepositoryError::bad_state(
                        "versionInfo",
                        "the only version of a content item cannot be deleted",
                    ));
                }
                uow.authorize(
                    "content",
                    "versionremove",
                    &PermissionTarget::for_content(uow.state, info),
                )?;

                uow.state.versions.remove(&(content_id, version_no));
                uow.state.relations.retain(|_, relation| {
                    !(relation.source_content_id == content_id
                        && relation.source_version_no == version_no)
                });
                uow.state.touch_content(content_id, uow.changes);
                Ok(())
            })
            .await
    }

    /// Delete a content item with all versions and locations
    ///
    /// Returns the ids of every removed location, subtrees included.
    pub async fn delete_content(&self, content_info: &ContentInfo) -> Result<Vec<u64>, RepositoryError> {
        let content_id = content_info.id;
        self.session
            .write(|uow| {
                let info = content_info_of(uow.state, content_id)?;
                let languages = uow.state.content_languages(content_id);
                uow.authorize(
                    "content",
                    "remove",
                    &PermissionTarget::for_content(uow.state, info).with_languages(languages),
                )?;

                let removed = uow.state.purge_content(content_id, uow.changes);
                tracing::info!(
                    "Deleted content {} ({} locations removed)",
                    content_id,
                    removed.len()
                );
                Ok(removed)
            })
            .await
    }

    /// Remove one language from every version of a content item
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the content has no such translation
    /// - `BadState` for the main language or the last remaining language
    pub async fn delete_translation(
        &self,
        content_info: &ContentInfo,
        language_code: &str,
    ) -> Result<(), RepositoryError> {
        let content_id = content_info.id;
        self.session
            .write(|uow| {
                let info = content_info_of(uow.state, content_id)?;
                let languages = uow.state.content_languages(content_id);
                if !languages.contains(language_code) {
                    return Err(RepositoryError::invalid_argument(
                        "languageCode",
                        format!("content {} has no '{}' translation", content_id, language_code),
                    ));
                }
                if info.main_language_code == language_code {
                    return Err(RepositoryError::bad_state(
                        "languageCode",
                        "the main translation cannot be removed",
                    ));
                }
                if languages.len() == 1 {
                    return Err(RepositoryError::bad_state(
                        "languageCode",
                        "the only translation cannot be removed",
                    ));
                }
                uow.authorize(
                    "content",
                    "remove",
                    &PermissionTarget::for_content(uow.state, info)
                        .with_languages([language_code.to_string()]),
                )?;

                let affected: Vec<(u32, bool, usize)> = uow
                    .state
                    .versions_of(content_id)
                    .filter(|v| v.info.has_language(language_code))
                    .map(|v| {
                        (
                            v.info.version_no,
                            v.info.is_published(),
                            v.info.language_codes.len(),
                        )
                    })
                    .collect();
                for (version_no, published, language_count) in affected {
                    if language_count == 1 {
                        if published {
                            return Err(RepositoryError::bad_state(
                                "languageCode",
                                "the published version has no other translation",
                            ));
                        }
                        uow.state.versions.remove(&(content_id, version_no));
                        continue;
                    }
                    if let Some(version) = uow.state.versions.get_mut(&(content_id, version_no)) {
                        version.info.language_codes.retain(|code| code != language_code);
                        version.info.names.remove(language_code);
                        version.fields.retain(|field| field.language_code != language_code);
                        if version.info.initial_language_code == language_code {
                            version.info.initial_language_code = version
                                .info
                                .language_codes
                                .first()
                                .cloned()
                                .unwrap_or_default();
                        }
                    }
                }
                uow.state.touch_content(content_id, uow.changes);
                tracing::info!("Removed translation {} of content {}", language_code, content_id);
                Ok(())
            })
            .await
    }

    /// Update content metadata
    pub async fn update_content_metadata(
        &self,
        content_info: &ContentInfo,
        update: ContentMetadataUpdateStruct,
    ) -> Result<ContentInfo, RepositoryError> {
        let content_id = content_info.id;
        self.session
            .write(|uow| {
                if update == ContentMetadataUpdateStruct::default() {
                    return Err(RepositoryError::invalid_argument(
                        "contentMetadataUpdateStruct",
                        "at least one property must be set",
                    ));
                }
                let info = content_info_of(uow.state, content_id)?;
                uow.authorize("content", "edit", &PermissionTarget::for_content(uow.state, info))?;

                if let Some(remote_id) = &update.remote_id {
                    if uow
                        .state
                        .content_by_remote_id(remote_id)
                        .is_some_and(|other| other.id != content_id)
                    {
                        return Err(RepositoryError::invalid_argument(
                            "remoteId",
                            ValidationError::DuplicateRemoteId(remote_id.clone()).to_string(),
                        ));
                    }
                }
                if let Some(language) = &update.main_language_code {
                    if !uow.state.content_languages(content_id).contains(language) {
                        return Err(RepositoryError::invalid_argument(
                            "mainLanguageCode",
                            format!("content {} has no '{}' translation", content_id, language),
                        ));
                    }
                }
                if let Some(location_id) = update.main_location_id {
                    let placed = uow
                        .state
                        .location(location_id)
                        .is_some_and(|location| location.content_id == content_id);
                    if !placed {
                        return Err(RepositoryError::invalid_argument(
                            "mainLocationId",
                            format!("location {} does not hold content {}", location_id, content_id),
                        ));
                    }
                }

                let main_language = update
                    .main_language_code
                    .clone()
                    .unwrap_or_else(|| info.main_language_code.clone());
                let published_name = uow
                    .state
                    .published_version(content_id)
                    .and_then(|version| version.info.name(&main_language))
                    .map(str::to_string);

                let now = uow.now;
                let info = uow
                    .state
                    .contents
                    .get_mut(&content_id)
                    .ok_or_else(|| RepositoryError::not_found("Content", content_id))?;
                if let Some(owner_id) = update.owner_id {
                    info.owner_id = owner_id;
                }
                if let Some(remote_id) = update.remote_id {
                    info.remote_id = remote_id;
                }
                if let Some(always_available) = update.always_available {
                    info.always_available = always_available;
                }
                if let Some(location_id) = update.main_location_id {
                    info.main_location_id = Some(location_id);
                }
                if let Some(published_at) = update.published_at {
                    info.published_at = Some(published_at);
                }
                info.main_language_code = main_language;
                if let Some(name) = published_name {
                    info.name = name;
                }
                info.modified_at = now;
                let updated = info.clone();
                uow.state.touch_content(content_id, uow.changes);
                Ok(updated)
            })
            .await
    }

    /// Copy a content item into a new content item below `target`
    ///
    /// All versions are copied unless `version_no` selects one, which then
    /// becomes version 1 of the copy.
    pub async fn copy_content(
        &self,
        content_info: &ContentInfo,
        target: LocationCreateStruct,
        version_no: Option<u32>,
    ) -> Result<Content, RepositoryError> {
        let content_id = content_info.id;
        self.session
            .write(|uow| {
                let info = content_info_of(uow.state, content_id)?.clone();
                let parent = container_parent(uow.state, target.parent_location_id)?.clone();
                check_location_remote_id(uow.state, target.remote_id.as_deref())?;
                uow.authorize(
                    "content",
                    "create",
                    &PermissionTarget::for_creation(
                        info.section_id,
                        info.owner_id,
                        info.content_type_id,
                        &[&parent],
                    ),
                )?;

                let copy_id = copy_content_item(uow, content_id, version_no)?;
                if uow.state.published_version(copy_id).is_some() {
                    uow.state.create_location(copy_id, &target, uow.changes);
                } else {
                    uow.state.pending_locations.insert(copy_id, vec![target.clone()]);
                }
                tracing::debug!("Copied content {} to {}", content_id, copy_id);

                let version_no = current_version_no(uow.state, copy_id)
                    .ok_or_else(|| RepositoryError::not_found("Version", copy_id))?;
                loaded(uow.state, copy_id, version_no)
            })
            .await
    }

    //
    // RELATIONS
    //

    /// Add a common relation from a draft to a content item
    pub async fn add_relation(
        &self,
        source_version: &VersionInfo,
        destination: &ContentInfo,
    ) -> Result<Relation, RepositoryError> {
        let (content_id, version_no) = (source_version.content_id, source_version.version_no);
        let destination_id = destination.id;
        self.session
            .write(|uow| {
                let info = editable_draft(uow, content_id, version_no)?;
                uow.authorize("content", "edit", &PermissionTarget::for_content(uow.state, &info))?;
                let destination = content_info_of(uow.state, destination_id)?;
                uow.authorize(
                    "content",
                    "read",
                    &PermissionTarget::for_content(uow.state, destination),
                )?;

                let existing = uow.state.relations.values().find(|r| {
                    r.kind == RelationKind::Common
                        && r.source_content_id == content_id
                        && r.source_version_no == version_no
                        && r.destination_content_id == destination_id
                });
                if let Some(relation) = existing {
                    return Ok(relation.clone());
                }

                let relation = Relation {
                    id: uow.state.next_id(Sequence::Relation),
                    source_content_id: content_id,
                    source_version_no: version_no,
                    destination_content_id: destination_id,
                    kind: RelationKind::Common,
                    source_field_identifier: None,
                };
                uow.state.relations.insert(relation.id, relation.clone());
                uow.state.touch_content(content_id, uow.changes);
                Ok(relation)
            })
            .await
    }

    pub async fn delete_relation(
        &self,
        source_version: &VersionInfo,
        destination: &ContentInfo,
    ) -> Result<(), RepositoryError> {
        let (content_id, version_no) = (source_version.content_id, source_version.version_no);
        let destination_id = destination.id;
        self.session
            .write(|uow| {
                let info = editable_draft(uow, content_id, version_no)?;
                uow.authorize("content", "edit", &PermissionTarget::for_content(uow.state, &info))?;

                let relation_id = uow
                    .state
                    .relations
                    .values()
                    .find(|r| {
                        r.kind == RelationKind::Common
                            && r.source_content_id == content_id
                            && r.source_version_no == version_no
                            && r.destination_content_id == destination_id
                    })
                    .map(|r| r.id)
                    .ok_or_else(|| {
                        RepositoryError::not_found(
                            "Relation",
                            format!("{}/{} -> {}", content_id, version_no, destination_id),
                        )
                    })?;
                uow.state.relations.remove(&relation_id);
                uow.state.touch_content(content_id, uow.changes);
                Ok(())
            })
            .await
    }

    /// Relations of a version; relations to unreadable content are left out
    pub async fn load_relations(
        &self,
        version_info: &VersionInfo,
    ) -> Result<Vec<Relation>, RepositoryError> {
        let (content_id, version_no) = (version_info.content_id, version_info.version_no);
        self.session
            .read(|ctx| {
                readable_version(ctx, content_id, Some(version_no))?;
                let permissions = ctx.permissions();
                Ok(ctx
                    .state
                    .relations
                    .values()
                    .filter(|r| r.source_content_id == content_id && r.source_version_no == version_no)
                    .filter(|r| {
                        let readable = ctx.state.content_info(r.destination_content_id).is_some_and(
                            |destination| {
                                permissions.can_user(
                                    "content",
                                    "read",
                                    &PermissionTarget::for_content(ctx.state, destination),
                                )
                            },
                        );
                        if !readable {
                            tracing::warn!(
                                "Omitting relation {} to unreadable content {}",
                                r.id,
                                r.destination_content_id
                            );
                        }
                        readable
                    })
                    .cloned()
                    .collect())
            })
            .await
    }

    /// Relations pointing at a content item from current versions of readable content
    pub async fn load_reverse_relations(
        &self,
        content_info: &ContentInfo,
    ) -> Result<Vec<Relation>, RepositoryError> {
        let content_id = content_info.id;
        self.session
            .read(|ctx| {
                let info = content_info_of(ctx.state, content_id)?;
                let permissions = ctx.permissions();
                permissions.authorize(
                    "content",
                    "reverserelatedlist",
                    &PermissionTarget::for_content(ctx.state, info),
                )?;
                Ok(ctx
                    .state
                    .relations
                    .values()
                    .filter(|r| r.destination_content_id == content_id)
                    .filter(|r| {
                        current_version_no(ctx.state, r.source_content_id) == Some(r.source_version_no)
                    })
                    .filter(|r| {
                        let readable = ctx.state.content_info(r.source_content_id).is_some_and(
                            |source| {
                                permissions.can_user(
                                    "content",
                                    "read",
                                    &PermissionTarget::for_content(ctx.state, source),
                                )
                            },
                        );
                        if !readable {
                            tracing::warn!(
                                "Omitting reverse relation {} from unreadable content {}",
                                r.id,
                                r.source_content_id
                            );
                        }
                        readable
                    })
                    .cloned()
                    .collect())
            })
            .await
    }
}

//
// HELPERS (shared with the location service)
//

pub(crate) fn content_info_of(
    state: &RepositoryState,
    content_id: u64,
) -> Result<&ContentInfo, RepositoryError> {
    state
        .content_info(content_id)
        .ok_or_else(|| RepositoryError::not_found("Content", content_id))
}

fn version_not_found(content_id: u64, version_no: u32) -> RepositoryError {
    RepositoryError::not_found("Version", format!("{}/{}", content_id, version_no))
}

/// Published version number, or the latest version of never published content
pub(crate) fn current_version_no(state: &RepositoryState, content_id: u64) -> Option<u32> {
    state
        .published_version(content_id)
        .map(|version| version.info.version_no)
        .or_else(|| Some(state.latest_version_no(content_id)).filter(|no| *no > 0))
}

fn loaded(state: &RepositoryState, content_id: u64, version_no: u32) -> Result<Content, RepositoryError> {
    state
        .load_content(content_id, version_no)
        .ok_or_else(|| version_not_found(content_id, version_no))
}

/// Parent location that accepts children
pub(crate) fn container_parent(
    state: &RepositoryState,
    parent_location_id: u64,
) -> Result<&Location, RepositoryError> {
    let parent = state
        .location(parent_location_id)
        .ok_or_else(|| RepositoryError::not_found("Location", parent_location_id))?;
    if parent.id == ROOT_LOCATION_ID {
        return Ok(parent);
    }
    let is_container = state
        .content_info(parent.content_id)
        .and_then(|info| state.content_type(info.content_type_id))
        .map(|content_type| content_type.is_container)
        .unwrap_or(false);
    if !is_container {
        return Err(RepositoryError::invalid_argument(
            "parentLocationId",
            format!("location {} is not a container", parent_location_id),
        ));
    }
    Ok(parent)
}

pub(crate) fn check_location_remote_id(
    state: &RepositoryState,
    remote_id: Option<&str>,
) -> Result<(), RepositoryError> {
    match remote_id {
        Some(remote_id) if state.location_by_remote_id(remote_id).is_some() => {
            Err(RepositoryError::invalid_argument(
                "remoteId",
                format!("location remote id '{}' is already in use", remote_id),
            ))
        }
        _ => Ok(()),
    }
}

fn readable_version<'s>(
    ctx: &ReadContext<'s>,
    content_id: u64,
    version_no: Option<u32>,
) -> Result<&'s StoredVersion, RepositoryError> {
    let state = ctx.state;
    let info = content_info_of(state, content_id)?;
    let version_no = match version_no {
        Some(version_no) => version_no,
        None => current_version_no(state, content_id)
            .ok_or_else(|| RepositoryError::not_found("Version", content_id))?,
    };
    let version = state
        .version(content_id, version_no)
        .ok_or_else(|| version_not_found(content_id, version_no))?;
    let function = if version.info.is_published() {
        "read"
    } else {
        "versionread"
    };
    ctx.permissions()
        .authorize("content", function, &PermissionTarget::for_content(state, info))?;
    Ok(version)
}

fn load_content_in(
    ctx: &ReadContext<'_>,
    content_id: u64,
    languages: Option<&[String]>,
    version_no: Option<u32>,
) -> Result<Content, RepositoryError> {
    let version_no = readable_version(ctx, content_id, version_no)?.info.version_no;

    let cache = &ctx.inner.cache;
    let revision = ctx
        .state
        .content_revisions
        .get(&content_id)
        .copied()
        .unwrap_or(0);
    let cached = if ctx.committed {
        cache.get(content_id, version_no, revision)
    } else {
        None
    };
    let mut content = match cached {
        Some(content) => content,
        None => {
            let content = loaded(ctx.state, content_id, version_no)?;
            if ctx.committed {
                cache.put(content.clone(), ctx.state.generation);
            }
            content
        }
    };

    if let Some(languages) = languages {
        let available: Vec<String> = languages
            .iter()
            .filter(|code| content.version_info.has_language(code))
            .cloned()
            .collect();
        let keep = if !available.is_empty() {
            available
        } else if content.content_info.always_available {
            vec![content.content_info.main_language_code.clone()]
        } else {
            return Err(RepositoryError::not_found(
                "Content",
                format!("{} in languages {:?}", content_id, languages),
            ));
        };
        content.fields.retain(|field| keep.contains(&field.language_code));
    }
    Ok(content)
}

fn editable_draft(
    uow: &UnitOfWork<'_>,
    content_id: u64,
    version_no: u32,
) -> Result<ContentInfo, RepositoryError> {
    let info = content_info_of(uow.state, content_id)?.clone();
    let version = uow
        .state
        .version(content_id, version_no)
        .ok_or_else(|| version_not_found(content_id, version_no))?;
    if !version.info.is_draft() {
        return Err(RepositoryError::bad_state(
            "versionInfo",
            format!("version {} of content {} is not a draft", version_no, content_id),
        ));
    }
    Ok(info)
}

/// Rebuild the field relations of a version from its relation fields
fn sync_field_relations(
    state: &mut RepositoryState,
    content_id: u64,
    version_no: u32,
    fields: &[Field],
) -> Result<(), RepositoryError> {
    let targets = relation_targets(fields);
    for (field, destination) in &targets {
        if state.content_info(*destination).is_none() {
            return Err(ValidationError::InvalidFieldValue {
                field: field.clone(),
                reason: format!("related content {} does not exist", destination),
            }
            .into());
        }
    }
    state.relations.retain(|_, r| {
        !(r.kind == RelationKind::Field
            && r.source_content_id == content_id
            && r.source_version_no == version_no)
    });
    for (field, destination) in targets {
        let id = state.next_id(Sequence::Relation);
        state.relations.insert(
            id,
            Relation {
                id,
                source_content_id: content_id,
                source_version_no: version_no,
                destination_content_id: destination,
                kind: RelationKind::Field,
                source_field_identifier: Some(field),
            },
        );
    }
    Ok(())
}

fn copy_relations(
    state: &mut RepositoryState,
    from_content: u64,
    from_version: u32,
    to_content: u64,
    to_version: u32,
) {
    let copies: Vec<Relation> = state
        .relations
        .values()
        .filter(|r| r.source_content_id == from_content && r.source_version_no == from_version)
        .cloned()
        .collect();
    for relation in copies {
        let id = state.next_id(Sequence::Relation);
        state.relations.insert(
            id,
            Relation {
                id,
                source_content_id: to_content,
                source_version_no: to_version,
                ..relation
            },
        );
    }
}

/// Duplicate a content item without placing it
///
/// Returns the id of the copy. The caller creates its locations.
pub(crate) fn copy_content_item(
    uow: &mut UnitOfWork<'_>,
    content_id: u64,
    version_no: Option<u32>,
) -> Result<u64, RepositoryError> {
    let info = content_info_of(uow.state, content_id)?.clone();
    let versions: Vec<StoredVersion> = match version_no {
        Some(version_no) => {
            let version = uow
                .state
                .version(content_id, version_no)
                .cloned()
                .ok_or_else(|| version_not_found(content_id, version_no))?;
            vec![version]
        }
        None => uow.state.versions_of(content_id).cloned().collect(),
    };

    let copy_id = uow.state.next_id(Sequence::Content);
    let single = version_no.is_some();
    let mut has_published = false;
    let mut current = 1;
    for version in versions {
        let source_no = version.info.version_no;
        let target_no = if single { 1 } else { source_no };
        let status = if single {
            VersionStatus::Published
        } else {
            version.info.status
        };
        if status == VersionStatus::Published {
            has_published = true;
            current = target_no;
        }
        uow.state.versions.insert(
            (copy_id, target_no),
            StoredVersion {
                info: VersionInfo {
                    content_id: copy_id,
                    version_no: target_no,
                    status,
                    creator_id: uow.user.user_id,
                    created_at: uow.now,
                    modified_at: uow.now,
                    ..version.info
                },
                fields: version.fields,
            },
        );
        copy_relations(uow.state, content_id, source_no, copy_id, target_no);
    }

    uow.state.contents.insert(
        copy_id,
        ContentInfo {
            id: copy_id,
            remote_id: uuid::Uuid::new_v4().simple().to_string(),
            current_version_no: current,
            status: if has_published {
                ContentStatus::Published
            } else {
                ContentStatus::Draft
            },
            main_location_id: None,
            published_at: has_published.then_some(uow.now),
            modified_at: uow.now,
            ..info
        },
    );
    uow.state.touch_content(copy_id, uow.changes);
    Ok(copy_id)
}

#[cfg(test)]
#[path = "content_service_test.rs"]
mod content_service_test;
