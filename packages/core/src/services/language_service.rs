//! Language Service
//!
//! Language ids are single bits of a 64-bit mask so a set of languages can be
//! stored as one integer. Bit 0 marks always-available content and the sign bit
//! is unused, which caps the registry at [`MAX_LANGUAGES`] languages. New
//! languages take the lowest free bit.

use crate::models::{language_mask, Language, LanguageCreateStruct, MAX_LANGUAGES};
use crate::services::{RepositoryError, Session};

pub struct LanguageService<'a> {
    session: &'a Session,
}

impl<'a> LanguageService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Register a language
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the code is empty or already registered
    /// - `LanguageLimitReached` when all [`MAX_LANGUAGES`] ids are taken
    /// - `Unauthorized` without `content/translations`
    pub async fn create_language(
        &self,
        create: LanguageCreateStruct,
    ) -> Result<Language, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("content", "translations")?;
                let code = create.language_code.trim();
                if code.is_empty() {
                    return Err(RepositoryError::invalid_argument(
                        "languageCode",
                        "language code must not be empty",
                    ));
                }
                if uow.state.languages.contains_key(code) {
                    return Err(RepositoryError::invalid_argument(
                        "languageCode",
                        format!("language '{}' already exists", code),
                    ));
                }

                let taken = language_mask(uow.state.languages.values().map(|l| l.id), false);
                let id = (1..=MAX_LANGUAGES)
                    .map(|bit| 1i64 << bit)
                    .find(|id| taken & id == 0)
                    .ok_or(RepositoryError::LanguageLimitReached { max: MAX_LANGUAGES })?;

                let language = Language {
                    id,
                    language_code: code.to_string(),
                    name: create.name.clone(),
                    enabled: create.enabled,
                };
                uow.state
                    .languages
                    .insert(language.language_code.clone(), language.clone());
                tracing::info!("Created language {} (id {})", language.language_code, id);
                Ok(language)
            })
            .await
    }

    pub async fn load_language(&self, language_code: &str) -> Result<Language, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.state
                    .languages
                    .get(language_code)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Language", language_code))
            })
            .await
    }

    pub async fn load_language_by_id(&self, id: i64) -> Result<Language, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.state
                    .language_by_id(id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Language", id))
            })
            .await
    }

    /// All languages ordered by code
    pub async fn load_languages(&self) -> Result<Vec<Language>, RepositoryError> {
        self.session
            .read(|ctx| Ok(ctx.state.languages.values().cloned().collect()))
            .await
    }

    pub async fn enable_language(&self, language_code: &str) -> Result<Language, RepositoryError> {
        self.set_enabled(language_code, true).await
    }

    pub async fn disable_language(&self, language_code: &str) -> Result<Language, RepositoryError> {
        self.set_enabled(language_code, false).await
    }

    pub async fn update_language_name(
        &self,
        language_code: &str,
        name: &str,
    ) -> Result<Language, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("content", "translations")?;
                let language = uow
                    .state
                    .languages
                    .get_mut(language_code)
                    .ok_or_else(|| RepositoryError::not_found("Language", language_code))?;
                language.name = name.to_string();
                Ok(language.clone())
            })
            .await
    }

    /// Delete a language no content or content type references
    pub async fn delete_language(&self, language_code: &str) -> Result<(), RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("content", "translations")?;
                let language_id = uow
                    .state
                    .languages
                    .get(language_code)
                    .map(|language| language.id)
                    .ok_or_else(|| RepositoryError::not_found("Language", language_code))?;
                let in_versions = uow
                    .state
                    .contents
                    .keys()
                    .any(|id| uow.state.content_language_mask(*id) & language_id != 0);
                let in_contents = uow
                    .state
                    .contents
                    .values()
                    .any(|info| info.main_language_code == language_code);
                let in_types = uow
                    .state
                    .content_types
                    .values()
                    .any(|t| t.main_language_code == language_code);
                if in_versions || in_contents || in_types {
                    return Err(RepositoryError::invalid_argument(
                        "language",
                        format!("language '{}' is still in use", language_code),
                    ));
                }
                uow.state.languages.remove(language_code);
                tracing::info!("Deleted language {}", language_code);
                Ok(())
            })
            .await
    }

    pub fn default_language_code(&self) -> String {
        self.session.repository().config().default_language_code.clone()
    }

    async fn set_enabled(
        &self,
        language_code: &str,
        enabled: bool,
    ) -> Result<Language, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("content", "translations")?;
                let language = uow
                    .state
                    .languages
                    .get_mut(language_code)
                    .ok_or_else(|| RepositoryError::not_found("Language", language_code))?;
                language.enabled = enabled;
                Ok(language.clone())
            })
            .await
    }
}

#[cfg(test)]
#[path = "language_service_test.rs"]
mod language_service_test;
