//! Event Emission Tests
//!
//! Domain events are broadcast only after a unit of work commits, once per
//! touched content item or location. Rolled back work emits nothing.

#[cfg(test)]
mod event_emission_tests {
    use anyhow::Result;
    use folio_core::db::seed::{FOLDER_CONTENT_TYPE_ID, HOME_CONTENT_ID, HOME_LOCATION_ID};
    use folio_core::db::DomainEvent;
    use folio_core::models::{Content, ContentCreateStruct, LocationCreateStruct};
    use folio_core::services::Session;
    use folio_core::{Repository, RepositoryConfig};
    use tokio::sync::broadcast::Receiver;
    use tokio::time::{timeout, Duration};

    async fn create_folder(session: &Session, name: &str) -> Result<Content> {
        let folder_type = session
            .content_type_service()
            .load_content_type(FOLDER_CONTENT_TYPE_ID)
            .await?;
        Ok(session
            .content_service()
            .create_content(
                ContentCreateStruct::new(&folder_type, "eng-GB").set_field("name", name)?,
                vec![LocationCreateStruct::new(HOME_LOCATION_ID)],
            )
            .await?)
    }

    /// Everything already sent to `rx`
    fn drain(rx: &mut Receiver<DomainEvent>) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_create_content_emits_content_changed() -> Result<()> {
        let repository = Repository::new(RepositoryConfig::default()).await?;
        let session = repository.admin_session();
        let mut rx = repository.subscribe_to_events();

        let draft = create_folder(&session, "Events").await?;

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Event should be emitted within 1 second")
            .expect("Should receive event");
        assert_eq!(event, DomainEvent::ContentChanged { content_id: draft.id() });
        assert_eq!(event.event_type(), "content:changed");
        assert!(drain(&mut rx).is_empty(), "a draft has no locations yet");
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_emits_location_events() -> Result<()> {
        let repository = Repository::new(RepositoryConfig::default()).await?;
        let session = repository.admin_session();
        let draft = create_folder(&session, "Placed").await?;
        let mut rx = repository.subscribe_to_events();

        let published = session
            .content_service()
            .publish_version(&draft.version_info)
            .await?;

        let events = drain(&mut rx);
        let location_id = published.content_info.main_location_id.unwrap_or_default();
        assert!(events.contains(&DomainEvent::ContentChanged { content_id: draft.id() }));
        assert!(events.contains(&DomainEvent::LocationChanged { location_id }));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_location_emits_deletions() -> Result<()> {
        let repository = Repository::new(RepositoryConfig::default()).await?;
        let session = repository.admin_session();
        let draft = create_folder(&session, "Doomed").await?;
        let published = session
            .content_service()
            .publish_version(&draft.version_info)
            .await?;
        let location = session
            .location_service()
            .load_location(published.content_info.main_location_id.unwrap_or_default())
            .await?;
        let mut rx = repository.subscribe_to_events();

        session.location_service().delete_location(&location).await?;

        let events = drain(&mut rx);
        assert!(events.contains(&DomainEvent::LocationDeleted { location_id: location.id }));
        assert!(events.contains(&DomainEvent::ContentDeleted { content_id: draft.id() }));
        assert!(!events.contains(&DomainEvent::ContentChanged { content_id: draft.id() }));
        Ok(())
    }

    #[tokio::test]
    async fn test_events_wait_for_commit_and_skip_rollback() -> Result<()> {
        let repository = Repository::new(RepositoryConfig::default()).await?;
        let session = repository.admin_session();
        let mut rx = repository.subscribe_to_events();

        session.begin_transaction().await?;
        create_folder(&session, "Rolled back").await?;
        assert!(drain(&mut rx).is_empty());
        session.rollback().await?;
        assert!(drain(&mut rx).is_empty());

        session.begin_transaction().await?;
        let kept = create_folder(&session, "Committed").await?;
        assert!(drain(&mut rx).is_empty());
        session.commit().await?;
        assert_eq!(
            drain(&mut rx),
            vec![DomainEvent::ContentChanged { content_id: kept.id() }]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_content_cache_is_invalidated_on_commit() -> Result<()> {
        let repository = Repository::new(RepositoryConfig::default()).await?;
        let session = repository.admin_session();
        let content = session.content_service();

        let home = content.load_content(HOME_CONTENT_ID, None, None).await?;
        assert_eq!(repository.cache_pool().stats().0, 1);
        assert_eq!(content.load_content(HOME_CONTENT_ID, None, None).await?, home);

        let draft = content.create_content_draft(&home.content_info, None).await?;
        let updated = content
            .update_content(
                &draft.version_info,
                folio_core::models::ContentUpdateStruct::new().set_field("name", "Start"),
            )
            .await?;
        content.publish_version(&updated.version_info).await?;

        let reloaded = content.load_content(HOME_CONTENT_ID, None, None).await?;
        assert_eq!(reloaded.content_info.name, "Start");
        assert_eq!(reloaded.version_info.version_no, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_raw_storage_changes_clear_cache_and_reindex() -> Result<()> {
        let repository = Repository::new(RepositoryConfig::default()).await?;
        let session = repository.admin_session();
        session
            .content_service()
            .load_content(HOME_CONTENT_ID, None, None)
            .await?;
        assert_eq!(repository.cache_pool().stats().0, 1);

        repository
            .raw_storage()
            .transaction(|state| {
                if let Some(info) = state.contents.get_mut(&HOME_CONTENT_ID) {
                    info.name = "Renamed raw".to_string();
                }
                Ok(())
            })
            .await?;

        assert_eq!(repository.cache_pool().stats().0, 0);
        let name = repository
            .raw_storage()
            .read(|state| state.content_info(HOME_CONTENT_ID).map(|info| info.name.clone()))
            .await;
        assert_eq!(name.as_deref(), Some("Renamed raw"));

        let info = session.content_service().load_content_info(HOME_CONTENT_ID).await?;
        assert_eq!(info.name, "Renamed raw");
        Ok(())
    }
}
