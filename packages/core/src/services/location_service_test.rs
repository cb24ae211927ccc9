//! Location tree tests: placement, visibility, moves, copies and cascading deletes

#[cfg(test)]
mod tests {
    use crate::config::RepositoryConfig;
    use crate::db::seed::{FOLDER_CONTENT_TYPE_ID, HOME_LOCATION_ID};
    use crate::models::{
        Content, ContentCreateStruct, Location, LocationCreateStruct, LocationUpdateStruct,
        SortField, SortOrder, ROOT_LOCATION_ID,
    };
    use crate::services::{Repository, RepositoryError, Session};

    async fn setup() -> (Repository, Session) {
        let repository = Repository::new(RepositoryConfig::default()).await.unwrap();
        let session = repository.admin_session();
        (repository, session)
    }

    /// Create and publish a folder below `parent`
    async fn folder(session: &Session, parent: u64, name: &str) -> Content {
        let folder_type = session
            .content_type_service()
            .load_content_type(FOLDER_CONTENT_TYPE_ID)
            .await
            .unwrap();
        let create = ContentCreateStruct::new(&folder_type, "eng-GB")
            .set_field("name", name)
            .unwrap();
        let draft = session
            .content_service()
            .create_content(create, vec![LocationCreateStruct::new(parent)])
            .await
            .unwrap();
        session
            .content_service()
            .publish_version(&draft.version_info)
            .await
            .unwrap()
    }

    async fn main_location(session: &Session, content: &Content) -> Location {
        let info = session
            .content_service()
            .load_content_info(content.id())
            .await
            .unwrap();
        session
            .location_service()
            .load_location(info.main_location_id.unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_published_content_gets_location_with_consistent_path() {
        let (_repository, session) = setup().await;
        let news = folder(&session, HOME_LOCATION_ID, "News").await;
        let location = main_location(&session, &news).await;

        assert_eq!(location.parent_location_id, Some(HOME_LOCATION_ID));
        assert_eq!(location.path_string, format!("/1/2/{}/", location.id));
        assert_eq!(location.depth, 2);
        assert!(!location.invisible);
    }

    #[tokio::test]
    async fn test_delete_location_keeps_content_placed_elsewhere() {
        let (_repository, session) = setup().await;
        let locations = session.location_service();
        let a = main_location(&session, &folder(&session, HOME_LOCATION_ID, "A").await).await;
        let b = main_location(&session, &folder(&session, HOME_LOCATION_ID, "B").await).await;
        let shared = folder(&session, a.id, "Shared").await;
        let child = folder(&session, main_location(&session, &shared).await.id, "Child").await;

        let second = locations
            .create_location(&shared.content_info, LocationCreateStruct::new(b.id))
            .await
            .unwrap();

        locations.delete_location(&a).await.unwrap();

        let content = session.content_service();
        assert!(content.load_content_info(a.content_id).await.unwrap_err().is_not_found());
        assert!(content.load_content_info(child.id()).await.unwrap_err().is_not_found());
        let survivor = content.load_content_info(shared.id()).await.unwrap();
        assert_eq!(survivor.main_location_id, Some(second.id));
        assert_eq!(locations.load_locations(&survivor).await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn test_swap_location_exchanges_content_and_keeps_ids() {
        let (_repository, session) = setup().await;
        let locations = session.location_service();
        let first = folder(&session, HOME_LOCATION_ID, "First").await;
        let second = folder(&session, HOME_LOCATION_ID, "Second").await;
        let first_location = main_location(&session, &first).await;
        let second_location = main_location(&session, &second).await;

        locations.swap_location(&first_location, &second_location).await.unwrap();

        let swapped_first = locations.load_location(first_location.id).await.unwrap();
        let swapped_second = locations.load_location(second_location.id).await.unwrap();
        assert_eq!(swapped_first.content_id, second.id());
        assert_eq!(swapped_second.content_id, first.id());
        assert_eq!(swapped_first.path_string, first_location.path_string);

        let info = session.content_service().load_content_info(first.id()).await.unwrap();
        assert_eq!(info.main_location_id, Some(second_location.id));
    }

    #[tokio::test]
    async fn test_hide_and_unhide_propagate_invisibility() {
        let (_repository, session) = setup().await;
        let locations = session.location_service();
        let outer = main_location(&session, &folder(&session, HOME_LOCATION_ID, "Outer").await).await;
        let inner = main_location(&session, &folder(&session, outer.id, "Inner").await).await;
        let leaf = main_location(&session, &folder(&session, inner.id, "Leaf").await).await;

        locations.hide_location(&inner).await.unwrap();
        assert!(locations.load_location(leaf.id).await.unwrap().invisible);
        assert!(!locations.load_location(outer.id).await.unwrap().invisible);

        locations.hide_location(&outer).await.unwrap();
        locations.unhide_location(&inner).await.unwrap();
        let leaf_now = locations.load_location(leaf.id).await.unwrap();
        assert!(leaf_now.invisible, "outer is still hidden");
        assert!(!locations.load_location(inner.id).await.unwrap().hidden);

        locations.unhide_location(&outer).await.unwrap();
        assert!(!locations.load_location(leaf.id).await.unwrap().invisible);
    }

    #[tokio::test]
    async fn test_move_subtree_rewrites_paths() {
        let (_repository, session) = setup().await;
        let locations = session.location_service();
        let source = main_location(&session, &folder(&session, HOME_LOCATION_ID, "Source").await).await;
        let target = main_location(&session, &folder(&session, HOME_LOCATION_ID, "Target").await).await;
        let leaf = main_location(&session, &folder(&session, source.id, "Leaf").await).await;

        let moved = locations.move_subtree(&source, &target).await.unwrap();
        assert_eq!(moved.path_string, format!("{}{}/", target.path_string, source.id));
        let leaf = locations.load_location(leaf.id).await.unwrap();
        assert_eq!(leaf.path_string, format!("{}{}/", moved.path_string, leaf.id));
        assert_eq!(leaf.depth, 4);

        let into_itself = locations.move_subtree(&target, &leaf).await;
        assert!(matches!(into_itself, Err(RepositoryError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_copy_subtree_duplicates_content() {
        let (_repository, session) = setup().await;
        let locations = session.location_service();
        let source = main_location(&session, &folder(&session, HOME_LOCATION_ID, "Source").await).await;
        folder(&session, source.id, "Leaf").await;
        let target = main_location(&session, &folder(&session, HOME_LOCATION_ID, "Target").await).await;

        let copy = locations.copy_subtree(&source, &target).await.unwrap();
        assert_ne!(copy.content_id, source.content_id);
        assert_eq!(copy.parent_location_id, Some(target.id));

        let children = locations.load_location_children(&copy, 0, None).await.unwrap();
        assert_eq!(children.total_count, 1);
        let copied_leaf = session
            .content_service()
            .load_content(children.locations[0].content_id, None, None)
            .await
            .unwrap();
        assert_eq!(copied_leaf.content_info.name, "Leaf");
        assert!(copied_leaf.version_info.is_published());
    }

    #[tokio::test]
    async fn test_children_follow_parent_sort_order() {
        let (_repository, session) = setup().await;
        let locations = session.location_service();
        let parent = main_location(&session, &folder(&session, HOME_LOCATION_ID, "Parent").await).await;
        for name in ["beta", "Alpha", "gamma"] {
            folder(&session, parent.id, name).await;
        }

        let parent = locations
            .update_location(
                &parent,
                LocationUpdateStruct {
                    sort_field: Some(SortField::Name),
                    sort_order: Some(SortOrder::Desc),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let children = locations.load_location_children(&parent, 0, Some(2)).await.unwrap();
        assert_eq!(children.total_count, 3);
        assert_eq!(children.locations.len(), 2);

        let content = session.content_service();
        let mut names = Vec::new();
        for child in &children.locations {
            names.push(content.load_content_info(child.content_id).await.unwrap().name);
        }
        assert_eq!(names, vec!["gamma", "beta"]);
        assert_eq!(locations.get_location_child_count(&parent).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_location_requires_published_content() {
        let (_repository, session) = setup().await;
        let folder_type = session
            .content_type_service()
            .load_content_type(FOLDER_CONTENT_TYPE_ID)
            .await
            .unwrap();
        let draft = session
            .content_service()
            .create_content(
                ContentCreateStruct::new(&folder_type, "eng-GB")
                    .set_field("name", "Draft")
                    .unwrap(),
                Vec::new(),
            )
            .await
            .unwrap();

        let result = session
            .location_service()
            .create_location(&draft.content_info, LocationCreateStruct::new(HOME_LOCATION_ID))
            .await;
        assert!(matches!(result, Err(RepositoryError::BadState { .. })));
    }

    #[tokio::test]
    async fn test_content_cannot_be_placed_inside_its_own_subtree() {
        let (_repository, session) = setup().await;
        let outer = folder(&session, HOME_LOCATION_ID, "Outer").await;
        let inner = main_location(&session, &folder(&session, main_location(&session, &outer).await.id, "Inner").await).await;

        let result = session
            .location_service()
            .create_location(&outer.content_info, LocationCreateStruct::new(inner.id))
            .await;
        assert!(matches!(result, Err(RepositoryError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_root_location_is_immutable() {
        let (_repository, session) = setup().await;
        let locations = session.location_service();
        let root = locations.load_location(ROOT_LOCATION_ID).await.unwrap();

        assert!(matches!(
            locations.hide_location(&root).await,
            Err(RepositoryError::BadState { .. })
        ));
        assert!(matches!(
            locations.delete_location(&root).await,
            Err(RepositoryError::BadState { .. })
        ));
    }

    #[tokio::test]
    async fn test_anonymous_user_cannot_delete_locations() {
        let (repository, session) = setup().await;
        let news = main_location(&session, &folder(&session, HOME_LOCATION_ID, "News").await).await;

        let anonymous = repository.anonymous_session();
        assert!(anonymous.location_service().load_location(news.id).await.is_ok());
        assert!(anonymous
            .location_service()
            .delete_location(&news)
            .await
            .unwrap_err()
            .is_unauthorized());
    }
}
