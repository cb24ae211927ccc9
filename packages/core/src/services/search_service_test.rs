//! Search service tests against the in-memory engine

#[cfg(test)]
mod tests {
    use crate::config::{RefreshMode, RepositoryConfig};
    use crate::db::seed::{HOME_LOCATION_ID, MEDIA_SECTION_ID};
    use crate::models::{
        Content, ContentCreateStruct, ContentType, ContentTypeCreateStruct, ContentTypeUpdateStruct,
        ContentUpdateStruct, FieldDefinitionCreateStruct, LanguageCreateStruct, Location,
        LocationCreateStruct,
    };
    use crate::search::{Criterion, LanguageSettings, Operator, Query, Visibility};
    use crate::services::{Repository, RepositoryError, Session};

    async fn setup_with(config: RepositoryConfig) -> (Repository, Session, ContentType) {
        let repository = Repository::new(config).await.unwrap();
        let session = repository.admin_session();
        let article = session
            .content_type_service()
            .create_content_type(
                ContentTypeCreateStruct::new("article", "eng-GB")
                    .with_name_schema("<title>")
                    .add_field_definition(FieldDefinitionCreateStruct::new("title", "string").required(true))
                    .add_field_definition(FieldDefinitionCreateStruct::new("body", "text"))
                    .add_field_definition(
                        FieldDefinitionCreateStruct::new("isbn", "string").searchable(false),
                    ),
            )
            .await
            .unwrap();
        repository.refresh_search_index().await.unwrap();
        (repository, session, article)
    }

    async fn setup() -> (Repository, Session, ContentType) {
        setup_with(RepositoryConfig::default()).await
    }

    async fn publish(session: &Session, create: ContentCreateStruct) -> Content {
        let content = session.content_service();
        let draft = content
            .create_content(create, vec![LocationCreateStruct::new(HOME_LOCATION_ID)])
            .await
            .unwrap();
        content.publish_version(&draft.version_info).await.unwrap()
    }

    async fn article(session: &Session, article: &ContentType, title: &str, body: &str) -> Content {
        let create = ContentCreateStruct::new(article, "eng-GB")
            .set_field("title", title)
            .unwrap()
            .set_field("body", body)
            .unwrap()
            .set_field("isbn", "quaxtiger")
            .unwrap();
        publish(session, create).await
    }

    fn full_text(text: &str) -> Query {
        Query::new().with_query(Criterion::FullText(text.to_string()))
    }

    #[tokio::test]
    async fn test_full_text_covers_searchable_fields_only() {
        let (_repository, session, article_type) = setup().await;
        let search = session.search_service();
        let created = article(&session, &article_type, "Sindelfingen", "A town near Stuttgart").await;

        let by_title = search.find_content(full_text("sindelfingen"), None).await.unwrap();
        assert_eq!(by_title.total_count, 1);
        assert_eq!(by_title.search_hits[0].value_object.id(), created.id());
        assert!(by_title.search_hits[0].score.is_some());
        assert!(by_title.max_score.is_some());

        let by_body = search.find_content(full_text("stutt*"), None).await.unwrap();
        assert_eq!(by_body.total_count, 1);

        let by_isbn = search.find_content(full_text("quaxtiger"), None).await.unwrap();
        assert_eq!(by_isbn.total_count, 0);
        assert!(by_isbn.max_score.is_none());
    }

    #[tokio::test]
    async fn test_field_criterion_requires_searchable_field() {
        let (_repository, session, article_type) = setup().await;
        let search = session.search_service();
        article(&session, &article_type, "Field test", "Body").await;

        let on_isbn = search
            .find_content(
                Query::filter(Criterion::field("isbn", Operator::Eq, "quaxtiger")),
                None,
            )
            .await;
        assert!(matches!(on_isbn, Err(RepositoryError::InvalidArgument { .. })));

        let on_title = search
            .find_content(
                Query::filter(Criterion::field("title", Operator::Eq, "Field test")),
                None,
            )
            .await
            .unwrap();
        assert_eq!(on_title.total_count, 1);
        assert!(on_title.search_hits[0].score.is_none());
    }

    #[tokio::test]
    async fn test_deleting_a_draft_keeps_published_version_indexed() {
        let (_repository, session, article_type) = setup().await;
        let content = session.content_service();
        let published = article(&session, &article_type, "Stable", "Published text").await;

        let draft = content
            .create_content_draft(&published.content_info, None)
            .await
            .unwrap();
        content.delete_version(&draft.version_info).await.unwrap();

        let result = session
            .search_service()
            .find_content(full_text("stable"), None)
            .await
            .unwrap();
        assert_eq!(result.total_count, 1);
    }

    #[tokio::test]
    async fn test_visibility_criterion_follows_hidden_locations() {
        let (_repository, session, article_type) = setup().await;
        let search = session.search_service();
        let created = article(&session, &article_type, "Hideable", "Text").await;
        let location = session
            .location_service()
            .load_location(created.content_info.main_location_id.unwrap())
            .await
            .unwrap();
        session.location_service().hide_location(&location).await.unwrap();

        let visible = Query::filter(Criterion::and(vec![
            Criterion::ContentId(vec![created.id()]),
            Criterion::Visibility(Visibility::Visible),
        ]));
        assert_eq!(search.find_content(visible, None).await.unwrap().total_count, 0);

        let hidden = Query::filter(Criterion::and(vec![
            Criterion::ContentId(vec![created.id()]),
            Criterion::Visibility(Visibility::Hidden),
        ]));
        assert_eq!(search.find_content(hidden, None).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_results_are_filtered_by_read_permission() {
        let (repository, session, article_type) = setup().await;
        article(&session, &article_type, "Public kiwi", "Text").await;
        let media = ContentCreateStruct::new(&article_type, "eng-GB")
            .set_field("title", "Private kiwi")
            .unwrap()
            .with_section_id(MEDIA_SECTION_ID);
        publish(&session, media).await;

        let admin = session.search_service().find_content(full_text("kiwi"), None).await.unwrap();
        assert_eq!(admin.total_count, 2);

        let anonymous = repository.anonymous_session();
        let result = anonymous
            .search_service()
            .find_content(full_text("kiwi"), None)
            .await
            .unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.search_hits[0].value_object.content_info.name, "Public kiwi");
    }

    #[tokio::test]
    async fn test_find_single() {
        let (_repository, session, article_type) = setup().await;
        let search = session.search_service();
        article(&session, &article_type, "Unique mango", "Text").await;
        article(&session, &article_type, "Twin apple", "Text").await;
        article(&session, &article_type, "Twin pear", "Text").await;

        let found = search
            .find_single(Criterion::FullText("mango".to_string()), None)
            .await
            .unwrap();
        assert_eq!(found.content_info.name, "Unique mango");

        let missing = search
            .find_single(Criterion::FullText("papaya".to_string()), None)
            .await;
        assert!(missing.unwrap_err().is_not_found());

        let ambiguous = search
            .find_single(Criterion::FullText("twin".to_string()), None)
            .await;
        assert!(matches!(ambiguous, Err(RepositoryError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_find_locations_returns_every_placement() {
        let (_repository, session, article_type) = setup().await;
        let folder_type = session
            .content_type_service()
            .load_content_type_by_identifier("folder")
            .await
            .unwrap();
        let folder = publish(
            &session,
            ContentCreateStruct::new(&folder_type, "eng-GB")
                .set_field("name", "Archive")
                .unwrap(),
        )
        .await;
        let created = article(&session, &article_type, "Everywhere", "Text").await;
        session
            .location_service()
            .create_location(
                &created.content_info,
                LocationCreateStruct::new(folder.content_info.main_location_id.unwrap()),
            )
            .await
            .unwrap();

        let result = session
            .search_service()
            .find_locations(Query::filter(Criterion::ContentId(vec![created.id()])), None)
            .await
            .unwrap();
        assert_eq!(result.total_count, 2);
        assert!(result.value_objects().all(|location| location.content_id == created.id()));
    }

    #[tokio::test]
    async fn test_trashed_content_leaves_the_index() {
        let (_repository, session, article_type) = setup().await;
        let created = article(&session, &article_type, "Disposable", "Text").await;
        let location = session
            .location_service()
            .load_location(created.content_info.main_location_id.unwrap())
            .await
            .unwrap();
        let item = session.trash_service().trash(&location).await.unwrap();

        let search = session.search_service();
        assert_eq!(search.find_content(full_text("disposable"), None).await.unwrap().total_count, 0);

        session.trash_service().recover(&item, None).await.unwrap();
        assert_eq!(search.find_content(full_text("disposable"), None).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_deferred_refresh_publishes_on_demand() {
        let config = RepositoryConfig {
            search_refresh: RefreshMode::Deferred,
            ..RepositoryConfig::default()
        };
        let (repository, session, article_type) = setup_with(config).await;
        article(&session, &article_type, "Delayed", "Text").await;

        let search = session.search_service();
        assert_eq!(search.find_content(full_text("delayed"), None).await.unwrap().total_count, 0);

        repository.refresh_search_index().await.unwrap();
        assert_eq!(search.find_content(full_text("delayed"), None).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_search_inside_transaction_sees_committed_state() {
        let (_repository, session, article_type) = setup().await;

        session.begin_transaction().await.unwrap();
        article(&session, &article_type, "Pending", "Text").await;
        let search = session.search_service();
        assert_eq!(search.find_content(full_text("pending"), None).await.unwrap().total_count, 0);
        session.commit().await.unwrap();

        assert_eq!(search.find_content(full_text("pending"), None).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_language_settings_limit_returned_fields() {
        let (_repository, session, article_type) = setup().await;
        article(&session, &article_type, "Lingo", "Text").await;

        let result = session
            .search_service()
            .find_content(full_text("lingo"), Some(LanguageSettings::new(["eng-GB"])))
            .await
            .unwrap();
        assert_eq!(result.total_count, 1);
        let hit = &result.search_hits[0];
        assert_eq!(hit.matched_translation, "eng-GB");
        assert!(hit.value_object.fields.iter().all(|field| field.language_code == "eng-GB"));
    }

    #[tokio::test]
    async fn test_paging_keeps_total_count() {
        let (_repository, session, article_type) = setup().await;
        for title in ["Page one", "Page two", "Page three"] {
            article(&session, &article_type, title, "Text").await;
        }

        let result = session
            .search_service()
            .find_content_info(
                Query::filter(Criterion::ContentTypeIdentifier(vec!["article".to_string()]))
                    .with_offset(1)
                    .with_limit(1),
            )
            .await
            .unwrap();
        assert_eq!(result.total_count, 3);
        assert_eq!(result.search_hits.len(), 1);
    }

    async fn republish(session: &Session, published: &Content, update: ContentUpdateStruct) -> Content {
        let content = session.content_service();
        let draft = content
            .create_content_draft(&published.content_info, None)
            .await
            .unwrap();
        let updated = content.update_content(&draft.version_info, update).await.unwrap();
        content.publish_version(&updated.version_info).await.unwrap()
    }

    async fn folder_at(session: &Session, parent: u64, name: &str) -> Location {
        let folder_type = session
            .content_type_service()
            .load_content_type_by_identifier("folder")
            .await
            .unwrap();
        let content = session.content_service();
        let draft = content
            .create_content(
                ContentCreateStruct::new(&folder_type, "eng-GB")
                    .set_field("name", name)
                    .unwrap(),
                vec![LocationCreateStruct::new(parent)],
            )
            .await
            .unwrap();
        let published = content.publish_version(&draft.version_info).await.unwrap();
        session
            .location_service()
            .load_location(published.content_info.main_location_id.unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_emptied_field_leaves_the_corpus() {
        let (_repository, session, article_type) = setup().await;
        let search = session.search_service();
        let published = article(&session, &article_type, "Harbour", "Lighthouse keeper").await;
        assert_eq!(search.find_content(full_text("lighthouse"), None).await.unwrap().total_count, 1);

        republish(&session, &published, ContentUpdateStruct::new().set_field("body", "")).await;

        assert_eq!(search.find_content(full_text("lighthouse"), None).await.unwrap().total_count, 0);
        assert_eq!(search.find_content(full_text("harbour"), None).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_deleted_translation_leaves_language_scoped_results() {
        let (_repository, session, article_type) = setup().await;
        session
            .language_service()
            .create_language(LanguageCreateStruct::new("ger-DE", "German"))
            .await
            .unwrap();
        let published = article(&session, &article_type, "Car", "Wheels").await;
        republish(
            &session,
            &published,
            ContentUpdateStruct::new().set_field_in("title", "Autobahn", "ger-DE"),
        )
        .await;

        let search = session.search_service();
        let german = || Some(LanguageSettings::new(["ger-DE"]));
        let result = search.find_content(full_text("autobahn"), german()).await.unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.search_hits[0].matched_translation, "ger-DE");

        session
            .content_service()
            .delete_translation(&published.content_info, "ger-DE")
            .await
            .unwrap();

        assert_eq!(search.find_content(full_text("autobahn"), german()).await.unwrap().total_count, 0);
        assert_eq!(search.find_content(full_text("autobahn"), None).await.unwrap().total_count, 0);
        assert_eq!(search.find_content(full_text("car"), None).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_moved_subtree_is_found_under_new_parent() {
        let (_repository, session, article_type) = setup().await;
        let source = folder_at(&session, HOME_LOCATION_ID, "Source").await;
        let target = folder_at(&session, HOME_LOCATION_ID, "Target").await;
        let create = ContentCreateStruct::new(&article_type, "eng-GB")
            .set_field("title", "Traveller")
            .unwrap();
        let content = session.content_service();
        let draft = content
            .create_content(create, vec![LocationCreateStruct::new(source.id)])
            .await
            .unwrap();
        let traveller = content.publish_version(&draft.version_info).await.unwrap();

        let under = |path: &str| {
            Query::filter(Criterion::and(vec![
                Criterion::Subtree(vec![path.to_string()]),
                Criterion::ContentId(vec![traveller.id()]),
            ]))
        };
        let search = session.search_service();
        assert_eq!(search.find_locations(under(&target.path_string), None).await.unwrap().total_count, 0);

        let moved = session.location_service().move_subtree(&source, &target).await.unwrap();
        assert!(moved.path_string.starts_with(&target.path_string));

        let found = search.find_locations(under(&target.path_string), None).await.unwrap();
        assert_eq!(found.total_count, 1);
        let location = found.value_objects().next().unwrap();
        assert!(location.path_string.starts_with(&moved.path_string));
        assert_eq!(search.find_content(under(&source.path_string), None).await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_renamed_content_type_is_reindexed() {
        let (repository, session, article_type) = setup().await;
        article(&session, &article_type, "Renamed", "Text").await;

        session
            .content_type_service()
            .update_content_type(
                article_type.id,
                ContentTypeUpdateStruct {
                    identifier: Some("news_article".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        repository.refresh_search_index().await.unwrap();

        let by_type = |identifier: &str| {
            Query::filter(Criterion::ContentTypeIdentifier(vec![identifier.to_string()]))
        };
        let search = session.search_service();
        assert_eq!(search.find_content(by_type("news_article"), None).await.unwrap().total_count, 1);
        assert_eq!(search.find_content(by_type("article"), None).await.unwrap().total_count, 0);
    }
}
