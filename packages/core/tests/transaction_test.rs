//! Transaction Tests
//!
//! Explicit transactions, nested savepoints and optimistic commit checks
//! across sessions sharing one repository.

#[cfg(test)]
mod transaction_tests {
    use anyhow::Result;
    use folio_core::models::SectionCreateStruct;
    use folio_core::{Repository, RepositoryConfig, RepositoryError};

    async fn create_test_repository() -> Result<Repository> {
        Ok(Repository::new(RepositoryConfig::default()).await?)
    }

    #[tokio::test]
    async fn test_commit_publishes_all_changes() -> Result<()> {
        let repository = create_test_repository().await?;
        let writer = repository.admin_session();
        let reader = repository.admin_session();

        writer.begin_transaction().await?;
        writer
            .section_service()
            .create_section(SectionCreateStruct::new("news", "News"))
            .await?;
        writer
            .section_service()
            .create_section(SectionCreateStruct::new("sport", "Sport"))
            .await?;

        // Uncommitted work is private to the writing session
        assert!(reader
            .section_service()
            .load_section_by_identifier("news")
            .await
            .unwrap_err()
            .is_not_found());

        writer.commit().await?;
        assert_eq!(reader.section_service().load_sections().await?.len(), 4);
        assert_eq!(writer.transaction_depth().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() -> Result<()> {
        let repository = create_test_repository().await?;
        let session = repository.admin_session();

        session.begin_transaction().await?;
        session
            .section_service()
            .create_section(SectionCreateStruct::new("news", "News"))
            .await?;
        session.rollback().await?;

        let result = session.section_service().load_section_by_identifier("news").await;
        assert!(result.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_nested_rollback_keeps_outer_changes() -> Result<()> {
        let repository = create_test_repository().await?;
        let session = repository.admin_session();
        let sections = session.section_service();

        session.begin_transaction().await?;
        sections
            .create_section(SectionCreateStruct::new("outer", "Outer"))
            .await?;

        session.begin_transaction().await?;
        assert_eq!(session.transaction_depth().await, 2);
        sections
            .create_section(SectionCreateStruct::new("inner", "Inner"))
            .await?;
        session.rollback().await?;
        assert_eq!(session.transaction_depth().await, 1);

        session.commit().await?;
        assert!(sections.load_section_by_identifier("outer").await.is_ok());
        assert!(sections
            .load_section_by_identifier("inner")
            .await
            .unwrap_err()
            .is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_nested_commit_only_publishes_at_outermost_level() -> Result<()> {
        let repository = create_test_repository().await?;
        let session = repository.admin_session();
        let observer = repository.admin_session();

        session.begin_transaction().await?;
        session.begin_transaction().await?;
        session
            .section_service()
            .create_section(SectionCreateStruct::new("news", "News"))
            .await?;
        session.commit().await?;

        assert!(observer
            .section_service()
            .load_section_by_identifier("news")
            .await
            .unwrap_err()
            .is_not_found());

        session.commit().await?;
        assert!(observer
            .section_service()
            .load_section_by_identifier("news")
            .await
            .is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_and_rollback_without_transaction() -> Result<()> {
        let repository = create_test_repository().await?;
        let session = repository.admin_session();

        assert_eq!(session.commit().await, Err(RepositoryError::NoActiveTransaction));
        assert_eq!(session.rollback().await, Err(RepositoryError::NoActiveTransaction));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_commit_fails_later_transaction() -> Result<()> {
        let repository = create_test_repository().await?;
        let first = repository.admin_session();
        let second = repository.admin_session();

        first.begin_transaction().await?;
        first
            .section_service()
            .create_section(SectionCreateStruct::new("first", "First"))
            .await?;

        // Auto-committed write lands while the transaction is open
        second
            .section_service()
            .create_section(SectionCreateStruct::new("second", "Second"))
            .await?;

        let result = first.commit().await;
        assert!(matches!(result, Err(RepositoryError::TransactionFailed { .. })));
        assert_eq!(first.transaction_depth().await, 0);

        let sections = second.section_service();
        assert!(sections.load_section_by_identifier("second").await.is_ok());
        assert!(sections
            .load_section_by_identifier("first")
            .await
            .unwrap_err()
            .is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_unrelated_commit_merges_with_open_transaction() -> Result<()> {
        let repository = create_test_repository().await?;
        let editor = repository.admin_session();
        let visitor = repository.anonymous_session();

        editor.begin_transaction().await?;
        editor
            .section_service()
            .create_section(SectionCreateStruct::new("news", "News"))
            .await?;

        // Tokens live in their own table group
        let token = visitor
            .token_service()
            .generate_token("reset", 3600, Some("visitor"), None)
            .await?;

        editor.commit().await?;
        assert_eq!(editor.transaction_depth().await, 0);
        assert!(visitor
            .token_service()
            .check_token("reset", &token.value, Some("visitor"))
            .await?);
        assert_eq!(
            editor.section_service().load_section_by_identifier("news").await?.name,
            "News"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_operation_leaves_transaction_usable() -> Result<()> {
        let repository = create_test_repository().await?;
        let session = repository.admin_session();
        let sections = session.section_service();

        session.begin_transaction().await?;
        sections
            .create_section(SectionCreateStruct::new("news", "News"))
            .await?;
        let duplicate = sections
            .create_section(SectionCreateStruct::new("news", "Again"))
            .await;
        assert!(matches!(duplicate, Err(RepositoryError::InvalidArgument { .. })));
        session.commit().await?;

        assert_eq!(sections.load_section_by_identifier("news").await?.name, "News");
        Ok(())
    }
}
