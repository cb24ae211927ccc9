//! Demo Repository Binary
//!
//! Builds an in-memory repository, seeds a small folder tree and runs a few
//! searches against it. Useful for eyeballing index and tree behavior without
//! writing a test.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin seed-demo
//!
//! # More output, deferred index refresh
//! RUST_LOG=debug FOLIO_SEARCH_REFRESH=deferred cargo run --bin seed-demo
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")
//! - `FOLIO_*`: Repository settings, see `RepositoryConfig::from_env`

use folio_core::db::seed::{FOLDER_CONTENT_TYPE_ID, HOME_LOCATION_ID};
use folio_core::models::{ContentCreateStruct, Location, LocationCreateStruct, TrashQuery};
use folio_core::search::{Criterion, Query, Visibility};
use folio_core::{Repository, RepositoryConfig, Session};

const TREE: [(&str, &[&str]); 3] = [
    ("News", &["Harbour opening", "Lantern festival"]),
    ("Places", &["Stuttgart", "Sindelfingen", "Granite quarry"]),
    ("Archive", &["Old meadow"]),
];

async fn publish_folder(session: &Session, parent: u64, name: &str) -> anyhow::Result<Location> {
    let folder_type = session
        .content_type_service()
        .load_content_type(FOLDER_CONTENT_TYPE_ID)
        .await?;
    let content = session.content_service();
    let draft = content
        .create_content(
            ContentCreateStruct::new(&folder_type, "eng-GB")
                .set_field("name", name)?
                .set_field("description", format!("Demo folder {}", name.to_lowercase()))?,
            vec![LocationCreateStruct::new(parent)],
        )
        .await?;
    let published = content.publish_version(&draft.version_info).await?;
    let location_id = published
        .content_info
        .main_location_id
        .ok_or_else(|| anyhow::anyhow!("published folder '{}' has no location", name))?;
    Ok(session.location_service().load_location(location_id).await?)
}

async fn print_search(session: &Session, label: &str, query: Query) -> anyhow::Result<()> {
    let result = session.search_service().find_content(query, None).await?;
    tracing::info!("🔎 {}: {} hit(s)", label, result.total_count);
    for hit in &result.search_hits {
        tracing::info!(
            "   - {} (score {:?})",
            hit.value_object.content_info.name,
            hit.score
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RepositoryConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("📦 Folio demo repository");
    tracing::info!("   search refresh: {:?}", config.search_refresh);

    let repository = Repository::new(config).await?;
    let session = repository.admin_session();
    let mut events = repository.subscribe_to_events();

    let mut branches = Vec::new();
    for (branch, leaves) in TREE {
        let location = publish_folder(&session, HOME_LOCATION_ID, branch).await?;
        for leaf in leaves {
            publish_folder(&session, location.id, leaf).await?;
        }
        branches.push(location);
    }

    let mut event_count = 0;
    while events.try_recv().is_ok() {
        event_count += 1;
    }
    tracing::info!(
        "✅ Repository holds {} content items after {} domain events",
        repository.snapshot().await.contents.len(),
        event_count
    );

    repository.refresh_search_index().await?;

    print_search(
        &session,
        "full text 'stutt*'",
        Query::new().with_query(Criterion::FullText("stutt*".to_string())),
    )
    .await?;

    let places = &branches[1];
    print_search(
        &session,
        "visible under Places",
        Query::filter(Criterion::and(vec![
            Criterion::Subtree(vec![places.path_string.clone()]),
            Criterion::Visibility(Visibility::Visible),
        ])),
    )
    .await?;

    let archive = &branches[2];
    let item = session.trash_service().trash(archive).await?;
    repository.refresh_search_index().await?;
    tracing::info!("🗑️  Trashed '{}' ({} locations)", item.content_name, item.locations.len());
    print_search(
        &session,
        "full text 'meadow' after trashing",
        Query::new().with_query(Criterion::FullText("meadow".to_string())),
    )
    .await?;

    let trash = session.trash_service().find_trash_items(TrashQuery::default()).await?;
    tracing::info!("{}", serde_json::to_string_pretty(&trash.items)?);

    let anonymous = repository.anonymous_session();
    let visible = anonymous
        .search_service()
        .find_content(Query::filter(Criterion::Subtree(vec!["/1/".to_string()])), None)
        .await?;
    tracing::info!("👤 Anonymous user sees {} item(s)", visible.total_count);

    Ok(())
}
