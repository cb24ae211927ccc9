//! Performance benchmarks for Folio core operations
//!
//! Run with: `cargo bench -p folio-core`
//!
//! These benchmarks measure critical path performance:
//! - Publishing content (unit of work commit plus index update)
//! - Full-text and filtered searches over a populated index
//! - Moving a subtree with many descendants

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use folio_core::db::seed::{FOLDER_CONTENT_TYPE_ID, HOME_LOCATION_ID};
use folio_core::models::{ContentCreateStruct, ContentType, Location, LocationCreateStruct};
use folio_core::search::{Criterion as SearchCriterion, Query, Visibility};
use folio_core::services::Session;
use folio_core::{Repository, RepositoryConfig};
use tokio::runtime::Runtime;

const WORDS: [&str; 8] = [
    "sindelfingen", "stuttgart", "harbour", "meadow", "lantern", "granite", "orchard", "violet",
];

async fn setup_repository() -> (Repository, Session, ContentType) {
    let repository = Repository::new(RepositoryConfig::default()).await.unwrap();
    let session = repository.admin_session();
    let folder_type = session
        .content_type_service()
        .load_content_type(FOLDER_CONTENT_TYPE_ID)
        .await
        .unwrap();
    (repository, session, folder_type)
}

async fn publish_folder(
    session: &Session,
    folder_type: &ContentType,
    parent: u64,
    name: &str,
    description: &str,
) -> Location {
    let content = session.content_service();
    let draft = content
        .create_content(
            ContentCreateStruct::new(folder_type, "eng-GB")
                .set_field("name", name)
                .unwrap()
                .set_field("description", description)
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

/// Repository with `count` folders spread over a two level tree
async fn populated_repository(count: usize) -> (Repository, Session, Vec<Location>) {
    let (repository, session, folder_type) = setup_repository().await;
    let mut branches = Vec::new();
    for index in 0..10 {
        branches.push(
            publish_folder(
                &session,
                &folder_type,
                HOME_LOCATION_ID,
                &format!("Branch {}", index),
                "branch",
            )
            .await,
        );
    }
    for index in 0..count {
        let parent = branches[index % branches.len()].id;
        let description = format!(
            "{} {} {}",
            WORDS[index % WORDS.len()],
            WORDS[(index / 3) % WORDS.len()],
            index
        );
        publish_folder(&session, &folder_type, parent, &format!("Leaf {}", index), &description)
            .await;
    }
    (repository, session, branches)
}

fn bench_publish(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (_repository, session, folder_type) = rt.block_on(setup_repository());

    c.bench_function("create_and_publish_content", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(
                    publish_folder(&session, &folder_type, HOME_LOCATION_ID, "Bench", "bench")
                        .await,
                )
            })
        });
    });
}

fn bench_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (_repository, session, branches) = rt.block_on(populated_repository(1000));
    let subtree = branches[3].path_string.clone();

    let mut group = c.benchmark_group("search_1000_documents");
    group.bench_function("full_text", |b| {
        b.iter(|| {
            rt.block_on(async {
                let query = Query::new()
                    .with_query(SearchCriterion::FullText("harbour lantern".to_string()))
                    .with_limit(25);
                black_box(session.search_service().find_content(query, None).await.unwrap())
            })
        });
    });
    group.bench_function("subtree_filter", |b| {
        b.iter(|| {
            rt.block_on(async {
                let query = Query::filter(SearchCriterion::and(vec![
                    SearchCriterion::Subtree(vec![subtree.clone()]),
                    SearchCriterion::Visibility(Visibility::Visible),
                ]))
                .with_limit(25);
                black_box(session.search_service().find_locations(query, None).await.unwrap())
            })
        });
    });
    group.finish();
}

fn bench_move_subtree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("move_subtree_100_locations", |b| {
        b.iter_batched(
            || rt.block_on(populated_repository(100)),
            |(_repository, session, branches)| {
                rt.block_on(async {
                    session
                        .location_service()
                        .move_subtree(&branches[0], &branches[1])
                        .await
                        .unwrap()
                })
            },
            BatchSize::PerIteration,
        );
    });
}

criterion_group!(benches, bench_publish, bench_search, bench_move_subtree);
criterion_main!(benches);
