// Integration tests for run_atomic_batch

use quarry_core::{
    CreateData, Entity, Filter, Mutation, Patch, Projection, QxErrorKind, UniqueWhere,
};
use quarry_store::db::JournalMode;
use quarry_store::seed::import_default_seed;
use quarry_store::{Database, Facade, StoreConfig};

fn seeded_db() -> Database {
    let mut db = Database::open_in_memory().unwrap();
    import_default_seed(&mut db).unwrap();
    db
}

fn likes(facade: &mut Facade<'_>, id: i64) -> Option<i64> {
    facade
        .find_unique(Entity::Post, &UniqueWhere::Id(id), &Projection::All)
        .unwrap()
        .and_then(|r| r.get_i64("likeNum"))
}

#[test]
fn test_batch_rolls_back_when_a_mutation_fails() {
    // Given: Post 4 with 0 likes
    let mut db = seeded_db();
    let mut facade = Facade::new(&mut db);

    // When: Decrementing post 4, then updating a missing post
    let err = facade
        .run_atomic_batch(&[
            Mutation::Update {
                entity: Entity::Post,
                id: 4,
                patch: Patch::new().decrement("likeNum", 5),
            },
            Mutation::Update {
                entity: Entity::Post,
                id: 999,
                patch: Patch::new().increment("likeNum", 5),
            },
        ])
        .unwrap_err();

    // Then: NotFound names the failing mutation, and post 4 is unchanged
    assert_eq!(err.kind(), QxErrorKind::NotFound);
    assert_eq!(err.op(), Some("run_atomic_batch"));
    assert!(err.message().starts_with("batch mutation #1 (update Post)"));
    assert_eq!(likes(&mut facade, 4), Some(0));
}

#[test]
fn test_batch_validates_before_writing() {
    let mut db = seeded_db();
    let mut facade = Facade::new(&mut db);

    let err = facade
        .run_atomic_batch(&[
            Mutation::Delete {
                entity: Entity::Post,
                id: 1,
            },
            Mutation::Update {
                entity: Entity::Post,
                id: 2,
                patch: Patch::new().set("nope", 1),
            },
        ])
        .unwrap_err();

    assert_eq!(err.kind(), QxErrorKind::ValidationError);
    assert_eq!(facade.count(Entity::Post, None).unwrap(), 5);
}

#[test]
fn test_batch_commits_every_result() {
    // Given: The default seed
    let mut db = seeded_db();
    let mut facade = Facade::new(&mut db);

    // When: A mixed batch succeeds
    let results = facade
        .run_atomic_batch(&[
            Mutation::Create {
                entity: Entity::Category,
                data: CreateData::new().set("name", "Rust"),
            },
            Mutation::UpdateMany {
                entity: Entity::Post,
                filter: Filter::equals("authorId", 1),
                patch: Patch::new().increment("likeNum", 1),
            },
            Mutation::Upsert {
                entity: Entity::User,
                where_: UniqueWhere::field("email", "new@x"),
                update: Patch::new().set("name", "again"),
                create: CreateData::new().set("name", "New"),
            },
            Mutation::DeleteMany {
                entity: Entity::Post,
                filter: Filter::equals("published", false),
            },
        ])
        .unwrap();

    // Then: One result per mutation, all effects visible
    assert_eq!(results.len(), 4);
    assert_eq!(
        results[0].record().and_then(|r| r.get_str("name")),
        Some("Rust")
    );
    assert_eq!(results[1].count(), Some(2));
    assert_eq!(
        results[2].record().and_then(|r| r.get_str("email")),
        Some("new@x")
    );
    assert_eq!(results[3].count(), Some(1));
    assert_eq!(likes(&mut facade, 1), Some(11));
    assert_eq!(facade.count(Entity::Post, None).unwrap(), 4);
}

#[test]
fn test_empty_batch_is_a_no_op() {
    let mut db = seeded_db();
    let mut facade = Facade::new(&mut db);

    let results = facade.run_atomic_batch(&[]).unwrap();

    assert!(results.is_empty());
}

#[test]
fn test_batch_unsupported_without_journal() {
    // Given: A connection whose journal is off
    let mut db =
        Database::open(StoreConfig::in_memory().with_journal_mode(JournalMode::Off)).unwrap();
    let mut facade = Facade::new(&mut db);

    // When
    let err = facade
        .run_atomic_batch(&[Mutation::Create {
            entity: Entity::Category,
            data: CreateData::new().set("name", "x"),
        }])
        .unwrap_err();

    // Then: Refused up front, nothing written
    assert_eq!(err.kind(), QxErrorKind::UnsupportedOperation);
    assert_eq!(facade.count(Entity::Category, None).unwrap(), 0);
}

#[test]
fn test_batch_unsupported_inside_open_transaction() {
    // Given: A transaction someone else opened on the connection
    let mut db = seeded_db();
    db.conn().execute_batch("BEGIN").unwrap();
    let mut facade = Facade::new(&mut db);

    // When
    let err = facade
        .run_atomic_batch(&[Mutation::Delete {
            entity: Entity::Post,
            id: 1,
        }])
        .unwrap_err();

    // Then
    assert_eq!(err.kind(), QxErrorKind::UnsupportedOperation);
    assert_eq!(err.code(), "ERR_UNSUPPORTED_OPERATION");
}
