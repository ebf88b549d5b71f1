// Integration tests: every showcase query against the default seed

use quarry_core::{Entity, QxErrorKind};
use quarry_engine::commands::showcase::{apply_showcase, ShowcaseQuery, CATALOGUE};
use quarry_store::seed::import_default_seed;
use quarry_store::{Database, Facade};
use serde_json::{json, Value};

fn seeded_db() -> Database {
    let mut db = Database::open_in_memory().unwrap();
    import_default_seed(&mut db).unwrap();
    db
}

fn run(db: &mut Database, name: &str, args: &[&str]) -> Value {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let query = ShowcaseQuery::from_args(name, &args).unwrap();
    apply_showcase(&mut Facade::new(db), &query).unwrap()
}

fn ids(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["id"].as_i64())
        .collect()
}

#[test]
fn test_filter_queries() {
    let mut db = seeded_db();

    assert_eq!(ids(&run(&mut db, "posts-by-keyword", &[])), vec![4]);
    assert_eq!(ids(&run(&mut db, "users-low-id-or-s", &[])), vec![1, 2, 3]);
    assert_eq!(ids(&run(&mut db, "users-all-published", &[])), vec![1, 2]);

    let by_author = run(&mut db, "posts-by-author", &[]);
    assert_eq!(ids(&by_author), vec![3]);
    assert_eq!(by_author[0]["author"], json!({"name": "Jack"}));
    assert_eq!(by_author[0]["likeNum"], json!(0));
}

#[test]
fn test_selected_posts_carry_only_requested_fields() {
    let mut db = seeded_db();

    let posts = run(&mut db, "posts-selected", &[]);

    assert_eq!(posts.as_array().unwrap().len(), 5);
    assert_eq!(
        posts[0],
        json!({"title": "Join the Prisma Slack", "author": {"name": "John"}})
    );
}

#[test]
fn test_aggregate_queries() {
    let mut db = seeded_db();

    let summary = run(&mut db, "likes-aggregate", &[]);
    assert_eq!(
        summary,
        json!({
            "_count": {"id": 5},
            "_sum": {"likeNum": 10},
            "_avg": {"likeNum": 2.0},
            "_min": {"likeNum": 0},
            "_max": {"likeNum": 10},
        })
    );

    let groups = run(&mut db, "likes-by-author", &[]);
    assert_eq!(groups.as_array().unwrap().len(), 3);
    assert_eq!(
        groups[0],
        json!({"authorId": 1, "_sum": {"likeNum": 10}, "_avg": {"likeNum": 5.0}})
    );
}

#[test]
fn test_sorted_and_paged_posts() {
    let mut db = seeded_db();

    assert_eq!(ids(&run(&mut db, "posts-sorted", &[])), vec![2, 3, 4, 5, 1]);
    assert_eq!(ids(&run(&mut db, "posts-page", &["1", "2"])), vec![3, 4]);
    assert_eq!(ids(&run(&mut db, "posts-after", &["2", "2"])), vec![3, 4]);
    assert_eq!(ids(&run(&mut db, "posts-after", &["5", "2"])), Vec::<i64>::new());
}

#[test]
fn test_nested_create_queries() {
    let mut db = seeded_db();

    let sakura = run(&mut db, "add-user", &[]);
    let sasuke = run(&mut db, "add-user-connect-or-create", &[]);

    assert_eq!(sakura["email"], json!("sakura@prisma.io"));
    assert_eq!(sasuke["name"], json!("sasuke"));
    let (categories, links): (i64, i64) = db
        .conn()
        .query_row(
            "SELECT (SELECT COUNT(*) FROM categories), (SELECT COUNT(*) FROM post_categories)",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    // Category 3 "AI" is created; six seed links plus two plus one
    assert_eq!(categories, 3);
    assert_eq!(links, 9);
}

#[test]
fn test_add_many_users_skips_duplicate() {
    let mut db = seeded_db();

    assert_eq!(run(&mut db, "add-many-users", &[]), json!({"count": 2}));
    assert_eq!(run(&mut db, "add-many-users", &[]), json!({"count": 0}));
}

#[test]
fn test_user_lifecycle_queries() {
    let mut db = seeded_db();

    let created = run(&mut db, "create-user", &["Dana", "dana@x.io"]);
    let id = created["id"].as_i64().unwrap().to_string();
    assert_eq!(created["role"], json!("USER"));

    let renamed = run(&mut db, "rename-user", &[&id]);
    assert_eq!(renamed["name"], json!("updated Name"));

    let first = run(&mut db, "upsert-user", &["99"]);
    let second = run(&mut db, "upsert-user", &["99"]);
    assert_eq!(first["name"], json!("captain"));
    assert_eq!(first["id"], json!(99));
    assert_eq!(second["name"], json!("founder"));

    let deleted = run(&mut db, "delete-user", &["1"]);
    assert_eq!(deleted["name"], json!("John"));
    let mut facade = Facade::new(&mut db);
    assert_eq!(facade.count(Entity::Post, None).unwrap(), 3);
}

#[test]
fn test_transfer_likes_is_atomic() {
    let mut db = seeded_db();

    let moved = run(&mut db, "transfer-likes", &[]);
    assert_eq!(moved[0]["likeNum"], json!(-5));
    assert_eq!(moved[1]["likeNum"], json!(5));

    // Target missing: nothing moves
    let query = ShowcaseQuery::from_args(
        "transfer-likes",
        &["1".to_string(), "404".to_string(), "3".to_string()],
    )
    .unwrap();
    let err = apply_showcase(&mut Facade::new(&mut db), &query).unwrap_err();
    assert_eq!(err.kind(), QxErrorKind::NotFound);
    let posts = run(&mut db, "posts-sorted", &[]);
    let post_one = posts
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == json!(1))
        .unwrap();
    assert_eq!(post_one["likeNum"], json!(10));
}

#[test]
fn test_catalogue_has_eighteen_entries() {
    assert_eq!(CATALOGUE.len(), 18);
}
