//! Named showcase queries.
//!
//! `apply_showcase` is the single entry point: it runs one
//! [`ShowcaseQuery`] against a façade and returns the result as JSON.
//! Every query exercises one façade capability on the default seed.

#![allow(clippy::result_large_err)]

use std::str::FromStr;
use std::time::Instant;

use quarry_core::errors::{QxError, QxErrorKind};
use quarry_core::query::{
    ConnectOrCreate, Predicate, RelationSelection, SelectItem,
};
use quarry_core::{
    log_op_end, log_op_error, log_op_start, Aggregation, CreateData, Entity, Filter, FindArgs,
    GroupByArgs, Mutation, Page, Patch, Projection, Record, RelationWrite, Sort, UniqueWhere,
};
use quarry_store::errors::Result;
use quarry_store::Facade;
use serde_json::Value;

// ---------------------------------------------------------------------------
// ShowcaseQuery
// ---------------------------------------------------------------------------

/// One entry of the showcase catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowcaseQuery {
    // ── Filters ──────────────────────────────────────────────────────────────
    /// Title contains "github" or "twitter", written by author 3.
    PostsByKeyword,
    /// Id not greater than 2, or name starting with "s".
    UsersLowIdOrS,
    /// Users all of whose posts are published.
    UsersAllPublished,
    /// Posts by Jack whose author email does not start with "cool",
    /// including the author's name.
    PostsByAuthor,
    /// Post titles with the author's name.
    PostsSelected,

    // ── Aggregation / ordering ───────────────────────────────────────────────
    LikesAggregate,
    LikesByAuthor,
    PostsSorted,
    /// Offset pagination: page `page` of `size` posts.
    PostsPage { page: u64, size: u64 },
    /// Cursor pagination: `size` posts after post `cursor`.
    PostsAfter { cursor: i64, size: u64 },

    // ── Writes ───────────────────────────────────────────────────────────────
    /// Create a user with a post connected to categories 1 and 2.
    AddUser,
    /// Create a user with a post that connects or creates category 3.
    AddUserConnectOrCreate,
    /// Bulk create three users, one a duplicate, skipping duplicates.
    AddManyUsers,
    CreateUser { name: String, email: String },
    RenameUser { id: i64, name: String },
    UpsertUser { id: i64 },
    DeleteUser { id: i64 },
    /// Move `amount` likes from one post to another atomically.
    TransferLikes { from: i64, to: i64, amount: i64 },
}

/// Catalogue names with their argument synopsis, in display order.
pub const CATALOGUE: &[(&str, &str)] = &[
    ("posts-by-keyword", ""),
    ("users-low-id-or-s", ""),
    ("users-all-published", ""),
    ("posts-by-author", ""),
    ("posts-selected", ""),
    ("likes-aggregate", ""),
    ("likes-by-author", ""),
    ("posts-sorted", ""),
    ("posts-page", "<page> <size>"),
    ("posts-after", "<cursor> <size>"),
    ("add-user", ""),
    ("add-user-connect-or-create", ""),
    ("add-many-users", ""),
    ("create-user", "<name> <email>"),
    ("rename-user", "<id> [name]"),
    ("upsert-user", "<id>"),
    ("delete-user", "<id>"),
    ("transfer-likes", "[from to amount]"),
];

fn invalid_args(name: &str, message: impl Into<String>) -> QxError {
    QxError::new(QxErrorKind::ValidationError)
        .with_op("showcase_parse")
        .with_message(format!("{}: {}", name, message.into()))
}

fn arg<T: FromStr>(name: &str, args: &[String], index: usize, what: &str) -> Result<T> {
    let raw = args
        .get(index)
        .ok_or_else(|| invalid_args(name, format!("missing argument <{}>", what)))?;
    raw.parse()
        .map_err(|_| invalid_args(name, format!("<{}> is not valid: '{}'", what, raw)))
}

fn arg_or<T: FromStr>(name: &str, args: &[String], index: usize, what: &str, default: T) -> Result<T> {
    if args.len() > index {
        arg(name, args, index, what)
    } else {
        Ok(default)
    }
}

impl ShowcaseQuery {
    /// Resolve a catalogue name and its positional arguments
    pub fn from_args(name: &str, args: &[String]) -> Result<Self> {
        let query = match name {
            "posts-by-keyword" => ShowcaseQuery::PostsByKeyword,
            "users-low-id-or-s" => ShowcaseQuery::UsersLowIdOrS,
            "users-all-published" => ShowcaseQuery::UsersAllPublished,
            "posts-by-author" => ShowcaseQuery::PostsByAuthor,
            "posts-selected" => ShowcaseQuery::PostsSelected,
            "likes-aggregate" => ShowcaseQuery::LikesAggregate,
            "likes-by-author" => ShowcaseQuery::LikesByAuthor,
            "posts-sorted" => ShowcaseQuery::PostsSorted,
            "posts-page" => ShowcaseQuery::PostsPage {
                page: arg(name, args, 0, "page")?,
                size: arg(name, args, 1, "size")?,
            },
            "posts-after" => ShowcaseQuery::PostsAfter {
                cursor: arg(name, args, 0, "cursor")?,
                size: arg(name, args, 1, "size")?,
            },
            "add-user" => ShowcaseQuery::AddUser,
            "add-user-connect-or-create" => ShowcaseQuery::AddUserConnectOrCreate,
            "add-many-users" => ShowcaseQuery::AddManyUsers,
            "create-user" => ShowcaseQuery::CreateUser {
                name: arg(name, args, 0, "name")?,
                email: arg(name, args, 1, "email")?,
            },
            "rename-user" => ShowcaseQuery::RenameUser {
                id: arg(name, args, 0, "id")?,
                name: arg_or(name, args, 1, "name", "updated Name".to_string())?,
            },
            "upsert-user" => ShowcaseQuery::UpsertUser {
                id: arg(name, args, 0, "id")?,
            },
            "delete-user" => ShowcaseQuery::DeleteUser {
                id: arg(name, args, 0, "id")?,
            },
            "transfer-likes" => ShowcaseQuery::TransferLikes {
                from: arg_or(name, args, 0, "from", 4)?,
                to: arg_or(name, args, 1, "to", 5)?,
                amount: arg_or(name, args, 2, "amount", 5)?,
            },
            other => {
                return Err(invalid_args(other, "unknown showcase query"));
            }
        };
        Ok(query)
    }

    /// Catalogue name; also the op name in logs
    pub fn name(&self) -> &'static str {
        match self {
            ShowcaseQuery::PostsByKeyword => "posts-by-keyword",
            ShowcaseQuery::UsersLowIdOrS => "users-low-id-or-s",
            ShowcaseQuery::UsersAllPublished => "users-all-published",
            ShowcaseQuery::PostsByAuthor => "posts-by-author",
            ShowcaseQuery::PostsSelected => "posts-selected",
            ShowcaseQuery::LikesAggregate => "likes-aggregate",
            ShowcaseQuery::LikesByAuthor => "likes-by-author",
            ShowcaseQuery::PostsSorted => "posts-sorted",
            ShowcaseQuery::PostsPage { .. } => "posts-page",
            ShowcaseQuery::PostsAfter { .. } => "posts-after",
            ShowcaseQuery::AddUser => "add-user",
            ShowcaseQuery::AddUserConnectOrCreate => "add-user-connect-or-create",
            ShowcaseQuery::AddManyUsers => "add-many-users",
            ShowcaseQuery::CreateUser { .. } => "create-user",
            ShowcaseQuery::RenameUser { .. } => "rename-user",
            ShowcaseQuery::UpsertUser { .. } => "upsert-user",
            ShowcaseQuery::DeleteUser { .. } => "delete-user",
            ShowcaseQuery::TransferLikes { .. } => "transfer-likes",
        }
    }

    /// True when the query writes to the store
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            ShowcaseQuery::AddUser
                | ShowcaseQuery::AddUserConnectOrCreate
                | ShowcaseQuery::AddManyUsers
                | ShowcaseQuery::CreateUser { .. }
                | ShowcaseQuery::RenameUser { .. }
                | ShowcaseQuery::UpsertUser { .. }
                | ShowcaseQuery::DeleteUser { .. }
                | ShowcaseQuery::TransferLikes { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

fn records(rows: Vec<Record>) -> Value {
    Value::Array(rows.into_iter().map(Record::into_json).collect())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| {
        QxError::new(QxErrorKind::Serialization)
            .with_op("showcase_render")
            .with_message(e.to_string())
    })
}

fn author_name() -> RelationSelection {
    RelationSelection::new("author", Projection::fields(["name"]))
}

/// A post published straight away, filed under `categories`
fn crash_course(categories: RelationWrite) -> CreateData {
    CreateData::new()
        .set("title", "Crash course on prism")
        .set("published", true)
        .relate("categories", categories)
}

fn keyword_filter() -> Filter {
    Filter::or([
        Filter::field("title", Predicate::contains("github")),
        Filter::field("title", Predicate::contains("twitter")),
    ])
    .and_also(Filter::equals("authorId", 3))
}

fn low_id_or_s_filter() -> Filter {
    Filter::or([
        Filter::field("id", Predicate::negate(Predicate::gt(2))),
        Filter::field("name", Predicate::starts_with("s")),
    ])
}

fn by_author_filter() -> Filter {
    Filter::is("author", Filter::equals("name", "Jack")).and_also(Filter::is_not(
        "author",
        Filter::field("email", Predicate::starts_with("cool")),
    ))
}

// ---------------------------------------------------------------------------
// apply_showcase
// ---------------------------------------------------------------------------

/// Run one showcase query and render its result.
///
/// # Errors
///
/// Whatever the underlying façade verb reports.
pub fn apply_showcase(facade: &mut Facade<'_>, query: &ShowcaseQuery) -> Result<Value> {
    let op = query.name();
    log_op_start!(op, request_id = %facade.context().request_id);
    let start = Instant::now();

    let result = run(facade, query);

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => log_op_end!(op, duration_ms = elapsed),
        Err(e) => {
            let e_clone = e.clone();
            log_op_error!(op, e_clone, duration_ms = elapsed);
        }
    }
    result
}

fn run(facade: &mut Facade<'_>, query: &ShowcaseQuery) -> Result<Value> {
    match query {
        // ── Filters ──────────────────────────────────────────────────────────
        ShowcaseQuery::PostsByKeyword => {
            let rows = facade.find(Entity::Post, &FindArgs::new().filter(keyword_filter()))?;
            Ok(records(rows))
        }
        ShowcaseQuery::UsersLowIdOrS => {
            let rows = facade.find(Entity::User, &FindArgs::new().filter(low_id_or_s_filter()))?;
            Ok(records(rows))
        }
        ShowcaseQuery::UsersAllPublished => {
            let filter = Filter::every("posts", Filter::equals("published", true));
            let rows = facade.find(Entity::User, &FindArgs::new().filter(filter))?;
            Ok(records(rows))
        }
        ShowcaseQuery::PostsByAuthor => {
            let args = FindArgs::new()
                .filter(by_author_filter())
                .projection(Projection::include([author_name()]));
            Ok(records(facade.find(Entity::Post, &args)?))
        }
        ShowcaseQuery::PostsSelected => {
            let projection = Projection::select([
                SelectItem::field("title"),
                SelectItem::Relation(author_name()),
            ]);
            let rows = facade.find(Entity::Post, &FindArgs::new().projection(projection))?;
            Ok(records(rows))
        }

        // ── Aggregation / ordering ───────────────────────────────────────────
        ShowcaseQuery::LikesAggregate => {
            Ok(facade.aggregate(Entity::Post, "likeNum", None)?.to_json())
        }
        ShowcaseQuery::LikesByAuthor => {
            let args = GroupByArgs::by(["authorId"])
                .aggregate(Aggregation::sum("likeNum"))
                .aggregate(Aggregation::avg("likeNum"));
            let groups = facade.group_by(Entity::Post, &args)?;
            Ok(Value::Array(groups.iter().map(|g| g.to_json()).collect()))
        }
        ShowcaseQuery::PostsSorted => {
            let rows = facade.find(Entity::Post, &FindArgs::new().sort(Sort::asc("likeNum")))?;
            Ok(records(rows))
        }
        ShowcaseQuery::PostsPage { page, size } => {
            let args = FindArgs::new().page(Page::Offset {
                index: *page,
                size: *size,
            });
            Ok(records(facade.find(Entity::Post, &args)?))
        }
        ShowcaseQuery::PostsAfter { cursor, size } => {
            let args = FindArgs::new().page(Page::Cursor {
                after: *cursor,
                size: *size,
            });
            Ok(records(facade.find(Entity::Post, &args)?))
        }

        // ── Writes ───────────────────────────────────────────────────────────
        ShowcaseQuery::AddUser => {
            let data = CreateData::new()
                .set("email", "sakura@prisma.io")
                .set("name", "sakura dev")
                .set("role", "USER")
                .relate(
                    "posts",
                    RelationWrite::create([crash_course(RelationWrite::connect([
                        UniqueWhere::Id(1),
                        UniqueWhere::Id(2),
                    ]))]),
                );
            Ok(facade.create(Entity::User, &data)?.into_json())
        }
        ShowcaseQuery::AddUserConnectOrCreate => {
            let data = CreateData::new()
                .set("email", "sasuke@prisma.io")
                .set("name", "sasuke")
                .set("role", "USER")
                .relate(
                    "posts",
                    RelationWrite::create([crash_course(RelationWrite::connect_or_create([
                        ConnectOrCreate::new(
                            UniqueWhere::Id(3),
                            CreateData::new().set("name", "AI"),
                        ),
                    ]))]),
                );
            Ok(facade.create(Entity::User, &data)?.into_json())
        }
        ShowcaseQuery::AddManyUsers => {
            let rows = [
                ("Yewande", "yewande@prisma.io"),
                ("Yewande", "yewande@prisma.io"),
                ("Angelique", "angelique@prisma.io"),
            ]
            .map(|(name, email)| CreateData::new().set("name", name).set("email", email));
            to_json(&facade.create_many(Entity::User, &rows, true)?)
        }
        ShowcaseQuery::CreateUser { name, email } => {
            let data = CreateData::new()
                .set("name", name.as_str())
                .set("email", email.as_str());
            Ok(facade.create(Entity::User, &data)?.into_json())
        }
        ShowcaseQuery::RenameUser { id, name } => {
            let patch = Patch::new().set("name", name.as_str());
            Ok(facade.update(Entity::User, *id, &patch)?.into_json())
        }
        ShowcaseQuery::UpsertUser { id } => {
            let record = facade.upsert(
                Entity::User,
                &UniqueWhere::Id(*id),
                &Patch::new().set("name", "founder"),
                &CreateData::new()
                    .set("name", "captain")
                    .set("email", "capatin@f.com"),
            )?;
            Ok(record.into_json())
        }
        ShowcaseQuery::DeleteUser { id } => Ok(facade.delete(Entity::User, *id)?.into_json()),
        ShowcaseQuery::TransferLikes { from, to, amount } => {
            let results = facade.run_atomic_batch(&[
                Mutation::Update {
                    entity: Entity::Post,
                    id: *from,
                    patch: Patch::new().decrement("likeNum", *amount),
                },
                Mutation::Update {
                    entity: Entity::Post,
                    id: *to,
                    patch: Patch::new().increment("likeNum", *amount),
                },
            ])?;
            to_json(&results)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_every_catalogue_name_round_trips() {
        for (name, synopsis) in CATALOGUE {
            // Fill required arguments with plausible values
            let raw: Vec<String> = match *name {
                "create-user" => args(&["a", "a@x"]),
                _ => synopsis
                    .split_whitespace()
                    .filter(|s| s.starts_with('<'))
                    .map(|_| "1".to_string())
                    .collect(),
            };
            let query = ShowcaseQuery::from_args(name, &raw).unwrap();
            assert_eq!(query.name(), *name);
        }
    }

    #[test]
    fn test_optional_arguments_default() {
        let query = ShowcaseQuery::from_args("transfer-likes", &[]).unwrap();
        assert_eq!(
            query,
            ShowcaseQuery::TransferLikes {
                from: 4,
                to: 5,
                amount: 5
            }
        );

        let query = ShowcaseQuery::from_args("rename-user", &args(&["2"])).unwrap();
        assert_eq!(
            query,
            ShowcaseQuery::RenameUser {
                id: 2,
                name: "updated Name".to_string()
            }
        );
    }

    #[test]
    fn test_bad_arguments_are_validation_errors() {
        let missing = ShowcaseQuery::from_args("posts-page", &args(&["1"])).unwrap_err();
        let malformed = ShowcaseQuery::from_args("delete-user", &args(&["x"])).unwrap_err();
        let unknown = ShowcaseQuery::from_args("drop-tables", &[]).unwrap_err();

        for err in [missing, malformed, unknown] {
            assert_eq!(err.kind(), QxErrorKind::ValidationError);
            assert_eq!(err.op(), Some("showcase_parse"));
        }
    }

    #[test]
    fn test_keyword_filter_shape() {
        match keyword_filter() {
            Filter::And(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[0], Filter::Or(ref alts) if alts.len() == 2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
