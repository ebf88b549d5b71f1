// Façade verbs emit start/end events carrying the caller's request id

use quarry_core::logging_facility::test_capture::init_test_capture;
use quarry_core::{Entity, FindArgs, Mutation, Patch};
use quarry_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_DURATION_MS, FIELD_ENTITY, FIELD_ERR_CODE,
    FIELD_BATCH_LEN, FIELD_REQUEST_ID, FIELD_ROWS,
};
use quarry_core_types::{RequestContext, RequestId};
use quarry_store::{Database, Facade};

#[test]
fn test_find_logs_start_and_end_with_rows() {
    // Given: A capture and a façade with a known request id
    let capture = init_test_capture();
    let mut db = Database::open_in_memory().unwrap();
    let ctx = RequestContext::with_request_id(RequestId::from_string("req-find-log".into()));
    let mut facade = Facade::with_context(&mut db, ctx);

    // When
    facade.find(Entity::User, &FindArgs::new()).unwrap();

    // Then: Both events carry the request id, the end event a row count
    let events: Vec<_> = capture
        .events_for_op("find")
        .into_iter()
        .filter(|e| e.field(FIELD_REQUEST_ID) == Some("req-find-log"))
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[0].field(FIELD_ENTITY), Some("User"));
    assert_eq!(events[1].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[1].field(FIELD_ROWS), Some("0"));
    assert!(events[1].field(FIELD_DURATION_MS).is_some());
}

#[test]
fn test_failed_update_logs_error_and_tags_request() {
    // Given
    let capture = init_test_capture();
    let mut db = Database::open_in_memory().unwrap();
    let ctx = RequestContext::with_request_id(RequestId::from_string("req-update-log".into()));
    let mut facade = Facade::with_context(&mut db, ctx);

    // When: Updating a record that does not exist
    let err = facade
        .update(Entity::Post, 1, &Patch::new().set("title", "x"))
        .unwrap_err();

    // Then: The error carries the request id and an end_error event was logged
    assert_eq!(err.request_id().map(RequestId::as_str), Some("req-update-log"));
    let logged = capture.count_events(|e| {
        e.op.as_deref() == Some("update")
            && e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.field(FIELD_REQUEST_ID) == Some("req-update-log")
            && e.field(FIELD_ERR_CODE) == Some("ERR_NOT_FOUND")
    });
    assert_eq!(logged, 1);
}

#[test]
fn test_atomic_batch_logs_its_length() {
    // Given
    let capture = init_test_capture();
    let mut db = Database::open_in_memory().unwrap();
    let mut facade = Facade::new(&mut db);
    let mutations = vec![
        Mutation::DeleteMany {
            entity: Entity::Post,
            filter: quarry_core::Filter::nothing(),
        };
        7
    ];

    // When
    facade.run_atomic_batch(&mutations).unwrap();

    // Then: The prepared batch is logged with its length
    let logged = capture.count_events(|e| e.field(FIELD_BATCH_LEN) == Some("7"));
    assert_eq!(logged, 1);
}
