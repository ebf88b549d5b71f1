//! Field keys and event names shared by the log macros and their consumers
//!
//! Every façade verb logs `start` then `end` or `end_error` under the same
//! `op`, tagged with the request id and the entity it touched.

pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_ENTITY: &str = "entity";

/// Records returned (reads) or affected (bulk writes)
pub const FIELD_ROWS: &str = "rows";
pub const FIELD_BATCH_LEN: &str = "batch_len";

pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
