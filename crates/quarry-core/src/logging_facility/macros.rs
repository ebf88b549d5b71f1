//! Canonical logging macros
//!
//! Crates using these macros must also depend on `quarry-core-types`.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use quarry_core::log_op_start;
/// log_op_start!("find");
/// log_op_start!("find", entity = "Post");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = quarry_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = quarry_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use quarry_core::log_op_end;
/// log_op_end!("find", duration_ms = 3);
/// log_op_end!("find", duration_ms = 3, rows = 10);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = quarry_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = quarry_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Accepts anything convertible into [`QxError`](crate::errors::QxError).
///
/// # Example
///
/// ```
/// # use quarry_core::{log_op_error, errors::QuarryError};
/// let err = QuarryError::RecordNotFound { entity: "User".into(), key: "id=1".into() };
/// log_op_error!("delete", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::QxError;
        let qx_err: QxError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = quarry_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?qx_err.kind(),
            err_code = qx_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        use $crate::errors::QxError;
        let qx_err: QxError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = quarry_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?qx_err.kind(),
            err_code = qx_err.code(),
            $($field)*
        );
    }};
}
