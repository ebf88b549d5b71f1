use quarry_core_types::RequestId;
use thiserror::Error;

/// Result type alias using QuarryError
pub type Result<T> = std::result::Result<T, QuarryError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure the façade can surface is classified into one of these
/// kinds. Each kind maps to a stable error code suitable for programmatic
/// handling and for external responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QxErrorKind {
    /// Singular lookup, update or delete target is absent
    NotFound,
    /// A connect target is absent, or a foreign key would dangle
    ReferentialViolation,
    /// A unique field would collide
    UniquenessViolation,
    /// The store cannot honour the requested guarantee (e.g. atomic batch)
    UnsupportedOperation,
    /// Malformed filter, projection or mutation descriptor
    ValidationError,

    // Integration/IO
    Persistence,
    Serialization,
    Io,

    // Internal
    Internal,
}

impl QxErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            QxErrorKind::NotFound => "ERR_NOT_FOUND",
            QxErrorKind::ReferentialViolation => "ERR_REFERENTIAL_VIOLATION",
            QxErrorKind::UniquenessViolation => "ERR_UNIQUENESS_VIOLATION",
            QxErrorKind::UnsupportedOperation => "ERR_UNSUPPORTED_OPERATION",
            QxErrorKind::ValidationError => "ERR_VALIDATION",
            QxErrorKind::Persistence => "ERR_PERSISTENCE",
            QxErrorKind::Serialization => "ERR_SERIALIZATION",
            QxErrorKind::Io => "ERR_IO",
            QxErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind for programmatic handling plus optional
/// context (operation, entity, record key, request id) for debugging.
#[derive(Debug, Clone)]
pub struct QxError {
    kind: QxErrorKind,
    op: Option<String>,
    entity: Option<String>,
    record_key: Option<String>,
    field: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl QxError {
    /// Create a new error with the specified kind
    pub fn new(kind: QxErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            record_key: None,
            field: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add record key context (`id=3`, `email=a@b.io`)
    pub fn with_record_key(mut self, key: impl Into<String>) -> Self {
        self.record_key = Some(key.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> QxErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn record_key(&self) -> Option<&str> {
        self.record_key.as_deref()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Fill in the operation name unless a more specific one is already set
    pub fn or_op(mut self, op: &str) -> Self {
        if self.op.is_none() {
            self.op = Some(op.to_string());
        }
        self
    }
}

impl std::fmt::Display for QxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(key) = &self.record_key {
            write!(f, " (key: {})", key)?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        Ok(())
    }
}

impl std::error::Error for QxError {}

// ========== End Error Facility ==========

/// Typed failures raised while validating or executing a query descriptor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuarryError {
    // ===== Lookup =====
    #[error("{entity} not found: {key}")]
    RecordNotFound { entity: String, key: String },

    // ===== Referential =====
    #[error("Cannot connect {entity}.{relation}: no record with {key}")]
    ConnectTargetMissing {
        entity: String,
        relation: String,
        key: String,
    },

    #[error("Foreign key on {entity} would dangle: {message}")]
    DanglingReference { entity: String, message: String },

    // ===== Uniqueness =====
    #[error("Unique constraint failed on {entity}.{field}")]
    UniqueConstraint { entity: String, field: String },

    // ===== Capability =====
    #[error("Atomic batch unavailable: {reason}")]
    AtomicCommitUnavailable { reason: String },

    // ===== Validation =====
    #[error("Unknown field '{field}' on {entity}")]
    UnknownField { entity: String, field: String },

    #[error("Unknown relation '{relation}' on {entity}")]
    UnknownRelation { entity: String, relation: String },

    #[error("Quantifier '{quantifier}' cannot be used on {entity}.{relation}")]
    QuantifierMismatch {
        entity: String,
        relation: String,
        quantifier: String,
    },

    #[error("Field {entity}.{field} expects {expected}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: String,
    },

    #[error("Missing required field {entity}.{field}")]
    MissingRequiredField { entity: String, field: String },

    #[error("Field {entity}.{field} is assigned by the store")]
    ReadOnlyField { entity: String, field: String },

    #[error("Field {entity}.{field} is not unique and cannot identify a record")]
    NotUnique { entity: String, field: String },

    #[error("Invalid descriptor: {reason}")]
    InvalidDescriptor { reason: String },

    // ===== Integration =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl QuarryError {
    /// Shorthand for an [`QuarryError::InvalidDescriptor`]
    pub fn invalid(reason: impl Into<String>) -> Self {
        QuarryError::InvalidDescriptor {
            reason: reason.into(),
        }
    }
}

impl From<QuarryError> for QxError {
    fn from(err: QuarryError) -> Self {
        let message = err.to_string();
        match err {
            QuarryError::RecordNotFound { entity, key } => QxError::new(QxErrorKind::NotFound)
                .with_entity(entity)
                .with_record_key(key)
                .with_message(message),

            QuarryError::ConnectTargetMissing { entity, key, .. } => {
                QxError::new(QxErrorKind::ReferentialViolation)
                    .with_entity(entity)
                    .with_record_key(key)
                    .with_message(message)
            }

            QuarryError::DanglingReference { entity, .. } => {
                QxError::new(QxErrorKind::ReferentialViolation)
                    .with_entity(entity)
                    .with_message(message)
            }

            QuarryError::UniqueConstraint { entity, field } => {
                QxError::new(QxErrorKind::UniquenessViolation)
                    .with_entity(entity)
                    .with_field(field)
                    .with_message(message)
            }

            QuarryError::AtomicCommitUnavailable { .. } => {
                QxError::new(QxErrorKind::UnsupportedOperation)
                    .with_op("run_atomic_batch")
                    .with_message(message)
            }

            QuarryError::UnknownField { entity, field }
            | QuarryError::TypeMismatch { entity, field, .. }
            | QuarryError::MissingRequiredField { entity, field }
            | QuarryError::ReadOnlyField { entity, field }
            | QuarryError::NotUnique { entity, field } => {
                QxError::new(QxErrorKind::ValidationError)
                    .with_entity(entity)
                    .with_field(field)
                    .with_message(message)
            }

            QuarryError::UnknownRelation { entity, relation }
            | QuarryError::QuantifierMismatch {
                entity, relation, ..
            } => QxError::new(QxErrorKind::ValidationError)
                .with_entity(entity)
                .with_field(relation)
                .with_message(message),

            QuarryError::InvalidDescriptor { .. } => {
                QxError::new(QxErrorKind::ValidationError).with_message(message)
            }

            QuarryError::Serialization { .. } => {
                QxError::new(QxErrorKind::Serialization).with_message(message)
            }

            QuarryError::Persistence { .. } => {
                QxError::new(QxErrorKind::Persistence).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        QuarryError::Serialization {
            message: err.to_string(),
        }
    }
}
