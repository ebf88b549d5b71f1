use quarry_core::errors::{QuarryError, QxError, QxErrorKind};
use quarry_core_types::RequestId;

#[test]
fn test_record_not_found_verifiable_by_kind() {
    let err = QuarryError::RecordNotFound {
        entity: "Post".to_string(),
        key: "id=999".to_string(),
    };

    let qx: QxError = err.into();

    assert_eq!(qx.kind(), QxErrorKind::NotFound);
    assert_eq!(qx.code(), "ERR_NOT_FOUND");
    assert_eq!(qx.entity(), Some("Post"));
    assert_eq!(qx.record_key(), Some("id=999"));
    assert_eq!(qx.message(), "Post not found: id=999");
}

#[test]
fn test_connect_target_missing_is_referential() {
    let err = QuarryError::ConnectTargetMissing {
        entity: "Post".to_string(),
        relation: "categories".to_string(),
        key: "id=42".to_string(),
    };

    let qx: QxError = err.into();

    assert_eq!(qx.kind(), QxErrorKind::ReferentialViolation);
    assert_eq!(qx.record_key(), Some("id=42"));
    assert!(qx.message().contains("categories"));
}

#[test]
fn test_dangling_reference_distinct_from_not_found() {
    let qx: QxError = QuarryError::DanglingReference {
        entity: "Post".to_string(),
        message: "FOREIGN KEY constraint failed".to_string(),
    }
    .into();

    assert_eq!(qx.kind(), QxErrorKind::ReferentialViolation);
    assert_ne!(qx.kind(), QxErrorKind::NotFound);
}

#[test]
fn test_unique_constraint_carries_field() {
    let qx: QxError = QuarryError::UniqueConstraint {
        entity: "User".to_string(),
        field: "email".to_string(),
    }
    .into();

    assert_eq!(qx.kind(), QxErrorKind::UniquenessViolation);
    assert_eq!(qx.code(), "ERR_UNIQUENESS_VIOLATION");
    assert_eq!(qx.field(), Some("email"));
}

#[test]
fn test_atomic_commit_unavailable_is_unsupported() {
    let qx: QxError = QuarryError::AtomicCommitUnavailable {
        reason: "journal off".to_string(),
    }
    .into();

    assert_eq!(qx.kind(), QxErrorKind::UnsupportedOperation);
    assert_eq!(qx.op(), Some("run_atomic_batch"));
}

#[test]
fn test_descriptor_errors_are_validation() {
    let cases = vec![
        QuarryError::UnknownField {
            entity: "User".into(),
            field: "age".into(),
        },
        QuarryError::UnknownRelation {
            entity: "User".into(),
            relation: "friends".into(),
        },
        QuarryError::QuantifierMismatch {
            entity: "Post".into(),
            relation: "author".into(),
            quantifier: "every".into(),
        },
        QuarryError::TypeMismatch {
            entity: "Post".into(),
            field: "likeNum".into(),
            expected: "int".into(),
        },
        QuarryError::MissingRequiredField {
            entity: "User".into(),
            field: "email".into(),
        },
        QuarryError::ReadOnlyField {
            entity: "User".into(),
            field: "id".into(),
        },
        QuarryError::NotUnique {
            entity: "User".into(),
            field: "name".into(),
        },
        QuarryError::invalid("empty patch for Post"),
    ];

    for err in cases {
        let rendered = err.to_string();
        let qx: QxError = err.into();
        assert_eq!(qx.kind(), QxErrorKind::ValidationError, "{}", rendered);
        assert_eq!(qx.code(), "ERR_VALIDATION");
    }
}

#[test]
fn test_relation_errors_report_relation_as_field() {
    let qx: QxError = QuarryError::QuantifierMismatch {
        entity: "Post".into(),
        relation: "author".into(),
        quantifier: "every".into(),
    }
    .into();

    assert_eq!(qx.field(), Some("author"));
    assert_eq!(qx.entity(), Some("Post"));
}

#[test]
fn test_serde_json_error_converts_to_serialization() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();

    let qx: QxError = QuarryError::from(json_err).into();

    assert_eq!(qx.kind(), QxErrorKind::Serialization);
    assert_eq!(qx.code(), "ERR_SERIALIZATION");
}

#[test]
fn test_request_id_and_op_survive_decoration() {
    let request_id = RequestId::from_string("req-7".to_string());

    let qx = QxError::from(QuarryError::invalid("bad"))
        .or_op("find")
        .with_request_id(request_id.clone());

    assert_eq!(qx.op(), Some("find"));
    assert_eq!(qx.request_id(), Some(&request_id));
    assert!(qx.to_string().starts_with("[ERR_VALIDATION] in operation 'find'"));
}
