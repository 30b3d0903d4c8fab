//! Tests for domain error construction and serialisation.

use super::*;
use crate::domain::Locale;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::not_found("missing"), ErrorCode::NotFound)]
#[case(Error::conflict("taken"), ErrorCode::Conflict)]
#[case(Error::refid_unavailable("exhausted"), ErrorCode::RefidUnavailable)]
#[case(Error::service_unavailable("offline"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn new_substitutes_user_message_for_blank_input() {
    let error = Error::new(ErrorCode::RefidUnavailable, "");
    assert_eq!(
        error.message(),
        ErrorCode::RefidUnavailable.user_message(Locale::English)
    );
}

#[rstest]
fn serialises_with_snake_case_code_and_details() {
    let error = Error::conflict("refid already used").with_details(json!({"refid": "12345678"}));
    let value = serde_json::to_value(&error).expect("serialise error");

    assert_eq!(
        value,
        json!({
            "code": "conflict",
            "message": "refid already used",
            "details": {"refid": "12345678"},
        })
    );
}

#[rstest]
fn details_are_omitted_when_absent() {
    let value = serde_json::to_value(Error::internal("boom")).expect("serialise error");
    assert_eq!(value, json!({"code": "internal_error", "message": "boom"}));
}

#[rstest]
fn deserialising_rejects_blank_messages() {
    let result = serde_json::from_value::<Error>(json!({"code": "not_found", "message": " "}));
    assert!(result.is_err());
}

#[rstest]
fn deserialising_round_trips_refid_unavailable() {
    let error: Error = serde_json::from_value(json!({
        "code": "refid_unavailable",
        "message": "no free code",
    }))
    .expect("valid payload");
    assert_eq!(error.code(), ErrorCode::RefidUnavailable);
    assert_eq!(error.to_string(), "no free code");
}
