/// Validation errors raised while converting caller or telemetry input into
/// the typed model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("neither `commandId` nor `command` resolves to a payload")]
    NoPayload,
}
