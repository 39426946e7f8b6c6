use thiserror::Error;
use tracking::TrackingError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WrapperError {
    #[error("Unknown member. type: '{type_name}', member: '{member}'")]
    UnknownMember { type_name: String, member: String },

    #[error("Type mismatch. member: '{member}', expected: {expected}, actual: {actual}")]
    TypeMismatch {
        member: String,
        expected: String,
        actual: String,
    },

    #[error("Member is read-only. type: '{type_name}', member: '{member}'")]
    ReadOnlyMember { type_name: String, member: String },

    #[error(transparent)]
    Tracking(#[from] TrackingError),
}

impl WrapperError {
    pub(crate) fn mismatch(member: &str, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            member: member.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
