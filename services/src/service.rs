use db::grade::GradeError;
use sea_orm::DbErr;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by the submission and reporting services.
///
/// `DeadlineClosed` and `ResultLocked` are recoverable and reported to the
/// caller verbatim; store failures propagate with the underlying message.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no open submission window for this session/exam type/class")]
    DeadlineClosed,

    #[error("result for student {student_id} is locked")]
    ResultLocked { student_id: i64 },

    #[error(transparent)]
    InvalidMarks(#[from] GradeError),

    #[error("authentication required")]
    Unauthenticated,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl ServiceError {
    /// Whether the caller can fix the request and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ServiceError::DeadlineClosed
                | ServiceError::ResultLocked { .. }
                | ServiceError::Validation(_)
        )
    }
}
