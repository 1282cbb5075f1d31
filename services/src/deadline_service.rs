use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::auth::AuthUser;
use crate::service::{ServiceError, ServiceResult};
use db::models::result_deadline::{ActiveModel, Column, Entity, Model};

pub use db::models::result_deadline::Model as ResultDeadline;

#[derive(Debug, Clone)]
pub struct CreateResultDeadline {
    pub session_id: i64,
    pub exam_type_id: i64,
    /// `None` opens the window for every class in the scope.
    pub class_id: Option<i64>,
    /// `None` opens the window for every subject.
    pub subject_id: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_open: bool,
}

/// Create a submission window. Windows are toggled, never deleted.
pub async fn create_deadline(
    db: &DatabaseConnection,
    actor: &AuthUser,
    params: CreateResultDeadline,
) -> ServiceResult<Model> {
    if params.end_date <= params.start_date {
        return Err(ServiceError::Validation(
            "end_date must be after start_date".into(),
        ));
    }

    // friendlier than the unique-index violation the storage would raise
    let mut scope_query = Entity::find()
        .filter(Column::SessionId.eq(params.session_id))
        .filter(Column::ExamTypeId.eq(params.exam_type_id));
    scope_query = match params.class_id {
        Some(id) => scope_query.filter(Column::ClassId.eq(id)),
        None => scope_query.filter(Column::ClassId.is_null()),
    };
    scope_query = match params.subject_id {
        Some(id) => scope_query.filter(Column::SubjectId.eq(id)),
        None => scope_query.filter(Column::SubjectId.is_null()),
    };
    if scope_query.one(db).await?.is_some() {
        return Err(ServiceError::Validation(
            "a deadline already exists for this scope; toggle or move it instead".into(),
        ));
    }

    let now = Utc::now();
    let deadline = ActiveModel {
        session_id: Set(params.session_id),
        exam_type_id: Set(params.exam_type_id),
        class_id: Set(params.class_id),
        subject_id: Set(params.subject_id),
        start_date: Set(params.start_date),
        end_date: Set(params.end_date),
        is_open: Set(params.is_open),
        created_by: Set(actor.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::info!(
        "deadline {} created for session {} exam type {} (class {:?}, subject {:?})",
        deadline.id,
        deadline.session_id,
        deadline.exam_type_id,
        deadline.class_id,
        deadline.subject_id
    );

    Ok(deadline)
}

/// Move a window's boundaries.
pub async fn update_window(
    db: &DatabaseConnection,
    deadline_id: i64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> ServiceResult<Model> {
    if end_date <= start_date {
        return Err(ServiceError::Validation(
            "end_date must be after start_date".into(),
        ));
    }

    let mut deadline: ActiveModel = find_required(db, deadline_id).await?.into();
    deadline.start_date = Set(start_date);
    deadline.end_date = Set(end_date);
    deadline.updated_at = Set(Utc::now());
    Ok(deadline.update(db).await?)
}

/// Toggle a window open or closed, effective immediately.
pub async fn set_open(
    db: &DatabaseConnection,
    deadline_id: i64,
    open: bool,
) -> ServiceResult<Model> {
    let mut deadline: ActiveModel = find_required(db, deadline_id).await?.into();
    deadline.is_open = Set(open);
    deadline.updated_at = Set(Utc::now());
    Ok(deadline.update(db).await?)
}

/// Resolve the window governing a submission, specificity first.
///
/// Lookup order: class-specific before general, and within each class
/// tier a subject-specific window before a subject-general one. Each
/// lookup is an exact match on its scope, so precedence stays explicit
/// and the storage unique index keeps every lookup at most one row.
pub async fn resolve_open_window(
    db: &DatabaseConnection,
    session_id: i64,
    exam_type_id: i64,
    class_id: i64,
    subject_id: Option<i64>,
    now: DateTime<Utc>,
) -> ServiceResult<Option<Model>> {
    for class_scope in [Some(class_id), None] {
        let mut subject_scopes = Vec::with_capacity(2);
        if let Some(subject_id) = subject_id {
            subject_scopes.push(Some(subject_id));
        }
        subject_scopes.push(None);

        for subject_scope in subject_scopes {
            let mut query = Entity::find()
                .filter(Column::SessionId.eq(session_id))
                .filter(Column::ExamTypeId.eq(exam_type_id))
                .filter(Column::IsOpen.eq(true))
                .filter(Column::StartDate.lte(now))
                .filter(Column::EndDate.gte(now));

            query = match class_scope {
                Some(id) => query.filter(Column::ClassId.eq(id)),
                None => query.filter(Column::ClassId.is_null()),
            };
            query = match subject_scope {
                Some(id) => query.filter(Column::SubjectId.eq(id)),
                None => query.filter(Column::SubjectId.is_null()),
            };

            if let Some(deadline) = query.one(db).await? {
                return Ok(Some(deadline));
            }
        }
    }

    Ok(None)
}

/// Resolve the governing window or fail with `DeadlineClosed`.
pub async fn require_open_window(
    db: &DatabaseConnection,
    session_id: i64,
    exam_type_id: i64,
    class_id: i64,
    subject_id: Option<i64>,
    now: DateTime<Utc>,
) -> ServiceResult<Model> {
    resolve_open_window(db, session_id, exam_type_id, class_id, subject_id, now)
        .await?
        .ok_or(ServiceError::DeadlineClosed)
}

async fn find_required(db: &DatabaseConnection, deadline_id: i64) -> ServiceResult<Model> {
    Entity::find_by_id(deadline_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            sea_orm::DbErr::RecordNotFound(format!("Result deadline {deadline_id} not found"))
                .into()
        })
}
