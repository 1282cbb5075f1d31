use sea_orm::entity::prelude::*;

/// Letter grade stored on a result row.
///
/// "AB" is a sentinel assigned by the submission path for absentees; it is
/// never produced by [`Grade::from_marks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "grade_enum")]
pub enum Grade {
    #[sea_orm(string_value = "A+")]
    APlus,
    #[sea_orm(string_value = "A")]
    A,
    #[sea_orm(string_value = "B")]
    B,
    #[sea_orm(string_value = "C")]
    C,
    #[sea_orm(string_value = "D")]
    D,
    #[sea_orm(string_value = "F")]
    F,
    #[sea_orm(string_value = "AB")]
    Absent,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::Absent => "AB",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GradeError {
    #[error("invalid marks configuration: total_marks must be positive, got {0}")]
    InvalidMarksConfiguration(i32),
}

impl Grade {
    /// Derive a letter grade from obtained/total marks.
    ///
    /// Thresholds are inclusive lower bounds on the percentage:
    /// A+ ≥ 90, A ≥ 80, B ≥ 70, C ≥ 60, D ≥ 50, else F.
    pub fn from_marks(obtained: i32, total: i32) -> Result<Grade, GradeError> {
        if total <= 0 {
            return Err(GradeError::InvalidMarksConfiguration(total));
        }

        let pct = (obtained as f64 / total as f64) * 100.0;

        let grade = if pct >= 90.0 {
            Grade::APlus
        } else if pct >= 80.0 {
            Grade::A
        } else if pct >= 70.0 {
            Grade::B
        } else if pct >= 60.0 {
            Grade::C
        } else if pct >= 50.0 {
            Grade::D
        } else {
            Grade::F
        };

        Ok(grade)
    }
}

/// Helper to compute percentage safely.
pub fn percentage(earned: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        (earned * 100.0) / total
    }
}

/// Percentage rounded to the nearest whole number, clamped at 0.
pub fn rounded_percentage(earned: f64, total: f64) -> u32 {
    percentage(earned, total).round().max(0.0) as u32
}
