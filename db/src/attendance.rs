use crate::models::attendance_record::{AttendanceStatus, AttendanceType, Model};

/// Counts and weighted percentage over one student's attendance records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct AttendanceSummary {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub half_day: u32,
    pub total: u32,
    pub percentage: u32,
}

/// Partition records into counts and compute the weighted percentage.
///
/// A half-day record is counted under `half_day`, not under its status.
/// Late arrivals count as full attendance for the percentage but keep
/// their own bucket for reporting. Formula:
/// `round(((present + late + half_day * 0.5) / total) * 100)`, 0 for an
/// empty set.
pub fn summarize(records: &[Model]) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        total: records.len() as u32,
        ..Default::default()
    };

    for record in records {
        if record.attendance_type == AttendanceType::HalfDay {
            summary.half_day += 1;
            continue;
        }
        match record.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::Excused => {}
        }
    }

    if summary.total > 0 {
        let attended =
            summary.present as f64 + summary.late as f64 + summary.half_day as f64 * 0.5;
        summary.percentage = ((attended / summary.total as f64) * 100.0).round() as u32;
    }

    summary
}
