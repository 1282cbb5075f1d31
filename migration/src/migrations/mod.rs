pub mod m202508250001_create_students;
pub mod m202508250002_create_school_sessions;
pub mod m202508250003_create_result_deadlines;
pub mod m202508250004_create_student_results;
pub mod m202508250005_create_attendance_records;
