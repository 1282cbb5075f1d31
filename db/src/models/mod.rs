pub mod attendance_record;
pub mod result_deadline;
pub mod school_session;
pub mod student;
pub mod student_result;

pub use attendance_record::Entity as AttendanceRecord;
pub use result_deadline::Entity as ResultDeadline;
pub use school_session::Entity as SchoolSession;
pub use student::Entity as Student;
pub use student_result::Entity as StudentResult;
