pub mod attendance_service;
pub mod auth;
pub mod deadline_service;
pub mod report_service;
pub mod result_service;
pub mod service;
