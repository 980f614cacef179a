pub mod attendance;
pub mod core;
pub mod grades;
pub mod schedule;
pub mod students;
pub mod substitute;
pub mod users;
