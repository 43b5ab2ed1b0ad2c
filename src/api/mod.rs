pub mod checkin;
pub mod device;
pub mod report;
pub mod schedule;
pub mod users;
