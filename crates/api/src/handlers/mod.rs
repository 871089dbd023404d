pub mod dispatch;
pub mod files;
pub mod multipart;
pub mod orders;
pub mod reports;
