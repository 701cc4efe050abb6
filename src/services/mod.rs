pub mod auth;
pub mod clock;
pub mod goals;
pub mod init;
pub mod notifications;
pub mod nutrition;
pub mod reminders;
pub mod retry;
pub mod scheduler;
pub mod workouts;
