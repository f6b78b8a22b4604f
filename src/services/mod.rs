pub mod auth;
pub mod email;
pub mod reminders;
pub mod reservations;
pub mod slots;
pub mod tokens;
