pub mod admin;
pub mod auth;
pub mod cron;
pub mod health;
pub mod reservations;
pub mod slots;
