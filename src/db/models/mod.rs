pub mod mission;
pub mod requests;
pub mod user;
