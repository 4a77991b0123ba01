pub mod lateness;
pub mod missions;
pub mod pools;
pub mod service;
pub mod transitions;
