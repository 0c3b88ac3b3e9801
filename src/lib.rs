pub mod config;
pub mod keys;
pub mod perception;
pub mod session;
pub mod steering;
