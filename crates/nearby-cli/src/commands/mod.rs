//! Command implementations.

pub mod announce;
pub mod discover;
pub mod interfaces;

pub use announce::run_announce;
pub use discover::run_discover;
pub use interfaces::run_interfaces;
