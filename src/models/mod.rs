pub mod push_subscription;
pub mod task;
pub mod user;

// Re-export common types
pub use push_subscription::*;
pub use task::*;
pub use user::*;
