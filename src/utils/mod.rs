// Utility modules for the TaskFlow notifier

pub mod service_error;

pub use service_error::NotifierError;
