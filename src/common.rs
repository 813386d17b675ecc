pub mod error;
pub mod retry;
