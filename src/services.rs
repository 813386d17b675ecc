pub mod auth;
pub mod catalog;
pub mod request_service;
pub mod sequence;
