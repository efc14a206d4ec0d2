pub mod admin;
pub mod provider;
pub mod requests;
