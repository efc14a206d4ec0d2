pub mod activitydb;
pub mod chatdb;
pub mod db;
#[cfg(test)]
pub mod memory;
pub mod providerdb;
pub mod requestdb;
pub mod store;
