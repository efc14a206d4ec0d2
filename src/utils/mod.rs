pub mod contact;
pub mod geo;
pub mod password;
pub mod reference;
pub mod sanitize;
pub mod token;
