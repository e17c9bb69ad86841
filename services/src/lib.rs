pub mod domain;
pub mod uuid;
