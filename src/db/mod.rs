pub mod models;
pub mod repository;

pub use models::*;
pub use repository::*;

#[cfg(test)]
pub mod test_support;
