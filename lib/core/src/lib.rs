pub mod cnf;
pub mod error;
pub mod lit;
pub mod repository;
pub mod utils;
