pub mod adapter;
pub mod batch;
pub mod comparison;
pub mod config;
pub mod error;
pub mod histogram;
pub mod invocation;
pub mod outcome;
pub mod report;
