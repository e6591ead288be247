pub mod audit;
pub mod operations;
pub mod processing;
pub mod storage;
