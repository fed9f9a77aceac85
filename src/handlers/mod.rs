pub mod dashboard;
pub mod requisitions;
pub mod transfer;
