pub mod breakdown;
pub mod dashboard;
pub mod derived;
pub mod requisitions;
pub mod stats;
pub mod transfer;
