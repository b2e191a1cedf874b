pub mod ai;
pub mod analysis;
pub mod cost;
pub mod devops;
pub mod git;
pub mod ticket;
