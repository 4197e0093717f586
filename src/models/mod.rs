pub mod data;
pub mod report;

pub use data::*;
pub use report::*;
