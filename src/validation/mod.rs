pub mod gazetteer;
mod regions;

pub use gazetteer::{Gazetteer, RegionMatch};
