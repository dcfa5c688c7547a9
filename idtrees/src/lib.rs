//! The IDTReeS tree crown dataset.
//!
//! The dataset pairs NEON airborne RGB imagery with hyperspectral cubes,
//! canopy height models and LiDAR point clouds. Individual tree crowns are
//! delivered as shapefile polygons, and the training split carries a field
//! survey table with the species of each crown.

mod common;
pub mod acquire;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod index;
pub mod lidar;
pub mod plot;
pub mod raster;
pub mod species;
#[cfg(feature = "tch")]
pub mod tensor;
pub mod vector;

pub use config::{DatasetConfig, Split, Task};
pub use dataset::{IdtreesDataset, Sample, SampleTransform};
pub use error::IdtreesError;
