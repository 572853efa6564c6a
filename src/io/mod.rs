//! Data input/output: SAFE archives, vector boundaries, raster output and
//! the external granule/product catalogs.

pub mod boundary;
pub mod catalog;
pub mod gedi;
pub mod safe_reader;
pub mod writer;

pub use boundary::FireBoundary;
pub use catalog::{
    OrbitDirection, ProductDescriptor, ProductDownloader, ProductType, SensorMode,
    Sentinel1Search,
};
pub use gedi::{GediClient, GediProduct, GranuleEntry};
pub use safe_reader::GrdReader;
pub use writer::{write_geotiff, write_raster, DEFAULT_DRIVER};
