//! STAC metadata for the ICESat-2 boreal biomass and height products
//!
//! The [`resolver`] gathers the files that make up one item from object
//! storage, optionally staging them under a new prefix. The [`stac`]
//! module turns a resolved set into a validated STAC Item and builds the
//! per-variable Collections.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod raster;
pub mod resolver;
pub mod stac;
pub mod storage;

pub use catalog::{Record, StacCollection, StacItem, Validate};
pub use constants::{AssetRole, Variable};
pub use error::{Result, StacError, StorageError};
pub use raster::{GdalIntrospector, RasterIntrospector};
pub use resolver::{AssetKeyMap, AssetResolver};
pub use stac::{create_collection, ItemSynthesizer};
pub use storage::{Destination, ObjectStore, S3Store, S3Url};
