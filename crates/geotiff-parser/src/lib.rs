//! GeoTIFF header reader.
//!
//! Extracts what is needed to register a GeoTIFF in the index without
//! decoding pixel data:
//!
//! - raster size and band count
//! - CRS as `EPSG:<code>`, resolved from the GeoKey directory
//! - affine geotransform, from `ModelTransformationTag` or from
//!   `ModelPixelScaleTag` + `ModelTiepointTag`
//!
//! # Example
//!
//! ```ignore
//! use geotiff_parser::read_geotiff_info;
//!
//! let info = read_geotiff_info(Path::new("tiles/s2/anth_1.tif"))?;
//! println!("{} {:?}", info.crs, info.bounds());
//! ```

pub mod error;
pub mod geokeys;
pub mod reader;

pub use error::{GeoTiffError, GeoTiffResult};
pub use geokeys::GeoKeyDirectory;
pub use reader::{read_geotiff_info, read_geotiff_info_from, GeoTiffInfo};
