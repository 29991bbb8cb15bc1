//! NetCDF grid envelope reader.
//!
//! Reads what is needed to register a regular lat/lon NetCDF grid in the
//! index without loading the data variables:
//!
//! - coordinate axes (`latitude`/`lat`, `longitude`/`lon`) and a
//!   geotransform derived from them
//! - CRS from a `crs_wkt`/`spatial_ref` attribute, `EPSG:4326` otherwise
//! - first value of the `time` axis (if any), decoded per CF conventions
//! - the list of data variables
//!
//! # Implementation Notes
//!
//! Uses the `netcdf` crate (libnetcdf/HDF5). HDF5 diagnostics are silenced
//! on first use so optional-attribute probes do not spam stderr.

pub mod cf_time;
pub mod error;
pub mod native;

pub use cf_time::CfTimeUnits;
pub use error::{NetCdfError, NetCdfResult};
pub use native::{read_grid_info, silence_hdf5_errors, GridInfo, DEFAULT_CRS};
