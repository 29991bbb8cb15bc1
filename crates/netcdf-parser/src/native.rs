//! Grid envelope reading using the native netcdf library.

use std::path::Path;
use std::sync::Once;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cf_time::{check_calendar, CfTimeUnits};
use crate::error::{NetCdfError, NetCdfResult};

/// Coordinate variable names tried in order.
pub const LATITUDE_NAMES: &[&str] = &["latitude", "lat"];
pub const LONGITUDE_NAMES: &[&str] = &["longitude", "lon"];
pub const TIME_NAME: &str = "time";

/// CRS assumed for plain lat/lon grids without a grid-mapping variable.
pub const DEFAULT_CRS: &str = "EPSG:4326";

/// Attributes that carry a WKT definition of the grid mapping.
const CRS_ATTRIBUTES: &[&str] = &["crs_wkt", "spatial_ref"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This disables that output once per process.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Spatial and temporal envelope of a regular lat/lon grid file.
#[derive(Debug, Clone, PartialEq)]
pub struct GridInfo {
    /// `EPSG:4326` or the WKT of the file's grid mapping
    pub crs: String,
    pub rows: usize,
    pub cols: usize,
    /// GDAL-ordered geotransform derived from the coordinate arrays.
    pub geotransform: [f64; 6],
    /// First value of the time axis; `None` for static grids without one.
    pub time: Option<DateTime<Utc>>,
    /// Names of all non-coordinate variables.
    pub variables: Vec<String>,
}

impl GridInfo {
    /// Outer cell-edge bounds as `(left, bottom, right, top)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let gt = &self.geotransform;
        let x0 = gt[0];
        let x1 = gt[0] + gt[1] * self.cols as f64;
        let y0 = gt[3];
        let y1 = gt[3] + gt[5] * self.rows as f64;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }
}

/// Read the grid envelope of a NetCDF file.
pub fn read_grid_info(path: &Path) -> NetCdfResult<GridInfo> {
    silence_hdf5_errors();

    let file = netcdf::open(path)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

    let (lat_name, lats) = read_coordinate(&file, LATITUDE_NAMES)?;
    let (lon_name, lons) = read_coordinate(&file, LONGITUDE_NAMES)?;

    let (origin_x, res_x) = axis_origin(&lon_name, &lons)?;
    let (origin_y, res_y) = axis_origin(&lat_name, &lats)?;
    let geotransform = [origin_x, res_x, 0.0, origin_y, 0.0, res_y];

    let time = read_first_time(&file)?;
    let crs = find_crs(&file).unwrap_or_else(|| DEFAULT_CRS.to_string());

    let variables = file
        .variables()
        .map(|v| v.name())
        .filter(|name| ![lat_name.as_str(), lon_name.as_str(), TIME_NAME].contains(&name.as_str()))
        .collect();

    let info = GridInfo {
        crs,
        rows: lats.len(),
        cols: lons.len(),
        geotransform,
        time,
        variables,
    };
    debug!(
        path = %path.display(),
        rows = info.rows,
        cols = info.cols,
        time = ?info.time,
        "Read NetCDF grid envelope"
    );
    Ok(info)
}

/// Origin (outer cell edge) and resolution of a regular coordinate axis.
///
/// Resolution is `(last - first) / (n - 1)`; the origin sits half a cell
/// before the first cell center.
pub fn axis_origin(name: &str, values: &[f64]) -> NetCdfResult<(f64, f64)> {
    if values.len() < 2 {
        return Err(NetCdfError::InvalidFormat(format!(
            "coordinate '{}' needs at least 2 values to derive a resolution, got {}",
            name,
            values.len()
        )));
    }
    let first = values[0];
    let last = values[values.len() - 1];
    let res = (last - first) / (values.len() - 1) as f64;
    if !res.is_finite() || res == 0.0 {
        return Err(NetCdfError::InvalidFormat(format!(
            "coordinate '{}' has no usable resolution",
            name
        )));
    }
    Ok((first - res / 2.0, res))
}

fn read_coordinate(file: &netcdf::File, names: &[&str]) -> NetCdfResult<(String, Vec<f64>)> {
    for name in names {
        if let Some(var) = file.variable(name) {
            let values: Vec<f64> = var.get_values(..).map_err(|e| {
                NetCdfError::InvalidFormat(format!("Failed to read '{}': {}", name, e))
            })?;
            return Ok((name.to_string(), values));
        }
    }
    Err(NetCdfError::MissingData(format!(
        "coordinate variable (tried {})",
        names.join(", ")
    )))
}

fn read_first_time(file: &netcdf::File) -> NetCdfResult<Option<DateTime<Utc>>> {
    let Some(var) = file.variable(TIME_NAME) else {
        return Ok(None);
    };

    let units = get_string_attr(&var, "units")
        .ok_or_else(|| NetCdfError::MissingData("time units attribute".to_string()))?;
    check_calendar(get_string_attr(&var, "calendar").as_deref())?;

    let values: Vec<f64> = var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read time: {}", e)))?;
    let first = values
        .first()
        .ok_or_else(|| NetCdfError::MissingData("time axis is empty".to_string()))?;

    CfTimeUnits::parse(&units)?.decode(*first).map(Some)
}

/// WKT of the first variable carrying a grid-mapping definition.
fn find_crs(file: &netcdf::File) -> Option<String> {
    file.variables().find_map(|var| {
        CRS_ATTRIBUTES
            .iter()
            .find_map(|attr| get_string_attr(&var, attr))
            .filter(|wkt| !wkt.trim().is_empty())
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get a string attribute.
fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
