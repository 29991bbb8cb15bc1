//! GeoKey directory parsing and CRS resolution.
//!
//! The directory is a flat `u16` array: a 4-entry header
//! `(version, revision, minor, key_count)` followed by `key_count` entries of
//! `(key_id, tag_location, count, value_offset)`. Only keys stored inline
//! (`tag_location == 0`) are needed to resolve an EPSG code.

use crate::error::{GeoTiffError, GeoTiffResult};

pub const GT_MODEL_TYPE: u32 = 1024;
pub const GT_RASTER_TYPE: u32 = 1025;
pub const GEOGRAPHIC_TYPE: u32 = 2048;
pub const PROJECTED_CS_TYPE: u32 = 3072;

/// Value that marks a user-defined (non-EPSG) CRS.
pub const USER_DEFINED: u32 = 32767;

pub const MODEL_TYPE_PROJECTED: u32 = 1;
pub const MODEL_TYPE_GEOGRAPHIC: u32 = 2;
pub const RASTER_PIXEL_IS_POINT: u32 = 2;

/// Inline GeoKeys of one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoKeyDirectory {
    keys: Vec<(u32, u32)>,
}

impl GeoKeyDirectory {
    pub fn parse(raw: &[u32]) -> GeoTiffResult<Self> {
        if raw.len() < 4 {
            return Err(GeoTiffError::InvalidTag(format!(
                "GeoKeyDirectory header has {} entries, expected 4",
                raw.len()
            )));
        }

        let count = raw[3] as usize;
        let entries = &raw[4..];
        if entries.len() < count * 4 {
            return Err(GeoTiffError::InvalidTag(format!(
                "GeoKeyDirectory declares {} keys but holds {}",
                count,
                entries.len() / 4
            )));
        }

        let keys = entries
            .chunks_exact(4)
            .take(count)
            .filter(|entry| entry[1] == 0)
            .map(|entry| (entry[0], entry[3]))
            .collect();

        Ok(Self { keys })
    }

    pub fn get(&self, key: u32) -> Option<u32> {
        self.keys.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn is_pixel_is_point(&self) -> bool {
        self.get(GT_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT)
    }

    /// Resolve the image CRS to an `EPSG:<code>` string.
    pub fn epsg(&self) -> GeoTiffResult<String> {
        let model = self.get(GT_MODEL_TYPE);
        let code = match model {
            Some(MODEL_TYPE_GEOGRAPHIC) => self.get(GEOGRAPHIC_TYPE),
            Some(MODEL_TYPE_PROJECTED) => self.get(PROJECTED_CS_TYPE),
            _ => self.get(PROJECTED_CS_TYPE).or_else(|| self.get(GEOGRAPHIC_TYPE)),
        };

        match code {
            Some(USER_DEFINED) => Err(GeoTiffError::UnsupportedCrs(
                "user-defined coordinate system".to_string(),
            )),
            Some(code) => Ok(format!("EPSG:{code}")),
            None => Err(GeoTiffError::MissingGeoreference(
                "no ProjectedCSType or GeographicType GeoKey".to_string(),
            )),
        }
    }
}
