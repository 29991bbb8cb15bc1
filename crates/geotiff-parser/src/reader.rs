//! GeoTIFF header reader.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::Decoder;
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{GeoTiffError, GeoTiffResult};
use crate::geokeys::GeoKeyDirectory;

/// Georeferencing and layout of the first image of a GeoTIFF.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTiffInfo {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    /// `EPSG:<code>`
    pub crs: String,
    /// GDAL-ordered geotransform `[origin_x, pixel_w, rot_x, origin_y, rot_y, pixel_h]`.
    pub geotransform: [f64; 6],
}

impl GeoTiffInfo {
    /// Outer bounds as `(left, bottom, right, top)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let gt = &self.geotransform;
        let (w, h) = (self.width as f64, self.height as f64);
        let xs = [
            gt[0],
            gt[0] + w * gt[1],
            gt[0] + h * gt[2],
            gt[0] + w * gt[1] + h * gt[2],
        ];
        let ys = [
            gt[3],
            gt[3] + w * gt[4],
            gt[3] + h * gt[5],
            gt[3] + w * gt[4] + h * gt[5],
        ];
        let min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
        let max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (min(&xs), min(&ys), max(&xs), max(&ys))
    }
}

/// Read the GeoTIFF header of a file on disk.
pub fn read_geotiff_info(path: &Path) -> GeoTiffResult<GeoTiffInfo> {
    let file = File::open(path)?;
    let info = read_geotiff_info_from(BufReader::new(file))?;
    debug!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        bands = info.band_count,
        crs = %info.crs,
        "Read GeoTIFF header"
    );
    Ok(info)
}

/// Read the GeoTIFF header from any seekable reader.
pub fn read_geotiff_info_from<R: Read + Seek>(reader: R) -> GeoTiffResult<GeoTiffInfo> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;

    let band_count = match decoder.find_tag(Tag::SamplesPerPixel)? {
        Some(value) => value.into_u32()? as usize,
        None => 1,
    };

    let geokeys = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
        Some(value) => GeoKeyDirectory::parse(&value.into_u32_vec()?)?,
        None => {
            return Err(GeoTiffError::MissingGeoreference(
                "GeoKeyDirectoryTag".to_string(),
            ))
        }
    };
    let crs = geokeys.epsg()?;

    let transformation = f64_tag(&mut decoder, Tag::ModelTransformationTag)?;
    let mut geotransform = match transformation {
        Some(matrix) => geotransform_from_matrix(&matrix)?,
        None => {
            let scale = f64_tag(&mut decoder, Tag::ModelPixelScaleTag)?.ok_or_else(|| {
                GeoTiffError::MissingGeoreference("ModelPixelScaleTag".to_string())
            })?;
            let tiepoint = f64_tag(&mut decoder, Tag::ModelTiepointTag)?.ok_or_else(|| {
                GeoTiffError::MissingGeoreference("ModelTiepointTag".to_string())
            })?;
            geotransform_from_tiepoint(&scale, &tiepoint)?
        }
    };

    if geokeys.is_pixel_is_point() {
        geotransform[0] -= geotransform[1] * 0.5 + geotransform[2] * 0.5;
        geotransform[3] -= geotransform[4] * 0.5 + geotransform[5] * 0.5;
    }

    Ok(GeoTiffInfo {
        width: width as usize,
        height: height as usize,
        band_count,
        crs,
        geotransform,
    })
}

fn f64_tag<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> GeoTiffResult<Option<Vec<f64>>> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

/// Pixel scale `(sx, sy, sz)` plus the first tiepoint `(i, j, k, x, y, z)`.
fn geotransform_from_tiepoint(scale: &[f64], tiepoint: &[f64]) -> GeoTiffResult<[f64; 6]> {
    if scale.len() < 2 {
        return Err(GeoTiffError::InvalidTag(format!(
            "ModelPixelScaleTag has {} values",
            scale.len()
        )));
    }
    if tiepoint.len() < 6 {
        return Err(GeoTiffError::InvalidTag(format!(
            "ModelTiepointTag has {} values",
            tiepoint.len()
        )));
    }

    let (sx, sy) = (scale[0], scale[1]);
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    Ok([x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy])
}

/// Row-major 4x4 model transformation matrix.
fn geotransform_from_matrix(m: &[f64]) -> GeoTiffResult<[f64; 6]> {
    if m.len() < 16 {
        return Err(GeoTiffError::InvalidTag(format!(
            "ModelTransformationTag has {} values",
            m.len()
        )));
    }
    Ok([m[3], m[0], m[1], m[7], m[4], m[5]])
}
