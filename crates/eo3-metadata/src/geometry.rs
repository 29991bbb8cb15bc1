//! Spatial envelope types: bounding boxes, affine transforms and footprints.

use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, Result};

/// An axis-aligned bounding box in the dataset's native CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing all the given points.
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        let (&(x0, y0), rest) = points.split_first()?;
        let mut bbox = Self::new(x0, y0, x0, y0);
        for &(x, y) in rest {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }

    /// Closed ring: bottom-left, top-left, top-right, bottom-right, bottom-left.
    pub fn footprint(&self) -> Footprint {
        Footprint(vec![
            [self.min_x, self.min_y],
            [self.min_x, self.max_y],
            [self.max_x, self.max_y],
            [self.max_x, self.min_y],
            [self.min_x, self.min_y],
        ])
    }
}

/// Affine pixel-to-world transform.
///
/// `x = a * col + b * row + c`, `y = d * col + e * row + f`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Build from a GDAL-ordered geotransform `[c, a, b, f, d, e]`.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self::new(gt[1], gt[2], gt[0], gt[4], gt[5], gt[3])
    }

    /// North-up transform from an origin (top-left corner) and pixel size.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self::new(pixel_width, 0.0, origin_x, 0.0, -pixel_height, origin_y)
    }

    /// World coordinates of a pixel corner.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Bounding box covered by a raster of the given shape.
    pub fn bounds(&self, rows: usize, cols: usize) -> BoundingBox {
        let (rows, cols) = (rows as f64, cols as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(cols, 0.0),
            self.apply(cols, rows),
            self.apply(0.0, rows),
        ];
        // from_points only fails on an empty slice
        BoundingBox::from_points(&corners).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Row-major 3x3 homogeneous matrix.
    pub fn to_row_major(&self) -> [f64; 9] {
        [self.a, self.b, self.c, self.d, self.e, self.f, 0.0, 0.0, 1.0]
    }
}

/// Closed polygon ring of `[x, y]` vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint(Vec<[f64; 2]>);

impl Footprint {
    /// Validate a ring: at least four vertices and identical first/last vertex.
    pub fn from_ring(ring: Vec<[f64; 2]>) -> Result<Self> {
        if ring.len() < 4 {
            return Err(MetadataError::InvalidFootprint(format!(
                "ring needs at least 4 vertices, got {}",
                ring.len()
            )));
        }
        if ring.first() != ring.last() {
            return Err(MetadataError::InvalidFootprint(
                "ring is not closed (first vertex != last vertex)".to_string(),
            ));
        }
        if ring.iter().flatten().any(|v| !v.is_finite()) {
            return Err(MetadataError::InvalidFootprint(
                "ring contains non-finite coordinates".to_string(),
            ));
        }
        Ok(Self(ring))
    }

    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.0
    }

    pub fn into_vertices(self) -> Vec<[f64; 2]> {
        self.0
    }
}
