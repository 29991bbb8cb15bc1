//! Test data generators for synthetic rasters and coordinate axes.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Same pattern as [`create_test_grid`] as `u16`, saturating at `u16::MAX`.
pub fn create_test_band(width: usize, height: usize) -> Vec<u16> {
    create_test_grid(width, height)
        .into_iter()
        .map(|v| v.min(u16::MAX as f32) as u16)
        .collect()
}

/// Evenly spaced coordinate axis of cell centers.
///
/// ```
/// use test_utils::create_axis;
///
/// assert_eq!(create_axis(10.0, 0.5, 3), vec![10.0, 10.5, 11.0]);
/// ```
pub fn create_axis(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_band_saturates() {
        let band = create_test_band(70, 1);
        assert_eq!(band[0], 0);
        assert_eq!(band[65], 65000);
        assert_eq!(band[66], u16::MAX);
    }

    #[test]
    fn test_descending_axis() {
        let axis = create_axis(60.0, -0.5, 4);
        assert_eq!(axis, vec![60.0, 59.5, 59.0, 58.5]);
    }
}
