//! On-disk fixture writers: GeoTIFF tiles, NetCDF grids and zip archives.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use sha2::{Digest, Sha256};
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::generators::{create_axis, create_test_band, create_test_grid};

/// A small GeoTIFF with pixel-scale/tiepoint georeferencing.
#[derive(Debug, Clone)]
pub struct GeoTiffFixture {
    pub width: u32,
    pub height: u32,
    /// 1, 3 or 4 samples per pixel
    pub bands: usize,
    pub epsg: u16,
    pub geographic: bool,
    /// Top-left corner of the raster
    pub origin: (f64, f64),
    pub pixel_size: f64,
    /// Write the GeoTIFF tags at all
    pub georeferenced: bool,
}

impl Default for GeoTiffFixture {
    fn default() -> Self {
        Self {
            width: 16,
            height: 16,
            bands: 1,
            epsg: 32633,
            geographic: false,
            origin: (500000.0, 7000000.0),
            pixel_size: 10.0,
            georeferenced: true,
        }
    }
}

impl GeoTiffFixture {
    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    pub fn without_georeference(mut self) -> Self {
        self.georeferenced = false;
        self
    }

    pub fn write(&self, path: &Path) {
        let file = File::create(path).expect("Failed to create GeoTIFF fixture");
        let mut encoder = TiffEncoder::new(file).expect("Failed to create TIFF encoder");
        match self.bands {
            1 => self.write_image::<colortype::Gray16>(&mut encoder),
            3 => self.write_image::<colortype::RGB16>(&mut encoder),
            4 => self.write_image::<colortype::RGBA16>(&mut encoder),
            n => panic!("GeoTIFF fixture supports 1, 3 or 4 bands, got {n}"),
        }
    }

    fn geokeys(&self) -> Vec<u16> {
        let (model, crs_key) = if self.geographic { (2, 2048) } else { (1, 3072) };
        vec![
            1, 1, 0, 3, //
            1024, 0, 1, model, //
            1025, 0, 1, 1, //
            crs_key, 0, 1, self.epsg,
        ]
    }

    fn write_image<C: ColorType<Inner = u16>>(&self, encoder: &mut TiffEncoder<File>) {
        let mut image = encoder
            .new_image::<C>(self.width, self.height)
            .expect("Failed to start TIFF image");

        if self.georeferenced {
            let (x, y) = self.origin;
            let scale = [self.pixel_size, self.pixel_size, 0.0];
            let tiepoint = [0.0, 0.0, 0.0, x, y, 0.0];
            let geokeys = self.geokeys();
            let dir = image.encoder();
            dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])
                .expect("Failed to write ModelPixelScaleTag");
            dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])
                .expect("Failed to write ModelTiepointTag");
            dir.write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])
                .expect("Failed to write GeoKeyDirectoryTag");
        }

        let samples = C::BITS_PER_SAMPLE.len();
        let data = create_test_band(self.width as usize * samples, self.height as usize);
        image.write_data(&data).expect("Failed to write TIFF data");
    }
}

/// A CF-style lat/lon grid with optional time axis and data variables.
#[derive(Debug, Clone)]
pub struct NetCdfGridFixture {
    pub lat_name: String,
    pub lon_name: String,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    /// Time values and their `units` attribute
    pub time: Option<(Vec<f64>, String)>,
    pub variables: Vec<String>,
    /// Written as `crs_wkt` on a scalar `crs` variable
    pub crs_wkt: Option<String>,
}

impl Default for NetCdfGridFixture {
    fn default() -> Self {
        Self {
            lat_name: "lat".to_string(),
            lon_name: "lon".to_string(),
            lats: create_axis(50.25, 0.5, 4),
            lons: create_axis(10.25, 0.5, 6),
            time: Some((vec![0.0], "hours since 2023-01-01 00:00:00".to_string())),
            variables: vec!["VHM0".to_string()],
            crs_wkt: None,
        }
    }
}

impl NetCdfGridFixture {
    pub fn with_variables(mut self, variables: &[&str]) -> Self {
        self.variables = variables.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_time(mut self, values: Vec<f64>, units: &str) -> Self {
        self.time = Some((values, units.to_string()));
        self
    }

    pub fn write(&self, path: &Path) {
        let mut file = netcdf::create(path).expect("Failed to create NetCDF fixture");

        let mut dims: Vec<&str> = Vec::new();
        if let Some((values, _)) = &self.time {
            file.add_dimension("time", values.len())
                .expect("Failed to add time dimension");
            dims.push("time");
        }
        file.add_dimension(&self.lat_name, self.lats.len())
            .expect("Failed to add lat dimension");
        file.add_dimension(&self.lon_name, self.lons.len())
            .expect("Failed to add lon dimension");
        dims.push(&self.lat_name);
        dims.push(&self.lon_name);

        if let Some((values, units)) = &self.time {
            let mut var = file
                .add_variable::<f64>("time", &["time"])
                .expect("Failed to add time variable");
            var.put_values(values, ..).expect("Failed to write time");
            var.put_attribute("units", units.as_str())
                .expect("Failed to write time units");
        }

        for (name, values, units) in [
            (&self.lat_name, &self.lats, "degrees_north"),
            (&self.lon_name, &self.lons, "degrees_east"),
        ] {
            let mut var = file
                .add_variable::<f64>(name, &[name.as_str()])
                .expect("Failed to add coordinate variable");
            var.put_values(values, ..)
                .expect("Failed to write coordinate values");
            var.put_attribute("units", units)
                .expect("Failed to write coordinate units");
        }

        let steps = self.time.as_ref().map(|(v, _)| v.len()).unwrap_or(1);
        let data: Vec<f32> = (0..steps)
            .flat_map(|_| create_test_grid(self.lons.len(), self.lats.len()))
            .collect();
        for name in &self.variables {
            let mut var = file
                .add_variable::<f32>(name, &dims)
                .expect("Failed to add data variable");
            var.put_values(&data, ..).expect("Failed to write data");
        }

        if let Some(wkt) = &self.crs_wkt {
            let mut var = file
                .add_variable::<i32>("crs", &[])
                .expect("Failed to add crs variable");
            var.put_attribute("crs_wkt", wkt.as_str())
                .expect("Failed to write crs_wkt");
        }
    }
}

/// Writes a zip archive. Names ending in `/` become directory entries.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("Failed to create zip fixture");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options)
                .expect("Failed to add zip directory");
        } else {
            zip.start_file(*name, options)
                .expect("Failed to start zip entry");
            zip.write_all(content).expect("Failed to write zip entry");
        }
    }
    zip.finish().expect("Failed to finish zip archive");
}

/// Hex SHA-256 of a file, for configuring expected archive hashes.
pub fn sha256_hex(path: &Path) -> String {
    let bytes = std::fs::read(path).expect("Failed to read file for hashing");
    format!("{:x}", Sha256::digest(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::temp_test_dir;

    #[test]
    fn test_write_geotiff_fixture() {
        let dir = temp_test_dir();
        let path = dir.path().join("tile.tif");
        GeoTiffFixture::default().with_bands(3).write(&path);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_write_zip_and_hash() {
        let dir = temp_test_dir();
        let path = dir.path().join("archive.zip");
        write_zip(&path, &[("data/", b""), ("data/a.txt", b"hello")]);
        let hash = sha256_hex(&path);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, sha256_hex(&path));
    }
}
