//! Measurement registries of the known sources.

use eo3_metadata::{Measurement, MeasurementRegistry, Nodata};

/// Sentinel-2 Level-2A reflectance bands, in file band order.
pub fn sentinel2() -> MeasurementRegistry {
    [
        ("blue", "BAND_2"),
        ("green", "BAND_3"),
        ("red", "BAND_4"),
        ("vegetation_red_edge1", "BAND_5"),
        ("vegetation_red_edge2", "BAND_6"),
        ("vegetation_red_edge3", "BAND_7"),
        ("nir", "BAND_8"),
        ("narrow_nir", "BAND_8A"),
        ("swir1", "BAND_11"),
        ("swir2", "BAND_12"),
    ]
    .into_iter()
    .map(|(name, alias)| (name.to_string(), reflectance().with_aliases(&[alias])))
    .collect()
}

/// Sentinel-2 scene classification map.
pub fn sentinel2_scl() -> MeasurementRegistry {
    MeasurementRegistry::new().with("scl", reflectance())
}

/// Land cover layers (CORINE, MODIS, CGLS, GlobCover).
pub fn land_cover() -> MeasurementRegistry {
    ["corine", "modis_1", "cgls", "globcover"]
        .into_iter()
        .map(|name| (name.to_string(), reflectance()))
        .collect()
}

/// CMEMS wave analysis, stored as scaled int16.
pub fn cmems_waves() -> MeasurementRegistry {
    let scaled = |units: &str, alias: &str, offset: f64| {
        Measurement::new("int16", units, Nodata::Int(-32767))
            .with_aliases(&[alias])
            .with_scaling(0.01, offset)
    };
    MeasurementRegistry::new()
        .with("VHM0", scaled("m", "sea_surface_wave_significant_height", 0.0))
        .with(
            "VTPK",
            scaled(
                "s",
                "sea_surface_wave_period_at_variance_spectral_density_maximum",
                0.0,
            ),
        )
        .with("VMDR", scaled("degree", "sea_surface_wave_from_direction", 180.0))
}

/// CMEMS total surface currents.
pub fn cmems_currents() -> MeasurementRegistry {
    MeasurementRegistry::new()
        .with("utotal", ocean("m s-1", "surface_sea_water_x_velocity"))
        .with("vtotal", ocean("m s-1", "surface_sea_water_y_velocity"))
}

/// CMEMS physics: temperature, sea surface height, salinity.
pub fn cmems_physics() -> MeasurementRegistry {
    MeasurementRegistry::new()
        .with("thetao", ocean("degrees_C", "sea_water_potential_temperature"))
        .with("zos", ocean("m", "sea_surface_height_above_geoid"))
        .with("so", ocean("1e-3", "sea_water_salinity"))
}

/// GFS surface weather. Wind components are stored under hyphenated
/// variable names.
pub fn gfs() -> MeasurementRegistry {
    let weather = |units: &str| Measurement::new("float32", units, Nodata::NaN);
    MeasurementRegistry::new()
        .with("Temperature_surface", weather("K").with_aliases(&["TMP"]))
        .with("Pressure_reduced_to_MSL_msl", weather("Pa").with_aliases(&["PRMSL"]))
        .with("Wind_speed_gust_surface", weather("m/s").with_aliases(&["GUST"]))
        .with(
            "u_component_of_wind_height_above_ground",
            weather("m/s")
                .with_aliases(&[
                    "u-component_of_wind_height_above_ground",
                    "u_wind_height_above_ground",
                    "UGRD",
                ])
                .with_layer("u-component_of_wind_height_above_ground"),
        )
        .with(
            "v_component_of_wind_height_above_ground",
            weather("m/s")
                .with_aliases(&[
                    "v-component_of_wind_height_above_ground",
                    "v_wind_height_above_ground",
                    "VGRD",
                ])
                .with_layer("v-component_of_wind_height_above_ground"),
        )
}

/// ETOPO global relief (bedrock elevation).
pub fn global_relief() -> MeasurementRegistry {
    MeasurementRegistry::new().with(
        "z",
        Measurement::new("float32", "m", Nodata::NaN).with_aliases(&[
            "global_relief",
            "depth",
            "water_depth",
            "height",
            "elevation",
            "topography",
            "bathymetry",
        ]),
    )
}

fn reflectance() -> Measurement {
    Measurement::new("uint16", "1", Nodata::Int(0))
}

fn ocean(units: &str, alias: &str) -> Measurement {
    Measurement::new("float32", units, Nodata::Float(-999.0)).with_aliases(&[alias])
}
