//! Importer configuration from environment variables.
//!
//! Every source is disabled unless `<PREFIX>_ENABLED` is set. Sources are
//! processed in the fixed order of [`SourceKind::ALL`], independent of the
//! order the variables appear in.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, Weekday};

use crate::error::{IngestionError, Result};

pub const DEFAULT_BASE_FOLDER: &str = "/odc";
pub const DEFAULT_DATA_FOLDER: &str = "data";

const ANTHROPROTECT_URL: &str = "https://uni-bonn.sciebo.de/s/6wrgdIndjpfRJuA/download";
const ANTHROPROTECT_SHA256: &str =
    "88ab511c2c89b64cd29d5f0d03174b450af3dd66a48423bc7f212f4391206f0d";
const GLOBAL_RELIEF_URL: &str = "https://www.ngdc.noaa.gov/thredds/fileServer/global/ETOPO2022/\
                                 30s/30s_bed_elev_netcdf/ETOPO_2022_v1_30s_N90W180_bed.nc";
const GLOBAL_RELIEF_FILE: &str = "ETOPO_2022_v1_30s_N90W180_bed.nc";

/// The source families the importer knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Anthroprotect,
    CmemsCurrents,
    CmemsPhysics,
    CmemsWaves,
    Gfs,
    GlobalRelief,
}

impl SourceKind {
    /// Processing order.
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Anthroprotect,
        SourceKind::CmemsCurrents,
        SourceKind::CmemsPhysics,
        SourceKind::CmemsWaves,
        SourceKind::Gfs,
        SourceKind::GlobalRelief,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Anthroprotect => "anthroprotect",
            SourceKind::CmemsCurrents => "cmems_currents",
            SourceKind::CmemsPhysics => "cmems_physics",
            SourceKind::CmemsWaves => "cmems_waves",
            SourceKind::Gfs => "gfs",
            SourceKind::GlobalRelief => "global_relief",
        }
    }

    /// Prefix of the source's environment variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            SourceKind::Anthroprotect => "ANTHROPROTECT",
            SourceKind::CmemsCurrents => "CMEMS_CURRENTS",
            SourceKind::CmemsPhysics => "CMEMS_PHYSICS",
            SourceKind::CmemsWaves => "CMEMS_WAVES",
            SourceKind::Gfs => "GFS",
            SourceKind::GlobalRelief => "GLOBAL_RELIEF",
        }
    }

    fn default_folder(&self) -> &'static str {
        match self {
            SourceKind::Anthroprotect => "anthroprotect",
            SourceKind::CmemsCurrents => "currents",
            SourceKind::CmemsPhysics => "physics",
            SourceKind::CmemsWaves => "waves",
            SourceKind::Gfs => "weather",
            SourceKind::GlobalRelief => "global_relief",
        }
    }

    fn default_product_names(&self) -> Vec<String> {
        let names: &[&str] = match self {
            SourceKind::Anthroprotect => &["s2", "s2_scl", "lcs"],
            SourceKind::CmemsCurrents => &["currents"],
            SourceKind::CmemsPhysics => &["physics"],
            SourceKind::CmemsWaves => &["waves"],
            SourceKind::Gfs => &["weather"],
            SourceKind::GlobalRelief => &["global_relief"],
        };
        names.iter().map(|n| n.to_string()).collect()
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Settings of one enabled source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Folder below the data root holding the source's files.
    pub folder: String,
    pub product_names: Vec<String>,
    pub url: Option<String>,
    /// Archive (`_ZIP`) or single file (`_FILE_NAME`) the URL is saved as.
    pub download_name: Option<String>,
    /// Expected lowercase hex SHA-256 of the archive.
    pub sha256: Option<String>,
    pub force_download: bool,
}

impl SourceConfig {
    /// Defaults of `kind`, as used when no variable overrides them.
    pub fn defaults(kind: SourceKind) -> Self {
        let (url, download_name, sha256) = match kind {
            SourceKind::Anthroprotect => (
                Some(ANTHROPROTECT_URL),
                Some("anthroprotect.zip"),
                Some(ANTHROPROTECT_SHA256),
            ),
            SourceKind::GlobalRelief => (Some(GLOBAL_RELIEF_URL), Some(GLOBAL_RELIEF_FILE), None),
            _ => (None, None, None),
        };
        Self {
            kind,
            folder: kind.default_folder().to_string(),
            product_names: kind.default_product_names(),
            url: url.map(str::to_string),
            download_name: download_name.map(str::to_string),
            sha256: sha256.map(str::to_string),
            force_download: false,
        }
    }
}

/// Unit of the periodic schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    /// Once a week on the given day.
    Weekday(Weekday),
}

impl FromStr for PeriodUnit {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "second" | "seconds" => PeriodUnit::Seconds,
            "minute" | "minutes" => PeriodUnit::Minutes,
            "hour" | "hours" => PeriodUnit::Hours,
            "day" | "days" => PeriodUnit::Days,
            "week" | "weeks" => PeriodUnit::Weeks,
            "monday" => PeriodUnit::Weekday(Weekday::Mon),
            "tuesday" => PeriodUnit::Weekday(Weekday::Tue),
            "wednesday" => PeriodUnit::Weekday(Weekday::Wed),
            "thursday" => PeriodUnit::Weekday(Weekday::Thu),
            "friday" => PeriodUnit::Weekday(Weekday::Fri),
            "saturday" => PeriodUnit::Weekday(Weekday::Sat),
            "sunday" => PeriodUnit::Weekday(Weekday::Sun),
            other => {
                return Err(IngestionError::InvalidConfig(format!(
                    "PERIODIC_UNIT '{}' is not a known unit or weekday",
                    other
                )))
            }
        };
        Ok(unit)
    }
}

/// Deadline after which periodic runs stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Until {
    /// A point in time in the schedule's timezone.
    DateTime(NaiveDateTime),
    /// A time of day on the day the importer starts.
    TimeOfDay(NaiveTime),
}

impl FromStr for Until {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Until::DateTime(dt));
            }
        }
        parse_time_of_day(s)
            .map(Until::TimeOfDay)
            .ok_or_else(|| IngestionError::InvalidConfig(format!("PERIODIC_UNTIL '{}'", s)))
    }
}

/// Periodic run schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicConfig {
    pub every: u32,
    pub unit: PeriodUnit,
    /// Time of day; only with day, week and weekday units.
    pub at: Option<NaiveTime>,
    /// IANA timezone name `at` and `until` are interpreted in.
    pub timezone: String,
    pub until: Option<Until>,
    /// Minimum pause between schedule checks.
    pub sleep: Duration,
}

/// Top-level importer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImporterConfig {
    pub base_folder: PathBuf,
    /// Folder below `base_folder` holding the data of all sources.
    pub data_folder: String,
    /// Enabled sources in processing order.
    pub sources: Vec<SourceConfig>,
    /// `None` runs the import once.
    pub periodic: Option<PeriodicConfig>,
}

impl ImporterConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let sources = SourceKind::ALL
            .iter()
            .filter_map(|kind| match vars.flag(&format!("{}_ENABLED", kind.env_prefix())) {
                Ok(true) => Some(vars.source(*kind)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>>>()?;

        let periodic = if vars.flag("PERIODIC")? {
            Some(vars.periodic()?)
        } else {
            None
        };

        Ok(Self {
            base_folder: PathBuf::from(vars.string("BASE_FOLDER", DEFAULT_BASE_FOLDER)),
            data_folder: vars.string("DATA_FOLDER", DEFAULT_DATA_FOLDER),
            sources,
            periodic,
        })
    }

    /// Absolute folder all sources live in.
    pub fn data_root(&self) -> PathBuf {
        self.base_folder.join(&self.data_folder)
    }
}

/// Parse a boolean flag value.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn flag(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(v) => parse_bool(&v).ok_or_else(|| {
                IngestionError::InvalidConfig(format!("{} must be a boolean, got '{}'", key, v))
            }),
        }
    }

    fn number<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|v| {
                v.trim().parse::<T>().map_err(|_| {
                    IngestionError::InvalidConfig(format!("{} must be a number, got '{}'", key, v))
                })
            })
            .transpose()
    }

    fn source(&self, kind: SourceKind) -> Result<SourceConfig> {
        let prefix = kind.env_prefix();
        let key = |suffix: &str| format!("{}_{}", prefix, suffix);
        let mut config = SourceConfig::defaults(kind);

        if let Some(folder) = self.get(&key("FOLDER")) {
            config.folder = folder;
        }
        if let Some(url) = self.get(&key("URL")) {
            config.url = Some(url);
        }
        let download_key = match kind {
            SourceKind::GlobalRelief => "FILE_NAME",
            _ => "ZIP",
        };
        if let Some(name) = self.get(&key(download_key)) {
            config.download_name = Some(name);
        }
        if let Some(hash) = self.get(&key("ZIP_SHA256")) {
            config.sha256 = Some(hash.trim().to_ascii_lowercase());
        }
        config.force_download = self.flag(&key("FORCE_DOWNLOAD"))?;

        match kind {
            SourceKind::Anthroprotect => {
                if let Some(names) = self.get(&key("PRODUCT_NAMES")) {
                    config.product_names = names.split_whitespace().map(str::to_string).collect();
                }
                if config.product_names.len() != 3 {
                    return Err(IngestionError::InvalidConfig(format!(
                        "{} needs exactly 3 product names (s2, s2_scl, lcs), got {:?}",
                        key("PRODUCT_NAMES"),
                        config.product_names
                    )));
                }
            }
            _ => {
                if let Some(name) = self.get(&key("PRODUCT_NAME")) {
                    config.product_names = vec![name.trim().to_string()];
                }
            }
        }

        Ok(config)
    }

    fn periodic(&self) -> Result<PeriodicConfig> {
        let unit: PeriodUnit = self
            .get("PERIODIC_UNIT")
            .ok_or_else(|| IngestionError::InvalidConfig("PERIODIC_UNIT is required".to_string()))?
            .parse()?;

        let every = self.number::<u32>("PERIODIC_EVERY")?.unwrap_or(1);
        if every == 0 {
            return Err(IngestionError::InvalidConfig(
                "PERIODIC_EVERY must be at least 1".to_string(),
            ));
        }
        if matches!(unit, PeriodUnit::Weekday(_)) && every != 1 {
            return Err(IngestionError::InvalidConfig(format!(
                "PERIODIC_EVERY must be 1 for weekday units, got {}",
                every
            )));
        }

        let at = self
            .get("PERIODIC_AT")
            .map(|v| {
                parse_time_of_day(v.trim())
                    .ok_or_else(|| IngestionError::InvalidConfig(format!("PERIODIC_AT '{}'", v)))
            })
            .transpose()?;
        if at.is_some()
            && matches!(
                unit,
                PeriodUnit::Seconds | PeriodUnit::Minutes | PeriodUnit::Hours
            )
        {
            return Err(IngestionError::InvalidConfig(
                "PERIODIC_AT needs a days, weeks or weekday unit".to_string(),
            ));
        }

        let until = self.get("PERIODIC_UNTIL").map(|v| v.parse()).transpose()?;
        let sleep = self.number::<u64>("PERIODIC_SLEEP")?.unwrap_or(1).max(1);

        Ok(PeriodicConfig {
            every,
            unit,
            at,
            timezone: self.string("PERIODIC_TIMEZONE", "UTC"),
            until,
            sleep: Duration::from_secs(sleep),
        })
    }
}
