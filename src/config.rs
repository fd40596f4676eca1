//! Environment-driven settings

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::constants::DEFAULT_RASTER_MAX_SIZE;

pub const ENV_PREFIX: &str = "ICESAT_";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Where `resolve-item` writes `<item-id>.json` without an explicit destination.
    pub item_output_dir: PathBuf,
    pub raster_max_size: usize,
    pub s3_endpoint_url: Option<String>,
    pub s3_force_path_style: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            item_output_dir: PathBuf::from("/tmp"),
            raster_max_size: DEFAULT_RASTER_MAX_SIZE,
            s3_endpoint_url: None,
            s3_force_path_style: false,
        }
    }
}

impl Settings {
    /// Read `ICESAT_*` variables from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Settings::default();

        let raster_max_size = match var("RASTER_MAX_SIZE") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!("Ignoring {ENV_PREFIX}RASTER_MAX_SIZE={raw:?}, using {}", defaults.raster_max_size);
                    defaults.raster_max_size
                }
            },
            None => defaults.raster_max_size,
        };

        let s3_endpoint_url = var("S3_ENDPOINT_URL");
        let s3_force_path_style = match var("S3_FORCE_PATH_STYLE") {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!("Ignoring {ENV_PREFIX}S3_FORCE_PATH_STYLE={raw:?}");
                s3_endpoint_url.is_some()
            }),
            // Custom endpoints (MinIO, localstack) rarely support virtual hosts
            None => s3_endpoint_url.is_some(),
        };

        Settings {
            item_output_dir: var("ITEM_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.item_output_dir),
            raster_max_size,
            s3_endpoint_url,
            s3_force_path_style,
        }
    }

    pub fn item_output_path(&self, item_id: &str) -> PathBuf {
        self.item_output_dir.join(format!("{item_id}.json"))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]);
        assert_eq!(s, Settings::default());
        assert_eq!(s.item_output_path("boreal_ht"), PathBuf::from("/tmp/boreal_ht.json"));
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("ICESAT_ITEM_OUTPUT_DIR", "/data/items"),
            ("ICESAT_RASTER_MAX_SIZE", "512"),
            ("ICESAT_S3_ENDPOINT_URL", "http://localhost:9000"),
        ]);
        assert_eq!(s.item_output_dir, PathBuf::from("/data/items"));
        assert_eq!(s.raster_max_size, 512);
        assert_eq!(s.s3_endpoint_url.as_deref(), Some("http://localhost:9000"));
        assert!(s.s3_force_path_style);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let s = settings(&[
            ("ICESAT_RASTER_MAX_SIZE", "0"),
            ("ICESAT_S3_FORCE_PATH_STYLE", "maybe"),
            ("ICESAT_ITEM_OUTPUT_DIR", "  "),
        ]);
        assert_eq!(s.raster_max_size, DEFAULT_RASTER_MAX_SIZE);
        assert!(!s.s3_force_path_style);
        assert_eq!(s.item_output_dir, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_explicit_path_style() {
        let s = settings(&[
            ("ICESAT_S3_ENDPOINT_URL", "http://localhost:9000"),
            ("ICESAT_S3_FORCE_PATH_STYLE", "false"),
        ]);
        assert!(!s.s3_force_path_style);
    }
}
