//! Static catalog configuration for the ICESat-2 boreal products
//!
//! Everything here is plain data: the variables and asset roles, the text
//! blocks, providers, summaries, render presets and band templates. The
//! resolver and synthesizer look things up in these tables and never branch
//! on a specific variable or role themselves.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const STAC_VERSION: &str = "1.1.0";
pub const VERSION: &str = "v3.0";

/// Delimiter between the positional fields of an item id.
pub const ID_DELIMITER: char = '_';

pub const COG_MEDIA_TYPE: &str = "image/tiff; application=geotiff; profile=cloud-optimized";
pub const CSV_MEDIA_TYPE: &str = "text/csv";
pub const PARQUET_MEDIA_TYPE: &str = "application/vnd.apache.parquet";
pub const RDS_MEDIA_TYPE: &str = "application/octet-stream";
pub const GEOPACKAGE_MEDIA_TYPE: &str = "application/geopackage+sqlite3";
pub const HTML_MEDIA_TYPE: &str = "text/html";
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Nominal ground sample distance of the gridded products, in metres.
pub const RESOLUTION: f64 = 30.0;

/// Largest edge length (pixels) read when sampling band statistics.
pub const DEFAULT_RASTER_MAX_SIZE: usize = 3000;

pub const BBOX: [f64; 4] = [-180.0, 51.6, 180.0, 78.0];

/// The collection covers calendar years `TEMPORAL_START_YEAR..=TEMPORAL_END_YEAR`.
pub const TEMPORAL_START_YEAR: i32 = 2020;
pub const TEMPORAL_END_YEAR: i32 = 2020;

pub const LICENSE: &str = "CC-BY";
pub const PROCESSING_LEVEL: &str = "L4";

pub const VERSION_EXTENSION: &str = "https://stac-extensions.github.io/version/v1.2.0/schema.json";
pub const RENDER_EXTENSION: &str = "https://stac-extensions.github.io/render/v1.0.0/schema.json";
pub const SCIENTIFIC_EXTENSION: &str =
    "https://stac-extensions.github.io/scientific/v1.0.0/schema.json";
pub const PROCESSING_EXTENSION: &str =
    "https://stac-extensions.github.io/processing/v1.2.0/schema.json";
pub const PROJECTION_EXTENSION: &str =
    "https://stac-extensions.github.io/projection/v2.0.0/schema.json";

pub const REPOSITORY_URL: &str = "https://github.com/lauraduncanson/icesat2_boreal";
pub const REPOSITORY_TITLE: &str = "icesat2_boreal GitHub repository";
pub const STAC_API_COLLECTIONS_URL: &str = "https://stac.maap-project.org/collections";
pub const LEGACY_COLLECTION_URL: &str = "https://stac.maap-project.org/collections/icesat2-boreal";

pub const KEYWORDS: &[&str] = &["BIOMASS", "VEGETATION HEIGHT"];

pub const PROVIDER_NAME: &str = "MAAP";
pub const PROVIDER_DESCRIPTION: &str = "The MAAP platform is designed to combine data, \
algorithms, and computational abilities for the processing and sharing of data related to \
NASA’s GEDI, ESA’s BIOMASS, and NASA/ISRO’s NISAR missions";
pub const PROVIDER_URL: &str = "https://maap-project.org";
pub const PROVIDER_ROLES: &[&str] = &["processor", "producer", "host"];

// Platforms in HLS plus the lidar mission
pub const SUMMARY_PLATFORMS: &[&str] = &[
    "LANDSAT-8",
    "LANDSAT-9",
    "SENTINEL-2A",
    "SENTINEL-2B",
    "ICESat-2",
];
pub const SUMMARY_INSTRUMENTS: &[&str] = &[
    "Advanced Topographic Laser Altimeter System",
    "Operational Land Imager",
    "Operational Land Imager 2",
    "Sentinel-2 Multispectral Imager",
];
pub const SUMMARY_MISSIONS: &[&str] = &["ABoVE"];

pub const COLLECTION_DESCRIPTION: &str = "This dataset provides predictions of woody aboveground
biomass density (AGBD) and vegetation height for high northern latitude forests at 30 m
spatial resolution for the year 2020, accounting for >30% of global forest area.

Maps of woody AGBD and height are essential for understanding patterns of forest
structure, including the mass of forest vegetation, its carbon content, and its vertical
and horizontal arrangement across managed and unmanaged landscapes. These maps are
optimized to visualize these patterns, monitor forest conditions, and manage forest
carbon stocks and their changes.

These maps are built with state-of-the-art earth observation datasets collected from
space, including lidar observations from NASA’s ICESat-2 and imagery from NASA’s
Harmonized Landsat/Sentinel-2 project. They are designed for circumpolar boreal-wide
mapping from local to global scales and provide the northern component of global forest
structure estimates, to which complementary estimates from NASA's Global Ecosystem
Dynamics Investigation (GEDI) mission contribute temperate and tropical portions. The
AGBD and height predictions cover the extent of high latitude boreal forests and
shrublands, and while they extend southward outside the boreal domain nominally to ~50°N
they are intended to contribute to global estimates northward from 51.6°N.

These maps are compiled on the Multi-mission Algorithm and Analysis Platform
(www.maap-project.org), an international partnership between NASA and the European Space
Agency to promote and support science that is accessible, reproducible, and
well-documented. The primary funding source for this work came through NASA Terrestrial
Ecology Program grants associated with NASA’s Arctic/Boreal Vulnerability Experiment
(http://above.nasa.gov)";

pub const COLLECTION_CITATION: &str = "Duncanson, L., P.M. Montesano, A. Neuenschwander, A.
Zarringhalam, N. Thomas, A. Mandel, D. Minor, E. Guenther, S. Hancock, T. Feng, A.
Barciauskas, G.W. Chang, S. Shah, and B.P. Satorius. Circumpolar boreal aboveground
biomass mapping with ICESat-2. (in prep.)";

// =============================================================================
// Variables
// =============================================================================

/// Measured quantity a product represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variable {
    Agb,
    Ht,
}

impl Variable {
    pub const ALL: [Variable; 2] = [Variable::Agb, Variable::Ht];

    pub fn as_str(self) -> &'static str {
        match self {
            Variable::Agb => "agb",
            Variable::Ht => "ht",
        }
    }

    /// Collection identifier, e.g. `icesat2-boreal-v3.0-agb`.
    pub fn collection_id(self) -> String {
        format!("icesat2-boreal-{}-{}", VERSION, self.as_str())
    }

    pub fn text(self) -> &'static VariableText {
        match self {
            Variable::Agb => &AGB_TEXT,
            Variable::Ht => &HT_TEXT,
        }
    }

    pub fn renders(self) -> &'static [RenderPreset] {
        match self {
            Variable::Agb => AGB_RENDERS,
            Variable::Ht => HT_RENDERS,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown variable '{s}', expected one of: {}",
                    Variable::ALL.map(Variable::as_str).join(", ")
                )
            })
    }
}

/// Human-readable texts that differ per variable.
#[derive(Debug)]
pub struct VariableText {
    pub collection_title_suffix: &'static str,
    pub unit: &'static str,
    pub cog_title: &'static str,
    pub cog_description: &'static str,
    pub training_description: &'static str,
    pub tiles_href: &'static str,
    pub tiles_description: &'static str,
}

static AGB_TEXT: VariableText = VariableText {
    collection_title_suffix: "30m aboveground woody biomass density",
    unit: "Mg ha-1",
    cog_title: "Gridded predictions of aboveground biomass (Mg/ha)",
    cog_description: "Gridded predictions of aboveground biomass (Mg/ha)",
    training_description: "Tabular training data with latitude, longitude, and biomass observations",
    tiles_href: "s3://nasa-maap-data-store/file-staging/nasa-map/icesat2-boreal-v2.1/agb/boreal_tiles_v004_AGB_H30_2020_ORNLDAAC.gpkg",
    tiles_description: "90 km tile geometries for processing AGB predictions",
};

static HT_TEXT: VariableText = VariableText {
    collection_title_suffix: "30m vegetation height",
    unit: "m",
    cog_title: "Gridded predictions of vegetation height (m)",
    cog_description: "Gridded predictions of vegetation height (m)",
    training_description: "Tabular training data with latitude, longitude, and height observations",
    tiles_href: "s3://nasa-maap-data-store/file-staging/nasa-map/icesat2-boreal-v2.1/ht/boreal_tiles_v004_HT_H30_2020_ORNLDAAC.gpkg",
    tiles_description: "90 km tile geometries for processing vegetation height predictions",
};

/// "2020" for a single year, "2020-2024" for a span.
pub fn format_year_range(start_year: i32, end_year: i32) -> String {
    if start_year == end_year {
        start_year.to_string()
    } else {
        format!("{start_year}-{end_year}")
    }
}

pub fn collection_title(variable: Variable) -> String {
    format!(
        "Circumpolar boreal forest structure from ICESat-2 & HLS ({} {}): {}",
        format_year_range(TEMPORAL_START_YEAR, TEMPORAL_END_YEAR),
        VERSION,
        variable.text().collection_title_suffix
    )
}

// =============================================================================
// Asset roles
// =============================================================================

/// Classification of the files that make up one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    Cog,
    TrainingDataCsv,
    Model,
}

/// One accepted filename suffix of a role and the media type it implies.
#[derive(Debug, PartialEq, Eq)]
pub struct FileFormat {
    pub suffix: &'static str,
    pub media_type: &'static str,
}

/// Immutable per-role metadata: accepted file formats and asset template
/// fields. The first format is the default.
#[derive(Debug)]
pub struct RoleSpec {
    pub role: AssetRole,
    pub formats: &'static [FileFormat],
    pub required: bool,
    pub roles: &'static [&'static str],
    pub title: Option<&'static str>,
}

static ROLE_TABLE: [RoleSpec; 3] = [
    RoleSpec {
        role: AssetRole::Cog,
        formats: &[FileFormat {
            suffix: ".tif",
            media_type: COG_MEDIA_TYPE,
        }],
        required: true,
        roles: &["data"],
        title: None,
    },
    RoleSpec {
        role: AssetRole::TrainingDataCsv,
        formats: &[
            FileFormat {
                suffix: "_train_data.csv",
                media_type: CSV_MEDIA_TYPE,
            },
            FileFormat {
                suffix: "_train.parquet",
                media_type: PARQUET_MEDIA_TYPE,
            },
        ],
        required: true,
        roles: &["data"],
        title: Some("Tabular training data"),
    },
    RoleSpec {
        role: AssetRole::Model,
        formats: &[FileFormat {
            suffix: "_model.Rds",
            media_type: RDS_MEDIA_TYPE,
        }],
        required: false,
        roles: &["model"],
        title: Some("Prediction model"),
    },
];

impl AssetRole {
    pub const ALL: [AssetRole; 3] = [AssetRole::Cog, AssetRole::TrainingDataCsv, AssetRole::Model];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetRole::Cog => "cog",
            AssetRole::TrainingDataCsv => "training_data_csv",
            AssetRole::Model => "model",
        }
    }

    pub fn spec(self) -> &'static RoleSpec {
        // ROLE_TABLE is declared in enum order
        &ROLE_TABLE[self as usize]
    }

    pub fn matches_file(self, filename: &str) -> bool {
        self.spec().format_of(filename).is_some()
    }

    /// Title and description of this role's asset for `variable`.
    pub fn text(self, variable: Variable) -> (Option<&'static str>, Option<&'static str>) {
        let text = variable.text();
        match self {
            AssetRole::Cog => (Some(text.cog_title), Some(text.cog_description)),
            AssetRole::TrainingDataCsv => (self.spec().title, Some(text.training_description)),
            AssetRole::Model => (
                self.spec().title,
                Some("Random forest model used to generate predictions for this item, stored as an .Rds"),
            ),
        }
    }
}

impl RoleSpec {
    /// Format whose suffix `filename` ends with.
    pub fn format_of(&self, filename: &str) -> Option<&'static FileFormat> {
        self.formats.iter().find(|format| filename.ends_with(format.suffix))
    }

    /// `filename` without this role's suffix.
    pub fn strip_suffix<'a>(&self, filename: &'a str) -> Option<&'a str> {
        self.format_of(filename)
            .and_then(|format| filename.strip_suffix(format.suffix))
    }

    pub fn default_media_type(&self) -> &'static str {
        self.formats.first().map_or("application/octet-stream", |f| f.media_type)
    }

    /// Media type for the asset at `href`, falling back to the default.
    pub fn media_type_for(&self, href: &str) -> &'static str {
        self.format_of(href)
            .map_or_else(|| self.default_media_type(), |format| format.media_type)
    }

    pub fn suffixes(&self) -> Vec<&'static str> {
        self.formats.iter().map(|format| format.suffix).collect()
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn role_table() -> &'static [RoleSpec] {
    &ROLE_TABLE
}

pub fn required_roles() -> BTreeSet<AssetRole> {
    ROLE_TABLE
        .iter()
        .filter(|spec| spec.required)
        .map(|spec| spec.role)
        .collect()
}

// =============================================================================
// Bands
// =============================================================================

/// Static half of a band descriptor; introspected values are merged on top.
#[derive(Debug)]
pub struct BandTemplate {
    pub name: &'static str,
    pub sampling: &'static str,
    pub nodata: &'static str,
    pub scale: f64,
    pub offset: f64,
    pub data_type: &'static str,
    pub spatial_resolution: f64,
}

/// Both products are 2-band rasters: bootstrap mean and standard deviation.
pub static BAND_TEMPLATES: [BandTemplate; 2] = [
    BandTemplate {
        name: "predicted",
        sampling: "area",
        nodata: "nan",
        scale: 1.0,
        offset: 0.0,
        data_type: "float32",
        spatial_resolution: RESOLUTION,
    },
    BandTemplate {
        name: "sd",
        sampling: "area",
        nodata: "nan",
        scale: 1.0,
        offset: 0.0,
        data_type: "float32",
        spatial_resolution: RESOLUTION,
    },
];

// =============================================================================
// Render presets
// =============================================================================

#[derive(Debug)]
pub struct RenderPreset {
    pub key: &'static str,
    pub title: &'static str,
    pub expression: &'static str,
    pub rescale: [f64; 2],
    pub colormap_name: &'static str,
    pub color_formula: Option<&'static str>,
    pub minmax_zoom: [u8; 2],
}

static AGB_RENDERS: &[RenderPreset] = &[
    RenderPreset {
        key: "agb_viridis",
        title: "Aboveground biomass (Mg/ha)",
        expression: "cog_b1",
        rescale: [0.0, 125.0],
        colormap_name: "viridis",
        color_formula: None,
        minmax_zoom: [6, 18],
    },
    RenderPreset {
        key: "agb_gist_earth_r",
        title: "Aboveground biomass (Mg/ha)",
        expression: "cog_b1",
        rescale: [0.0, 400.0],
        colormap_name: "gist_earth_r",
        color_formula: Some("gamma r 1.05"),
        minmax_zoom: [6, 18],
    },
];

static HT_RENDERS: &[RenderPreset] = &[RenderPreset {
    key: "ht_inferno",
    title: "Vegetation height (m)",
    expression: "cog_b1",
    rescale: [0.0, 30.0],
    colormap_name: "inferno",
    color_formula: None,
    minmax_zoom: [6, 18],
}];
