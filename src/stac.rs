//! STAC collection and item synthesis for the ICESat-2 boreal products

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::catalog::{
    Asset, Extent, ItemAssetDefinition, Link, Provider, SpatialExtent, StacCollection, StacItem,
    TemporalExtent as CatalogTemporalExtent, Validate,
};
use crate::constants::{
    collection_title, required_roles, AssetRole, Variable, BAND_TEMPLATES, BBOX,
    COLLECTION_CITATION, COLLECTION_DESCRIPTION, DEFAULT_RASTER_MAX_SIZE, GEOPACKAGE_MEDIA_TYPE,
    HTML_MEDIA_TYPE, JSON_MEDIA_TYPE, KEYWORDS, LEGACY_COLLECTION_URL, LICENSE,
    PROCESSING_EXTENSION, PROCESSING_LEVEL, PROJECTION_EXTENSION, PROVIDER_DESCRIPTION,
    PROVIDER_NAME, PROVIDER_ROLES, PROVIDER_URL, RENDER_EXTENSION, REPOSITORY_TITLE,
    REPOSITORY_URL, RESOLUTION, SCIENTIFIC_EXTENSION, STAC_API_COLLECTIONS_URL, STAC_VERSION,
    SUMMARY_INSTRUMENTS, SUMMARY_MISSIONS, SUMMARY_PLATFORMS, TEMPORAL_END_YEAR,
    TEMPORAL_START_YEAR, VERSION, VERSION_EXTENSION,
};
use crate::error::{Result, StacError};
use crate::identity::{item_id_from_key, ItemIdentity, TemporalExtent};
use crate::raster::{BandInfo, Footprint, RasterIntrospector};
use crate::resolver::{missing_roles, AssetKeyMap};

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("paragraph break pattern is valid"));
static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +").expect("space run pattern is valid"));

/// Join hard-wrapped lines into single spaces while keeping paragraph
/// breaks, then squeeze runs of spaces.
pub fn format_multiline_string(text: &str) -> String {
    let join_lines = |paragraph: &str| SPACE_RUN.replace_all(&paragraph.replace('\n', " "), " ").into_owned();

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for brk in PARAGRAPH_BREAK.find_iter(text) {
        out.push_str(&join_lines(&text[last..brk.start()]));
        out.push_str(brk.as_str());
        last = brk.end();
    }
    out.push_str(&join_lines(&text[last..]));
    out
}

/// RFC 3339 in UTC with a `Z` suffix; sub-second digits only when present.
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Convert bbox to GeoJSON Polygon
fn bbox_to_polygon(bbox: &[f64; 4]) -> Value {
    let [west, south, east, north] = *bbox;
    json!({
        "type": "Polygon",
        "coordinates": [[
            [west, south],
            [east, south],
            [east, north],
            [west, north],
            [west, south]
        ]]
    })
}

// =============================================================================
// Asset templates
// =============================================================================

/// Static band descriptors for `variable`, in band order.
pub fn band_templates(variable: Variable) -> Vec<Map<String, Value>> {
    BAND_TEMPLATES
        .iter()
        .map(|band| {
            let mut fields = Map::new();
            fields.insert("name".into(), json!(band.name));
            fields.insert("sampling".into(), json!(band.sampling));
            fields.insert("nodata".into(), json!(band.nodata));
            fields.insert("scale".into(), json!(band.scale));
            fields.insert("offset".into(), json!(band.offset));
            fields.insert("data_type".into(), json!(band.data_type));
            fields.insert("spatial_resolution".into(), json!(band.spatial_resolution));
            fields.insert("unit".into(), json!(variable.text().unit));
            fields
        })
        .collect()
}

/// Asset templates of every role for `variable`.
pub fn item_assets(variable: Variable) -> BTreeMap<AssetRole, ItemAssetDefinition> {
    AssetRole::ALL
        .into_iter()
        .map(|role| {
            let spec = role.spec();
            let (title, description) = role.text(variable);
            let mut extra = BTreeMap::new();
            if role == AssetRole::Cog {
                extra.insert("gsd".to_string(), json!(RESOLUTION));
                extra.insert("processing:level".to_string(), json!(PROCESSING_LEVEL));
                extra.insert(
                    "bands".to_string(),
                    Value::Array(band_templates(variable).into_iter().map(Value::Object).collect()),
                );
            }
            let definition = ItemAssetDefinition {
                type_: Some(spec.default_media_type().to_string()),
                title: title.map(str::to_string),
                description: description.map(str::to_string),
                roles: spec.roles.iter().map(|r| r.to_string()).collect(),
                extra,
            };
            (role, definition)
        })
        .collect()
}

fn nodata_value(nodata: f64) -> Value {
    // JSON has no NaN or infinities; STAC spells them as strings
    if nodata.is_nan() {
        json!("nan")
    } else if nodata == f64::INFINITY {
        json!("inf")
    } else if nodata == f64::NEG_INFINITY {
        json!("-inf")
    } else {
        json!(nodata)
    }
}

/// Overlay introspected band values on the templates, position by position.
pub fn merge_bands(
    templates: Vec<Map<String, Value>>,
    bands: &[BandInfo],
) -> Result<Vec<Map<String, Value>>> {
    if templates.len() != bands.len() {
        return Err(StacError::BandCountMismatch {
            expected: templates.len(),
            actual: bands.len(),
        });
    }

    Ok(templates
        .into_iter()
        .zip(bands)
        .map(|(mut fields, band)| {
            if !band.data_type.is_empty() {
                fields.insert("data_type".into(), json!(band.data_type));
            }
            if let Some(nodata) = band.nodata {
                fields.insert("nodata".into(), nodata_value(nodata));
            }
            if let Some(scale) = band.scale {
                fields.insert("scale".into(), json!(scale));
            }
            if let Some(offset) = band.offset {
                fields.insert("offset".into(), json!(offset));
            }
            if let Some(unit) = &band.unit {
                fields.insert("unit".into(), json!(unit));
            }
            if let Some(stats) = &band.statistics {
                fields.insert("statistics".into(), json!(stats));
            }
            fields
        })
        .collect())
}

// =============================================================================
// Items
// =============================================================================

/// Builds validated items from resolved asset keys.
pub struct ItemSynthesizer<R> {
    introspector: R,
    max_size: usize,
}

impl<R: RasterIntrospector> ItemSynthesizer<R> {
    pub fn new(introspector: R) -> Self {
        ItemSynthesizer {
            introspector,
            max_size: DEFAULT_RASTER_MAX_SIZE,
        }
    }

    /// Cap on the edge length of the raster sample used for statistics.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Item from two explicit asset locations, without storage resolution.
    pub fn create_item(&self, cog_key: &str, table_key: &str) -> Result<StacItem> {
        let asset_keys = AssetKeyMap::from([
            (AssetRole::Cog, cog_key.to_string()),
            (AssetRole::TrainingDataCsv, table_key.to_string()),
        ]);
        self.build(&asset_keys, None)
    }

    /// Synthesize the item for `asset_keys`. `variable_override` selects the
    /// templates and collection instead of the variable in the filename.
    pub fn build(&self, asset_keys: &AssetKeyMap, variable_override: Option<Variable>) -> Result<StacItem> {
        let missing = missing_roles(&required_roles(), asset_keys.keys());
        if !missing.is_empty() {
            return Err(StacError::IncompleteAssetSet { missing });
        }
        let cog_key = &asset_keys[&AssetRole::Cog];

        let identity = ItemIdentity::parse(item_id_from_key(cog_key))?;
        let variable = match variable_override {
            Some(v) if v != identity.variable => {
                warn!(
                    "Item {} is named as {} but built as {}",
                    identity.id, identity.variable, v
                );
                v
            }
            Some(v) => v,
            None => identity.variable,
        };
        let extent = identity.temporal_extent()?;
        let collection_id = variable.collection_id();

        let templates = item_assets(variable);
        let mut assets: BTreeMap<String, Asset> = asset_keys
            .iter()
            .map(|(role, key)| {
                let mut asset = templates[role].create_asset(key.clone());
                asset.type_ = Some(role.spec().media_type_for(key).to_string());
                (role.as_str().to_string(), asset)
            })
            .collect();

        let raster = self.introspector.introspect(cog_key, self.max_size)?;
        let bands = merge_bands(band_templates(variable), &raster.bands)?;
        if let Some(cog) = assets.get_mut(AssetRole::Cog.as_str()) {
            cog.extra.insert(
                "bands".to_string(),
                Value::Array(bands.into_iter().map(Value::Object).collect()),
            );
        }

        let mut item = StacItem {
            type_: "Feature".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: vec![PROCESSING_EXTENSION.to_string()],
            id: identity.id.clone(),
            geometry: None,
            bbox: None,
            properties: item_properties(&identity, &extent),
            links: vec![
                Link::new("collection", format!("{STAC_API_COLLECTIONS_URL}/{collection_id}"))
                    .media_type(JSON_MEDIA_TYPE),
                Link::new("parent", format!("{STAC_API_COLLECTIONS_URL}/{collection_id}"))
                    .media_type(JSON_MEDIA_TYPE),
            ],
            assets,
            collection: Some(collection_id),
        };
        if let Some(footprint) = &raster.footprint {
            apply_footprint(&mut item, footprint);
        }

        item.validate()?;
        info!("Created item {} in {}", item.id, variable.collection_id());
        Ok(item)
    }
}

fn item_properties(identity: &ItemIdentity, extent: &TemporalExtent) -> BTreeMap<String, Value> {
    let mut properties = BTreeMap::new();
    properties.insert("datetime".to_string(), json!(format_datetime(extent.midpoint())));
    properties.insert("start_datetime".to_string(), json!(format_datetime(extent.start)));
    properties.insert("end_datetime".to_string(), json!(format_datetime(extent.end)));
    properties.insert(
        "created_datetime".to_string(),
        json!(format_datetime(identity.created_datetime())),
    );
    if !identity.tile.is_empty() {
        properties.insert("icesat2-boreal:tile".to_string(), json!(identity.tile.join("_")));
    }
    properties
}

fn apply_footprint(item: &mut StacItem, footprint: &Footprint) {
    item.geometry = Some(bbox_to_polygon(&footprint.bbox));
    item.bbox = Some(footprint.bbox.to_vec());

    let code = footprint.epsg.map(|epsg| format!("EPSG:{epsg}"));
    item.properties.insert("proj:code".to_string(), json!(code));
    item.properties.insert("proj:bbox".to_string(), json!(footprint.proj_bbox));
    item.properties.insert("proj:shape".to_string(), json!(footprint.shape));
    item.properties.insert("proj:transform".to_string(), json!(footprint.transform));
    item.stac_extensions.push(PROJECTION_EXTENSION.to_string());
}

// =============================================================================
// Collections
// =============================================================================

fn render_presets(variable: Variable) -> Value {
    let renders: Map<String, Value> = variable
        .renders()
        .iter()
        .map(|preset| {
            let mut fields = Map::new();
            fields.insert("assets".into(), json!([AssetRole::Cog.as_str()]));
            fields.insert("title".into(), json!(preset.title));
            fields.insert("expression".into(), json!(preset.expression));
            fields.insert("rescale".into(), json!([preset.rescale]));
            fields.insert("colormap_name".into(), json!(preset.colormap_name));
            if let Some(formula) = preset.color_formula {
                fields.insert("color_formula".into(), json!(formula));
            }
            fields.insert("minmax_zoom".into(), json!(preset.minmax_zoom));
            (preset.key.to_string(), Value::Object(fields))
        })
        .collect();
    Value::Object(renders)
}

fn collection_interval() -> Result<Vec<Option<String>>> {
    let start = TemporalExtent::for_year(TEMPORAL_START_YEAR);
    let end = TemporalExtent::for_year(TEMPORAL_END_YEAR);
    match (start, end) {
        (Some(start), Some(end)) => Ok(vec![
            Some(format_datetime(start.start)),
            Some(format_datetime(end.end)),
        ]),
        _ => Err(StacError::SchemaValidation(vec![
            "collection temporal extent is out of range".to_string(),
        ])),
    }
}

/// Build the collection for `variable`. Pure function of static
/// configuration: repeated calls serialize identically.
pub fn create_collection(variable: Variable) -> Result<StacCollection> {
    let text = variable.text();

    let summaries = BTreeMap::from([
        ("platform".to_string(), json!(SUMMARY_PLATFORMS)),
        ("instruments".to_string(), json!(SUMMARY_INSTRUMENTS)),
        ("mission".to_string(), json!(SUMMARY_MISSIONS)),
        ("gsd".to_string(), json!({ "minimum": RESOLUTION, "maximum": RESOLUTION })),
        ("processing:level".to_string(), json!([PROCESSING_LEVEL])),
    ]);

    let assets = BTreeMap::from([(
        "tiles".to_string(),
        Asset {
            href: text.tiles_href.to_string(),
            type_: Some(GEOPACKAGE_MEDIA_TYPE.to_string()),
            title: Some("Processing tiles".to_string()),
            description: Some(text.tiles_description.to_string()),
            roles: vec!["metadata".to_string()],
            extra: BTreeMap::new(),
        },
    )]);

    let links = vec![
        Link::new("about", REPOSITORY_URL)
            .media_type(HTML_MEDIA_TYPE)
            .title(REPOSITORY_TITLE),
        Link::new("predecessor-version", LEGACY_COLLECTION_URL).title("Previous version"),
        Link::new(
            "predecessor-version",
            format!("{STAC_API_COLLECTIONS_URL}/icesat2-boreal-v2.1-{variable}"),
        )
        .title("Previous version"),
    ];

    let extra = BTreeMap::from([
        ("version".to_string(), json!(VERSION)),
        ("deprecated".to_string(), json!(false)),
        ("renders".to_string(), render_presets(variable)),
        ("sci:citation".to_string(), json!(format_multiline_string(COLLECTION_CITATION))),
    ]);

    let collection = StacCollection {
        type_: "Collection".to_string(),
        id: variable.collection_id(),
        stac_version: STAC_VERSION.to_string(),
        stac_extensions: [
            VERSION_EXTENSION,
            PROCESSING_EXTENSION,
            RENDER_EXTENSION,
            SCIENTIFIC_EXTENSION,
        ]
        .map(str::to_string)
        .to_vec(),
        title: Some(collection_title(variable)),
        description: format_multiline_string(COLLECTION_DESCRIPTION),
        license: LICENSE.to_string(),
        keywords: KEYWORDS.iter().map(|k| k.to_string()).collect(),
        providers: vec![Provider {
            name: PROVIDER_NAME.to_string(),
            description: Some(PROVIDER_DESCRIPTION.to_string()),
            roles: PROVIDER_ROLES.iter().map(|r| r.to_string()).collect(),
            url: Some(PROVIDER_URL.to_string()),
            extra: BTreeMap::from([("processing:level".to_string(), json!(PROCESSING_LEVEL))]),
        }],
        extent: Extent {
            spatial: SpatialExtent {
                bbox: vec![BBOX.to_vec()],
            },
            temporal: CatalogTemporalExtent {
                interval: vec![collection_interval()?],
            },
        },
        summaries,
        links,
        assets,
        item_assets: item_assets(variable)
            .into_iter()
            .map(|(role, definition)| (role.as_str().to_string(), definition))
            .collect(),
        extra,
    };

    collection.validate()?;
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{BandStatistics, RasterInfo};
    use std::cell::Cell;

    const COG: &str = "s3://maap-ops-workspace/boreal/boreal_ht_2020_202501131736787421_0000004.tif";
    const CSV: &str = "s3://maap-ops-workspace/boreal/boreal_ht_2020_202501131736787421_0000004_train_data.csv";

    /// Introspector returning canned bands and counting calls.
    struct FakeRaster {
        bands: usize,
        calls: Cell<usize>,
    }

    impl FakeRaster {
        fn with_bands(bands: usize) -> Self {
            FakeRaster {
                bands,
                calls: Cell::new(0),
            }
        }
    }

    impl RasterIntrospector for &FakeRaster {
        fn introspect(&self, _href: &str, max_size: usize) -> Result<RasterInfo> {
            assert!(max_size > 0);
            self.calls.set(self.calls.get() + 1);
            let bands = (0..self.bands)
                .map(|i| BandInfo {
                    data_type: "float32".to_string(),
                    nodata: Some(f64::NAN),
                    scale: Some(1.0),
                    offset: Some(0.0),
                    unit: None,
                    statistics: Some(BandStatistics {
                        minimum: 0.0,
                        maximum: 40.0 + i as f64,
                        mean: 12.5,
                        stddev: 3.0,
                        valid_percent: 87.5,
                    }),
                })
                .collect();
            Ok(RasterInfo {
                bands,
                footprint: Some(Footprint {
                    bbox: [-120.5, 60.1, -119.2, 60.9],
                    epsg: Some(6933),
                    proj_bbox: [-11_600_000.0, 6_300_000.0, -11_510_000.0, 6_390_000.0],
                    shape: [3000, 3000],
                    transform: [30.0, 0.0, -11_600_000.0, 0.0, -30.0, 6_390_000.0],
                }),
            })
        }
    }

    #[test]
    fn test_format_multiline_string() {
        assert_eq!(
            format_multiline_string("one\ntwo  three\n\nfour\nfive"),
            "one two three\n\nfour five"
        );
        assert_eq!(format_multiline_string("a\nb\nc"), "a b c");
    }

    #[test]
    fn test_create_item() {
        let raster = FakeRaster::with_bands(2);
        let item = ItemSynthesizer::new(&raster).create_item(COG, CSV).unwrap();

        assert_eq!(item.id, "boreal_ht_2020_202501131736787421_0000004");
        assert_eq!(item.collection.as_deref(), Some("icesat2-boreal-v3.0-ht"));
        assert_eq!(item.stac_version, "1.1.0");
        assert_eq!(item.properties["start_datetime"], json!("2020-01-01T00:00:00Z"));
        assert_eq!(item.properties["end_datetime"], json!("2020-12-31T23:59:59Z"));
        assert_eq!(item.properties["datetime"], json!("2020-07-01T23:59:59.500Z"));
        assert_eq!(item.properties["created_datetime"], json!("2025-01-13T00:00:00Z"));
        assert_eq!(item.properties["proj:code"], json!("EPSG:6933"));
        assert_eq!(item.bbox, Some(vec![-120.5, 60.1, -119.2, 60.9]));

        assert_eq!(item.assets.len(), 2);
        assert_eq!(item.assets["training_data_csv"].href, CSV);
        assert!(!item.stac_extensions.iter().any(|e| e.contains("/raster/")));

        let cog = &item.assets["cog"];
        assert_eq!(cog.href, COG);
        assert_eq!(cog.title.as_deref(), Some("Gridded predictions of vegetation height (m)"));
        let bands = cog.extra["bands"].as_array().unwrap();
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0]["name"], json!("predicted"));
        assert_eq!(bands[1]["name"], json!("sd"));
        assert_eq!(bands[0]["unit"], json!("m"));
        assert_eq!(bands[0]["nodata"], json!("nan"));
        assert_eq!(bands[1]["statistics"]["maximum"], json!(41.0));
        assert_eq!(raster.calls.get(), 1);
    }

    #[test]
    fn test_create_item_with_parquet_table() {
        let raster = FakeRaster::with_bands(2);
        let table = "file://training_data.parquet";
        let item = ItemSynthesizer::new(&raster).create_item(COG, table).unwrap();

        let training = &item.assets["training_data_csv"];
        assert_eq!(training.href, table);
        assert_eq!(training.type_.as_deref(), Some(crate::constants::PARQUET_MEDIA_TYPE));
        assert_eq!(training.title.as_deref(), Some("Tabular training data"));
        assert_eq!(
            item.assets["cog"].type_.as_deref(),
            Some(crate::constants::COG_MEDIA_TYPE)
        );
    }

    #[test]
    fn test_create_item_with_csv_table_keeps_csv_media_type() {
        let raster = FakeRaster::with_bands(2);
        let item = ItemSynthesizer::new(&raster).create_item(COG, CSV).unwrap();
        assert_eq!(
            item.assets["training_data_csv"].type_.as_deref(),
            Some(crate::constants::CSV_MEDIA_TYPE)
        );
    }

    #[test]
    fn test_build_with_optional_model_asset() {
        let raster = FakeRaster::with_bands(2);
        let mut keys = AssetKeyMap::from([
            (AssetRole::Cog, COG.to_string()),
            (AssetRole::TrainingDataCsv, CSV.to_string()),
        ]);
        keys.insert(AssetRole::Model, COG.replace(".tif", "_model.Rds"));

        let item = ItemSynthesizer::new(&raster).build(&keys, None).unwrap();
        assert_eq!(item.assets["model"].roles, vec!["model".to_string()]);
    }

    #[test]
    fn test_variable_override_selects_collection() {
        let raster = FakeRaster::with_bands(2);
        let keys = AssetKeyMap::from([
            (AssetRole::Cog, COG.to_string()),
            (AssetRole::TrainingDataCsv, CSV.to_string()),
        ]);
        let item = ItemSynthesizer::new(&raster)
            .build(&keys, Some(Variable::Agb))
            .unwrap();
        assert_eq!(item.collection.as_deref(), Some("icesat2-boreal-v3.0-agb"));
        assert_eq!(item.assets["cog"].extra["bands"][0]["unit"], json!("Mg ha-1"));
    }

    #[test]
    fn test_band_count_mismatch() {
        let raster = FakeRaster::with_bands(1);
        let err = ItemSynthesizer::new(&raster).create_item(COG, CSV).unwrap_err();
        assert!(
            matches!(err, StacError::BandCountMismatch { expected: 2, actual: 1 }),
            "{err:?}"
        );
    }

    #[test]
    fn test_malformed_filename_never_reaches_introspector() {
        let raster = FakeRaster::with_bands(2);
        let synthesizer = ItemSynthesizer::new(&raster);
        for cog in ["s3://b/foo_bar.tif", "s3://b/boreal_xyz_2020_20250113_1.tif"] {
            let err = synthesizer.create_item(cog, CSV).unwrap_err();
            assert!(matches!(err, StacError::MalformedIdentity { .. }), "{err:?}");
        }
        assert_eq!(raster.calls.get(), 0);
    }

    #[test]
    fn test_build_requires_table_asset() {
        let raster = FakeRaster::with_bands(2);
        let keys = AssetKeyMap::from([(AssetRole::Cog, COG.to_string())]);
        let err = ItemSynthesizer::new(&raster).build(&keys, None).unwrap_err();
        assert!(matches!(err, StacError::IncompleteAssetSet { .. }));
    }

    #[test]
    fn test_merge_bands_keeps_template_when_introspection_is_silent() {
        let merged = merge_bands(band_templates(Variable::Agb), &[BandInfo::default(), BandInfo::default()])
            .unwrap();
        assert_eq!(merged[0]["nodata"], json!("nan"));
        assert_eq!(merged[0]["scale"], json!(1.0));
        assert_eq!(merged[0]["unit"], json!("Mg ha-1"));
        assert_eq!(merged[0]["data_type"], json!("float32"));
        assert!(!merged[0].contains_key("statistics"));
    }

    #[test]
    fn test_create_collection() {
        for variable in Variable::ALL {
            let collection = create_collection(variable).unwrap();
            assert_eq!(collection.id, variable.collection_id());
            assert!(collection.extra.contains_key("renders"));
            assert!(collection.stac_extensions.iter().any(|e| e == RENDER_EXTENSION));
            assert!(!collection.stac_extensions.iter().any(|e| e.contains("/raster/")));
            assert!(!collection.stac_extensions.iter().any(|e| e.contains("item-assets")));
            assert_eq!(
                collection.extent.temporal.interval,
                vec![vec![
                    Some("2020-01-01T00:00:00Z".to_string()),
                    Some("2020-12-31T23:59:59Z".to_string())
                ]]
            );
            assert!(collection.item_assets.contains_key("cog"));
            assert!(collection.item_assets.contains_key("training_data_csv"));
            assert!(!collection.description.replace("\n\n", "").contains('\n'));
        }
    }

    #[test]
    fn test_create_collection_is_deterministic() {
        let first = serde_json::to_string_pretty(&create_collection(Variable::Agb).unwrap()).unwrap();
        let second = serde_json::to_string_pretty(&create_collection(Variable::Agb).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_agb_renders() {
        let collection = create_collection(Variable::Agb).unwrap();
        let renders = collection.extra["renders"].as_object().unwrap();
        assert_eq!(renders.len(), 2);
        assert_eq!(renders["agb_gist_earth_r"]["color_formula"], json!("gamma r 1.05"));
        assert_eq!(renders["agb_viridis"]["rescale"], json!([[0.0, 125.0]]));
    }
}
