//! STAC record types, validation and serialization

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::constants::{
    PROCESSING_EXTENSION, PROJECTION_EXTENSION, RENDER_EXTENSION, SCIENTIFIC_EXTENSION,
    STAC_VERSION, VERSION_EXTENSION,
};
use crate::error::{Result, StacError};

/// Extra JSON fields carried next to the core ones (extension fields).
pub type ExtraFields = BTreeMap<String, Value>;

/// STAC Collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacCollection {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
    pub stac_version: String,
    #[serde(default)]
    pub stac_extensions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub license: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<Provider>,
    pub extent: Extent,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub summaries: BTreeMap<String, Value>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: BTreeMap<String, Asset>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub item_assets: BTreeMap<String, ItemAssetDefinition>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// STAC Item (Feature)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacItem {
    #[serde(rename = "type")]
    pub type_: String,
    pub stac_version: String,
    #[serde(default)]
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub geometry: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// STAC Provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// STAC Extent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

/// Spatial Extent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Vec<Vec<f64>>,
}

/// Temporal Extent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub interval: Vec<Vec<Option<String>>>,
}

/// STAC Link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Link {
            rel: rel.into(),
            href: href.into(),
            type_: None,
            title: None,
        }
    }

    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.type_ = Some(media_type.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// STAC Asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Asset template published in a collection's `item_assets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAssetDefinition {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ItemAssetDefinition {
    /// Concrete asset at `href` built from this template.
    pub fn create_asset(&self, href: impl Into<String>) -> Asset {
        Asset {
            href: href.into(),
            type_: self.type_.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            roles: self.roles.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// Either kind of record, as read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Collection(Box<StacCollection>),
    Item(Box<StacItem>),
}

impl Record {
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        match value.get("type").and_then(Value::as_str) {
            Some("Collection") => Ok(Record::Collection(Box::new(serde_json::from_value(value)?))),
            Some("Feature") => Ok(Record::Item(Box::new(serde_json::from_value(value)?))),
            other => Err(StacError::SchemaValidation(vec![format!(
                "unsupported record type {other:?}"
            )])),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Collection(c) => &c.id,
            Record::Item(i) => &i.id,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Record::Collection(c) => c.validate(),
            Record::Item(i) => i.validate(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(match self {
            Record::Collection(c) => serde_json::to_string_pretty(c)?,
            Record::Item(i) => serde_json::to_string_pretty(i)?,
        })
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Structural checks of a record against the STAC schemas it declares.
pub trait Validate {
    /// Every problem found; empty when the record is valid.
    fn problems(&self) -> Vec<String>;

    fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(StacError::SchemaValidation(problems))
        }
    }
}

/// Extension schema implied by a field name, if any.
fn extension_for_field(field: &str) -> Option<&'static str> {
    if field.starts_with("proj:") {
        Some(PROJECTION_EXTENSION)
    } else if field.starts_with("processing:") {
        Some(PROCESSING_EXTENSION)
    } else if field.starts_with("sci:") {
        Some(SCIENTIFIC_EXTENSION)
    } else if field == "renders" {
        Some(RENDER_EXTENSION)
    } else if field == "version" || field == "deprecated" {
        Some(VERSION_EXTENSION)
    } else {
        None
    }
}

fn check_extensions<'a>(
    declared: &[String],
    fields: impl IntoIterator<Item = &'a String>,
    problems: &mut Vec<String>,
) {
    for (i, ext) in declared.iter().enumerate() {
        if declared[..i].contains(ext) {
            problems.push(format!("extension {ext} is declared twice"));
        }
    }
    for field in fields {
        if let Some(schema) = extension_for_field(field) {
            if !declared.iter().any(|d| d == schema) {
                problems.push(format!("field {field} used without declaring {schema}"));
            }
        }
    }
}

fn check_common(type_: &str, expected_type: &str, stac_version: &str, id: &str, problems: &mut Vec<String>) {
    if type_ != expected_type {
        problems.push(format!("type must be {expected_type:?}, found {type_:?}"));
    }
    if stac_version != STAC_VERSION {
        problems.push(format!("stac_version must be {STAC_VERSION}, found {stac_version}"));
    }
    if id.trim().is_empty() {
        problems.push("id must not be empty".to_string());
    }
}

fn check_bbox(label: &str, bbox: &[f64], problems: &mut Vec<String>) {
    match bbox.len() {
        4 | 6 => {
            let half = bbox.len() / 2;
            // latitude (index 1) must be ordered; longitude may cross the antimeridian
            if bbox[1] > bbox[half + 1] {
                problems.push(format!("{label}: south {} is greater than north {}", bbox[1], bbox[half + 1]));
            }
            if bbox.iter().any(|v| !v.is_finite()) {
                problems.push(format!("{label}: coordinates must be finite"));
            }
        }
        n => problems.push(format!("{label}: bbox must have 4 or 6 values, got {n}")),
    }
}

fn parse_datetime(
    field: &str,
    value: Option<&Value>,
    problems: &mut Vec<String>,
) -> Option<DateTime<FixedOffset>> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Some(dt),
            Err(e) => {
                problems.push(format!("{field} {s:?} is not RFC 3339: {e}"));
                None
            }
        },
        Some(other) => {
            problems.push(format!("{field} must be a string, found {other}"));
            None
        }
    }
}

fn check_assets(assets: &BTreeMap<String, Asset>, problems: &mut Vec<String>) {
    for (key, asset) in assets {
        if asset.href.trim().is_empty() {
            problems.push(format!("asset {key} has an empty href"));
        }
    }
}

fn check_links(links: &[Link], problems: &mut Vec<String>) {
    for link in links {
        if link.rel.is_empty() || link.href.is_empty() {
            problems.push(format!("link {:?} -> {:?} needs both rel and href", link.rel, link.href));
        }
    }
}

impl Validate for StacItem {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        check_common(&self.type_, "Feature", &self.stac_version, &self.id, &mut problems);

        let datetime = parse_datetime("datetime", self.properties.get("datetime"), &mut problems);
        let start = parse_datetime("start_datetime", self.properties.get("start_datetime"), &mut problems);
        let end = parse_datetime("end_datetime", self.properties.get("end_datetime"), &mut problems);
        parse_datetime("created_datetime", self.properties.get("created_datetime"), &mut problems);
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                problems.push("start_datetime is after end_datetime".to_string());
            }
        }
        let datetime_is_null = matches!(self.properties.get("datetime"), None | Some(Value::Null));
        if datetime.is_none() && datetime_is_null && (start.is_none() || end.is_none()) {
            problems.push("datetime is null, so start_datetime and end_datetime are required".to_string());
        }

        match (&self.geometry, &self.bbox) {
            (Some(Value::Null) | None, Some(_)) => problems.push("bbox given without geometry".to_string()),
            (Some(g), None) if !g.is_null() => problems.push("geometry given without bbox".to_string()),
            _ => {}
        }
        if let Some(bbox) = &self.bbox {
            check_bbox("bbox", bbox, &mut problems);
        }

        if self.assets.is_empty() {
            problems.push("item has no assets".to_string());
        }
        check_assets(&self.assets, &mut problems);
        check_links(&self.links, &mut problems);

        let fields = self
            .properties
            .keys()
            .chain(self.assets.values().flat_map(|a| a.extra.keys()));
        check_extensions(&self.stac_extensions, fields, &mut problems);

        debug!("Item {} validated with {} problems", self.id, problems.len());
        problems
    }
}

impl Validate for StacCollection {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        check_common(&self.type_, "Collection", &self.stac_version, &self.id, &mut problems);

        if self.description.trim().is_empty() {
            problems.push("description must not be empty".to_string());
        }
        if self.license.trim().is_empty() {
            problems.push("license must not be empty".to_string());
        }

        if self.extent.spatial.bbox.is_empty() {
            problems.push("spatial extent needs at least one bbox".to_string());
        }
        for (i, bbox) in self.extent.spatial.bbox.iter().enumerate() {
            check_bbox(&format!("extent.spatial.bbox[{i}]"), bbox, &mut problems);
        }

        if self.extent.temporal.interval.is_empty() {
            problems.push("temporal extent needs at least one interval".to_string());
        }
        for (i, interval) in self.extent.temporal.interval.iter().enumerate() {
            let label = format!("extent.temporal.interval[{i}]");
            if interval.len() != 2 {
                problems.push(format!("{label} must have 2 entries"));
                continue;
            }
            let as_value = |v: &Option<String>| v.clone().map(Value::String);
            let start = parse_datetime(&label, as_value(&interval[0]).as_ref(), &mut problems);
            let end = parse_datetime(&label, as_value(&interval[1]).as_ref(), &mut problems);
            match (start, end) {
                (Some(s), Some(e)) if s > e => problems.push(format!("{label} starts after it ends")),
                (None, None) if interval[0].is_none() && interval[1].is_none() => {
                    problems.push(format!("{label} is open on both ends"))
                }
                _ => {}
            }
        }

        check_assets(&self.assets, &mut problems);
        check_links(&self.links, &mut problems);

        let fields = self
            .extra
            .keys()
            .chain(self.summaries.keys())
            .chain(self.providers.iter().flat_map(|p| p.extra.keys()))
            .chain(self.assets.values().flat_map(|a| a.extra.keys()))
            .chain(self.item_assets.values().flat_map(|a| a.extra.keys()));
        check_extensions(&self.stac_extensions, fields, &mut problems);

        debug!("Collection {} validated with {} problems", self.id, problems.len());
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_item() -> StacItem {
        serde_json::from_value(json!({
            "type": "Feature",
            "stac_version": "1.1.0",
            "id": "test-item",
            "geometry": null,
            "properties": {
                "datetime": "2020-07-01T23:59:59.500Z"
            },
            "links": [],
            "assets": {
                "cog": { "href": "s3://b/test-item.tif", "roles": ["data"] }
            },
            "collection": "test-collection"
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_item() {
        let item = minimal_item();
        assert_eq!(item.id, "test-item");
        assert_eq!(item.collection, Some("test-collection".to_string()));
        assert!(item.validate().is_ok(), "{:?}", item.problems());
    }

    #[test]
    fn test_item_requires_a_datetime() {
        let mut item = minimal_item();
        item.properties.insert("datetime".into(), Value::Null);
        assert!(item.validate().is_err());

        item.properties.insert("start_datetime".into(), json!("2020-01-01T00:00:00Z"));
        item.properties.insert("end_datetime".into(), json!("2020-12-31T23:59:59Z"));
        assert!(item.validate().is_ok(), "{:?}", item.problems());
    }

    #[test]
    fn test_item_interval_order() {
        let mut item = minimal_item();
        item.properties.insert("start_datetime".into(), json!("2021-01-01T00:00:00Z"));
        item.properties.insert("end_datetime".into(), json!("2020-12-31T23:59:59Z"));
        let problems = item.problems();
        assert!(problems.iter().any(|p| p.contains("after")), "{problems:?}");
    }

    #[test]
    fn test_extension_fields_need_declared_schema() {
        let mut item = minimal_item();
        item.properties.insert("proj:code".into(), json!("EPSG:3857"));
        assert!(matches!(item.validate(), Err(StacError::SchemaValidation(_))));

        item.stac_extensions.push(PROJECTION_EXTENSION.to_string());
        assert!(item.validate().is_ok(), "{:?}", item.problems());

        item.stac_extensions.push(PROJECTION_EXTENSION.to_string());
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_bbox_and_geometry_go_together() {
        let mut item = minimal_item();
        item.bbox = Some(vec![-10.0, 50.0, 10.0, 60.0]);
        assert!(item.validate().is_err());

        item.geometry = Some(json!({"type": "Point", "coordinates": [0.0, 55.0]}));
        assert!(item.validate().is_ok(), "{:?}", item.problems());

        item.bbox = Some(vec![-10.0, 60.0, 10.0, 50.0]);
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_record_from_json() {
        let json = serde_json::to_string(&minimal_item()).unwrap();
        let record = Record::from_json(&json).unwrap();
        assert_eq!(record.id(), "test-item");
        assert!(matches!(record, Record::Item(_)));

        assert!(Record::from_json(r#"{"type": "Catalog", "id": "x"}"#).is_err());
    }

    #[test]
    fn test_item_asset_definition_creates_asset() {
        let def = ItemAssetDefinition {
            type_: Some("text/csv".into()),
            title: Some("Tabular training data".into()),
            description: None,
            roles: vec!["data".into()],
            extra: BTreeMap::from([("gsd".to_string(), json!(30.0))]),
        };
        let asset = def.create_asset("s3://b/k.csv");
        assert_eq!(asset.href, "s3://b/k.csv");
        assert_eq!(asset.extra["gsd"], json!(30.0));
    }
}
