//! Raster introspection: band statistics and footprint of a COG

use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::Dataset;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StacError};
use crate::storage::S3Url;

/// Summary statistics of the valid pixels of one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandStatistics {
    pub minimum: f64,
    pub maximum: f64,
    pub mean: f64,
    pub stddev: f64,
    pub valid_percent: f64,
}

/// Introspected per-band values, in band order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandInfo {
    pub data_type: String,
    pub nodata: Option<f64>,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub unit: Option<String>,
    pub statistics: Option<BandStatistics>,
}

/// Raster footprint in its native CRS and in WGS84.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    /// `[west, south, east, north]` in EPSG:4326.
    pub bbox: [f64; 4],
    pub epsg: Option<u32>,
    /// Bounds in the native CRS.
    pub proj_bbox: [f64; 4],
    /// `[rows, cols]`
    pub shape: [usize; 2],
    /// Affine transform in `[a, b, c, d, e, f]` order.
    pub transform: [f64; 6],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RasterInfo {
    pub bands: Vec<BandInfo>,
    pub footprint: Option<Footprint>,
}

pub trait RasterIntrospector {
    /// Inspect the raster at `href`. Statistics are computed from a read no
    /// larger than `max_size` pixels along either edge.
    fn introspect(&self, href: &str, max_size: usize) -> Result<RasterInfo>;
}

/// GDAL path for an asset locator.
pub fn gdal_path(href: &str) -> String {
    if let Ok(url) = S3Url::parse(href) {
        url.to_vsi_path()
    } else if href.starts_with("http://") || href.starts_with("https://") {
        format!("/vsicurl/{href}")
    } else if let Some(path) = href.strip_prefix("file://") {
        path.to_string()
    } else {
        href.to_string()
    }
}

/// Output size of a decimated read: the longest edge is capped at
/// `max_size`, aspect ratio kept, never below one pixel.
pub fn decimated_size(width: usize, height: usize, max_size: usize) -> (usize, usize) {
    let longest = width.max(height);
    if max_size == 0 || longest <= max_size {
        return (width, height);
    }
    let ratio = max_size as f64 / longest as f64;
    (
        ((width as f64 * ratio).round() as usize).max(1),
        ((height as f64 * ratio).round() as usize).max(1),
    )
}

/// Statistics over `values`, skipping NaN and the nodata sentinel. `None`
/// when no pixel is valid.
pub fn compute_statistics(values: &[f64], nodata: Option<f64>) -> Option<BandStatistics> {
    let valid: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan() && nodata.map_or(true, |nd| nd.is_nan() || *v != nd))
        .collect();
    if valid.is_empty() {
        return None;
    }

    let n = valid.len() as f64;
    let minimum = valid.iter().copied().fold(f64::INFINITY, f64::min);
    let maximum = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = valid.iter().sum::<f64>() / n;
    let variance = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(BandStatistics {
        minimum,
        maximum,
        mean,
        stddev: variance.sqrt(),
        valid_percent: n / values.len() as f64 * 100.0,
    })
}

/// Native bounds `[minx, miny, maxx, maxy]` from a GDAL geotransform.
pub fn bounds_from_geotransform(gt: &[f64; 6], width: usize, height: usize) -> [f64; 4] {
    let x0 = gt[0];
    let y0 = gt[3];
    let x1 = x0 + width as f64 * gt[1] + height as f64 * gt[2];
    let y1 = y0 + width as f64 * gt[4] + height as f64 * gt[5];
    [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]
}

/// Points sampled along each edge of a footprint before reprojection.
pub const EDGE_DENSIFY_POINTS: usize = 21;

/// Outline of `[minx, miny, maxx, maxy]` with `points_per_edge` evenly spaced
/// points on every edge, corners included. Reprojected extremes of curved
/// edges can fall between corners.
pub fn densify_bounds(bounds: &[f64; 4], points_per_edge: usize) -> (Vec<f64>, Vec<f64>) {
    let [minx, miny, maxx, maxy] = *bounds;
    let n = points_per_edge.max(2);
    let step = |from: f64, to: f64, i: usize| from + (to - from) * i as f64 / (n - 1) as f64;

    let mut xs = Vec::with_capacity(4 * n);
    let mut ys = Vec::with_capacity(4 * n);
    for i in 0..n {
        // bottom, right, top, left
        xs.extend([step(minx, maxx, i), maxx, step(maxx, minx, i), minx]);
        ys.extend([miny, step(miny, maxy, i), maxy, step(maxy, miny, i)]);
    }
    (xs, ys)
}

/// GDAL `[c, a, b, f, d, e]` geotransform to affine `[a, b, c, d, e, f]`.
pub fn affine_from_geotransform(gt: &[f64; 6]) -> [f64; 6] {
    [gt[1], gt[2], gt[0], gt[4], gt[5], gt[3]]
}

/// STAC `data_type` for a GDAL type name ("Float32" -> "float32").
pub fn stac_data_type(gdal_name: &str) -> String {
    match gdal_name {
        "Byte" => "uint8".to_string(),
        other => other.to_lowercase(),
    }
}

/// [`RasterIntrospector`] backed by GDAL. S3 locators are read through
/// `/vsis3/`, so GDAL picks up the usual AWS environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct GdalIntrospector;

impl GdalIntrospector {
    fn footprint(dataset: &Dataset, href: &str) -> Result<Option<Footprint>> {
        let Ok(gt) = dataset.geo_transform() else {
            debug!("{} has no geotransform", href);
            return Ok(None);
        };
        let (width, height) = dataset.raster_size();
        let proj_bbox = bounds_from_geotransform(&gt, width, height);

        let Ok(mut source_srs) = dataset.spatial_ref() else {
            debug!("{} has no CRS", href);
            return Ok(None);
        };
        source_srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let epsg = source_srs.auth_code().ok().and_then(|c| u32::try_from(c).ok());

        let mut target_srs = SpatialRef::from_epsg(4326).map_err(raster_error(href))?;
        target_srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let transform = CoordTransform::new(&source_srs, &target_srs).map_err(raster_error(href))?;

        let (mut xs, mut ys) = densify_bounds(&proj_bbox, EDGE_DENSIFY_POINTS);
        let mut zs = vec![0.0; xs.len()];
        transform
            .transform_coords(&mut xs, &mut ys, &mut zs)
            .map_err(raster_error(href))?;

        let bbox = [
            xs.iter().cloned().fold(f64::INFINITY, f64::min),
            ys.iter().cloned().fold(f64::INFINITY, f64::min),
            xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        ];

        Ok(Some(Footprint {
            bbox,
            epsg,
            proj_bbox,
            shape: [height, width],
            transform: affine_from_geotransform(&gt),
        }))
    }
}

fn raster_error(href: &str) -> impl Fn(gdal::errors::GdalError) -> StacError + '_ {
    move |e| StacError::Raster(format!("{href}: {e}"))
}

impl RasterIntrospector for GdalIntrospector {
    fn introspect(&self, href: &str, max_size: usize) -> Result<RasterInfo> {
        let path = gdal_path(href);
        debug!("Opening raster {}", path);
        let dataset = Dataset::open(&path).map_err(raster_error(href))?;

        let mut bands = Vec::new();
        for index in 1..=dataset.raster_count() {
            let band = dataset.rasterband(index).map_err(raster_error(href))?;
            let (width, height) = band.size();
            let out_size = decimated_size(width, height, max_size);
            let buffer = band
                .read_as::<f64>((0, 0), (width, height), out_size, None)
                .map_err(raster_error(href))?;
            let nodata = band.no_data_value();
            let unit = band.unit();

            bands.push(BandInfo {
                data_type: stac_data_type(&band.band_type().name()),
                nodata,
                scale: band.scale(),
                offset: band.offset(),
                unit: (!unit.is_empty()).then_some(unit),
                statistics: compute_statistics(buffer.data(), nodata),
            });
        }

        Ok(RasterInfo {
            bands,
            footprint: Self::footprint(&dataset, href)?,
        })
    }
}
