//! Item identity parsed from the product filename
//!
//! Grammar: `{product}_{variable}_{year}_{created}_{tile}` where `created`
//! starts with a `YYYYMMDD` date, e.g.
//! `boreal_ht_2020_202501131736787421_0000004`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::constants::{Variable, ID_DELIMITER};
use crate::error::{Result, StacError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIdentity {
    pub id: String,
    pub product: String,
    pub variable: Variable,
    pub year: i32,
    pub created: NaiveDate,
    /// Tile/sequence tokens following the creation timestamp.
    pub tile: Vec<String>,
}

/// Item id for a storage locator or path: the filename without extension.
pub fn item_id_from_key(key: &str) -> &str {
    let filename = key.rsplit('/').next().unwrap_or(key);
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    }
}

impl ItemIdentity {
    pub fn parse(id: &str) -> Result<Self> {
        let tokens: Vec<&str> = id.split(ID_DELIMITER).collect();
        if tokens.len() < 4 {
            return Err(StacError::malformed(
                id,
                id,
                format!("expected at least 4 '{ID_DELIMITER}'-separated fields, found {}", tokens.len()),
            ));
        }

        let variable: Variable = tokens[1]
            .parse()
            .map_err(|reason: String| StacError::malformed(id, tokens[1], reason))?;

        let year_token = tokens[2];
        if year_token.len() != 4 || !year_token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StacError::malformed(id, year_token, "acquisition year must be 4 digits"));
        }
        let year: i32 = year_token
            .parse()
            .map_err(|_| StacError::malformed(id, year_token, "acquisition year must be 4 digits"))?;

        let created_token = tokens[3];
        let created = created_token
            .get(..8)
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y%m%d").ok())
            .ok_or_else(|| {
                StacError::malformed(id, created_token, "creation timestamp must start with YYYYMMDD")
            })?;

        Ok(ItemIdentity {
            id: id.to_string(),
            product: tokens[0].to_string(),
            variable,
            year,
            created,
            tile: tokens[4..].iter().map(|t| t.to_string()).collect(),
        })
    }

    pub fn temporal_extent(&self) -> Result<TemporalExtent> {
        TemporalExtent::for_year(self.year)
            .ok_or_else(|| StacError::malformed(&self.id, &self.year.to_string(), "year out of range"))
    }

    pub fn created_datetime(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.created.and_time(chrono::NaiveTime::MIN))
    }
}

/// One calendar year: `start` is Jan 1 00:00:00 UTC and `end` the last
/// second of Dec 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalExtent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TemporalExtent {
    pub fn for_year(year: i32) -> Option<Self> {
        let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
        let next = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single()?;
        Some(TemporalExtent {
            start,
            end: next - Duration::seconds(1),
        })
    }

    /// Exact midpoint of `[start, end]`, the nominal observation time.
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start + (self.end - self.start) / 2
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM_ID: &str = "boreal_ht_2020_202501131736787421_0000004";

    #[test]
    fn test_parse_item_identity() {
        let identity = ItemIdentity::parse(ITEM_ID).unwrap();
        assert_eq!(identity.product, "boreal");
        assert_eq!(identity.variable, Variable::Ht);
        assert_eq!(identity.year, 2020);
        assert_eq!(identity.created, NaiveDate::from_ymd_opt(2025, 1, 13).unwrap());
        assert_eq!(identity.tile, vec!["0000004".to_string()]);
        assert_eq!(
            identity.created_datetime().to_rfc3339(),
            "2025-01-13T00:00:00+00:00"
        );
    }

    #[test]
    fn test_temporal_extent() {
        let extent = ItemIdentity::parse(ITEM_ID).unwrap().temporal_extent().unwrap();
        assert_eq!(extent.start, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(extent.end, Utc.with_ymd_and_hms(2020, 12, 31, 23, 59, 59).unwrap());

        let mid = extent.midpoint();
        assert_eq!(mid - extent.start, extent.end - mid);
        let nominal = Utc.with_ymd_and_hms(2020, 7, 2, 0, 0, 0).unwrap();
        assert!((nominal - mid).num_milliseconds().abs() <= 1000);
    }

    #[test]
    fn test_temporal_extent_non_leap_year() {
        let extent = TemporalExtent::for_year(2021).unwrap();
        assert_eq!((extent.end - extent.start).num_seconds(), 365 * 86_400 - 1);
        assert_eq!(extent.year(), 2021);
    }

    #[test]
    fn test_item_id_from_key() {
        assert_eq!(
            item_id_from_key("s3://bucket/path/boreal_ht_2020_202501131736787421_0000004.tif"),
            ITEM_ID
        );
        assert_eq!(item_id_from_key("local.tif"), "local");
        assert_eq!(item_id_from_key("dir/.hidden"), ".hidden");
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        let cases = [
            ("foo_bar", "foo_bar"),
            ("boreal_bar_2020_20250113_1", "bar"),
            ("boreal_AGB_2020_20250113_1", "AGB"),
            ("boreal_agb_20x0_20250113_1", "20x0"),
            ("boreal_agb_20200_20250113_1", "20200"),
            ("boreal_agb_2020_2025011_1", "2025011"),
            ("boreal_agb_2020_20251301_1", "20251301"),
        ];
        for (id, offending) in cases {
            match ItemIdentity::parse(id) {
                Err(StacError::MalformedIdentity { token, .. }) => assert_eq!(token, offending, "{id}"),
                other => panic!("{id}: expected MalformedIdentity, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_created_uses_day_not_minute() {
        // %M (minutes) instead of %m would silently map every date to January
        let identity = ItemIdentity::parse("boreal_agb_2020_20230215167643_26340").unwrap();
        assert_eq!(identity.created, NaiveDate::from_ymd_opt(2023, 2, 15).unwrap());
    }
}
