//! GEDI granule discovery against NASA's CMR catalog.
//!
//! Thin paginated wrapper around the granule search endpoint; it supplies
//! download URLs for LiDAR granules intersecting a fire's bounding box and
//! observation window. Structural failures surface immediately as
//! [`FireError::Download`], there is nothing transient to retry here.

use crate::types::{BoundingBox, FireError, FireResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::time::Duration;

/// CMR granule search endpoint
pub const CMR_SEARCH_URL: &str = "https://cmr.earthdata.nasa.gov/search/granules.json";

/// Link relation marking a downloadable data asset in a CMR entry
const DATA_LINK_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/data#";

/// GEDI product collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GediProduct {
    /// Geolocated waveforms
    L1B,
    /// Elevation and canopy height metrics
    L2A,
    /// Canopy cover and vertical profile metrics
    L2B,
    /// Aboveground biomass density
    L4A,
}

impl GediProduct {
    /// CMR collection short name
    pub fn short_name(&self) -> &'static str {
        match self {
            GediProduct::L1B => "GEDI01_B",
            GediProduct::L2A => "GEDI02_A",
            GediProduct::L2B => "GEDI02_B",
            GediProduct::L4A => "GEDI04_A",
        }
    }
}

impl std::fmt::Display for GediProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// One granule entry from a CMR search response
#[derive(Debug, Clone, Deserialize)]
pub struct GranuleEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "time_start")]
    pub time_start: Option<String>,
    #[serde(default)]
    pub links: Vec<GranuleLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GranuleLink {
    #[serde(default)]
    pub rel: String,
    pub href: String,
}

impl GranuleEntry {
    /// URLs of downloadable data assets attached to this granule
    pub fn data_urls(&self) -> impl Iterator<Item = &str> + '_ {
        self.links
            .iter()
            .filter(|link| link.rel == DATA_LINK_REL)
            .map(|link| link.href.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct CmrResponse {
    feed: CmrFeed,
}

#[derive(Debug, Deserialize)]
struct CmrFeed {
    #[serde(default)]
    entry: Vec<GranuleEntry>,
}

/// Client for GEDI granule queries
pub struct GediClient {
    product: GediProduct,
    client: reqwest::blocking::Client,
}

impl GediClient {
    pub fn new(product: GediProduct) -> FireResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FireError::Download(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { product, client })
    }

    pub fn product(&self) -> GediProduct {
        self.product
    }

    fn query_params(
        &self,
        bbox: &BoundingBox,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page_size: usize,
        page_num: usize,
    ) -> Vec<(String, String)> {
        vec![
            ("short_name".to_string(), self.product.short_name().to_string()),
            ("version".to_string(), "002".to_string()),
            ("bounding_box".to_string(), bbox.to_string()),
            (
                "temporal".to_string(),
                format!(
                    "{},{}",
                    start.to_rfc3339_opts(SecondsFormat::Secs, true),
                    end.to_rfc3339_opts(SecondsFormat::Secs, true)
                ),
            ),
            ("page_size".to_string(), page_size.to_string()),
            ("page_num".to_string(), page_num.to_string()),
        ]
    }

    /// One page of granules intersecting the bounding box and time range
    pub fn query_granules(
        &self,
        bbox: &BoundingBox,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page_size: usize,
        page_num: usize,
    ) -> FireResult<Vec<GranuleEntry>> {
        let params = self.query_params(bbox, start, end, page_size, page_num);
        log::debug!("querying {} granules, page {}", self.product, page_num);

        let response = self
            .client
            .get(CMR_SEARCH_URL)
            .query(&params)
            .send()
            .map_err(|e| FireError::Download(format!("CMR request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FireError::Download(format!(
                "CMR search returned {}",
                response.status()
            )));
        }

        let body: CmrResponse = response
            .json()
            .map_err(|e| FireError::Download(format!("malformed CMR response: {}", e)))?;
        Ok(body.feed.entry)
    }

    /// Download URLs of every matching granule, paginating until the catalog
    /// is exhausted or `max_results` is reached.
    pub fn download_urls(
        &self,
        bbox: &BoundingBox,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_results: Option<usize>,
    ) -> FireResult<Vec<String>> {
        const PAGE_SIZE: usize = 100;
        let mut urls = Vec::new();
        let mut page_num = 1;

        loop {
            let entries = self.query_granules(bbox, start, end, PAGE_SIZE, page_num)?;
            if entries.is_empty() {
                break;
            }
            for entry in &entries {
                urls.extend(entry.data_urls().map(String::from));
                if let Some(max) = max_results {
                    if urls.len() >= max {
                        urls.truncate(max);
                        return Ok(urls);
                    }
                }
            }
            // A short page is the last page
            if entries.len() < PAGE_SIZE {
                break;
            }
            page_num += 1;
        }

        log::info!("found {} {} granule assets", urls.len(), self.product);
        Ok(urls)
    }

    /// Number of granules on the first result page (cheap existence probe)
    pub fn granule_count(
        &self,
        bbox: &BoundingBox,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FireResult<usize> {
        Ok(self.query_granules(bbox, start, end, 1, 1)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CMR_PAGE: &str = r#"{
        "feed": {
            "entry": [
                {
                    "id": "G1234-LPDAAC_ECS",
                    "title": "GEDI02_A_2022172225926_O19801_02_T08690_02_003_02_V002",
                    "time_start": "2022-06-21T00:00:00.000Z",
                    "links": [
                        {
                            "rel": "http://esipfed.org/ns/fedsearch/1.1/data#",
                            "href": "https://e4ftl01.cr.usgs.gov/GEDI/GEDI02_A.002/granule.h5"
                        },
                        {
                            "rel": "http://esipfed.org/ns/fedsearch/1.1/browse#",
                            "href": "https://e4ftl01.cr.usgs.gov/browse.png"
                        }
                    ]
                },
                {
                    "id": "G5678-LPDAAC_ECS",
                    "title": "GEDI02_A_2022173_O19815",
                    "time_start": "2022-06-22T00:00:00.000Z",
                    "links": []
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_cmr_page() {
        let page: CmrResponse = serde_json::from_str(CMR_PAGE).unwrap();
        assert_eq!(page.feed.entry.len(), 2);

        let first = &page.feed.entry[0];
        assert_eq!(first.id.as_deref(), Some("G1234-LPDAAC_ECS"));
        let urls: Vec<&str> = first.data_urls().collect();
        assert_eq!(
            urls,
            vec!["https://e4ftl01.cr.usgs.gov/GEDI/GEDI02_A.002/granule.h5"]
        );

        // Browse links are not data assets; an entry without links has none
        assert_eq!(page.feed.entry[1].data_urls().count(), 0);
    }

    #[test]
    fn test_empty_feed_parses() {
        let page: CmrResponse = serde_json::from_str(r#"{"feed": {}}"#).unwrap();
        assert!(page.feed.entry.is_empty());
    }

    #[test]
    fn test_query_params() {
        let client = GediClient::new(GediProduct::L2A).unwrap();
        let bbox = BoundingBox::new(-121.5, 47.9, -121.0, 48.2);
        let start = Utc.with_ymd_and_hms(2022, 6, 19, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2022, 12, 31, 0, 0, 0).unwrap();

        let params = client.query_params(&bbox, start, end, 100, 1);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("short_name"), "GEDI02_A");
        assert_eq!(get("version"), "002");
        assert_eq!(get("bounding_box"), "-121.5,47.9,-121,48.2");
        assert_eq!(get("temporal"), "2022-06-19T00:00:00Z,2022-12-31T00:00:00Z");
        assert_eq!(get("page_size"), "100");
    }

    #[test]
    fn test_product_short_names() {
        assert_eq!(GediProduct::L1B.short_name(), "GEDI01_B");
        assert_eq!(GediProduct::L2A.short_name(), "GEDI02_A");
        assert_eq!(GediProduct::L2B.short_name(), "GEDI02_B");
        assert_eq!(GediProduct::L4A.short_name(), "GEDI04_A");
    }
}
