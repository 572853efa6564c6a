//! Sentinel-1 product discovery and download against the Copernicus Data
//! Space catalog.
//!
//! The OpenSearch endpoint returns a GeoJSON-shaped feature collection of
//! product descriptors; this client filters by bounding box, time range,
//! product type, sensor mode and orbit direction, and can fetch a product
//! archive to a local directory. Downloads need a Copernicus bearer token;
//! obtaining one is the caller's concern.

use crate::io::boundary::FireBoundary;
use crate::types::{BoundingBox, FireError, FireResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// OpenSearch endpoint for the Sentinel-1 collection
pub const CDSE_SEARCH_URL: &str =
    "https://catalogue.dataspace.copernicus.eu/resto/api/collections/Sentinel1/search.json";

/// Products per catalog page
const PAGE_SIZE: usize = 100;

/// Sentinel-1 product levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductType {
    Grd,
    Slc,
    Ocn,
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductType::Grd => write!(f, "GRD"),
            ProductType::Slc => write!(f, "SLC"),
            ProductType::Ocn => write!(f, "OCN"),
        }
    }
}

/// Sentinel-1 acquisition modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorMode {
    Sm,
    Iw,
    Ew,
    Wv,
}

impl std::fmt::Display for SensorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorMode::Sm => write!(f, "SM"),
            SensorMode::Iw => write!(f, "IW"),
            SensorMode::Ew => write!(f, "EW"),
            SensorMode::Wv => write!(f, "WV"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitDirection {
    Ascending,
    Descending,
}

impl std::fmt::Display for OrbitDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbitDirection::Ascending => write!(f, "ASCENDING"),
            OrbitDirection::Descending => write!(f, "DESCENDING"),
        }
    }
}

/// One product from a catalog search
#[derive(Debug, Clone)]
pub struct ProductDescriptor {
    pub id: String,
    pub title: String,
    pub start_date: Option<String>,
    pub orbit_direction: Option<String>,
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestoResponse {
    #[serde(default)]
    features: Vec<RestoFeature>,
}

#[derive(Debug, Deserialize)]
struct RestoFeature {
    id: String,
    properties: RestoProperties,
}

#[derive(Debug, Deserialize)]
struct RestoProperties {
    title: Option<String>,
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "orbitDirection")]
    orbit_direction: Option<String>,
    services: Option<RestoServices>,
}

#[derive(Debug, Deserialize)]
struct RestoServices {
    download: Option<RestoDownload>,
}

#[derive(Debug, Deserialize)]
struct RestoDownload {
    url: Option<String>,
}

impl From<RestoFeature> for ProductDescriptor {
    fn from(feature: RestoFeature) -> Self {
        let RestoFeature { id, properties } = feature;
        ProductDescriptor {
            title: properties.title.unwrap_or_else(|| id.clone()),
            id,
            start_date: properties.start_date,
            orbit_direction: properties.orbit_direction,
            download_url: properties.services.and_then(|s| s.download).and_then(|d| d.url),
        }
    }
}

/// Query builder and client for the Sentinel-1 catalog
pub struct Sentinel1Search {
    client: reqwest::blocking::Client,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    product_type: ProductType,
    sensor_mode: SensorMode,
    orbit_direction: Option<OrbitDirection>,
}

impl Sentinel1Search {
    /// New search over `[start, end]` with the common defaults (GRD, IW)
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> FireResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| FireError::Download(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            start,
            end,
            product_type: ProductType::Grd,
            sensor_mode: SensorMode::Iw,
            orbit_direction: None,
        })
    }

    pub fn with_product_type(mut self, product_type: ProductType) -> Self {
        self.product_type = product_type;
        self
    }

    pub fn with_sensor_mode(mut self, sensor_mode: SensorMode) -> Self {
        self.sensor_mode = sensor_mode;
        self
    }

    pub fn with_orbit_direction(mut self, orbit_direction: OrbitDirection) -> Self {
        self.orbit_direction = Some(orbit_direction);
        self
    }

    fn search_terms(&self, bbox: &BoundingBox, page: usize) -> Vec<(String, String)> {
        let mut terms = vec![
            ("box".to_string(), bbox.to_string()),
            (
                "startDate".to_string(),
                self.start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ),
            (
                "completionDate".to_string(),
                self.end.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ),
            ("productType".to_string(), self.product_type.to_string()),
            ("sensorMode".to_string(), self.sensor_mode.to_string()),
            ("maxRecords".to_string(), PAGE_SIZE.to_string()),
            ("page".to_string(), page.to_string()),
        ];
        if let Some(direction) = self.orbit_direction {
            terms.push(("orbitDirection".to_string(), direction.to_string()));
        }
        terms
    }

    /// All products intersecting the bounding box, across every result page
    pub fn query(&self, bbox: &BoundingBox) -> FireResult<Vec<ProductDescriptor>> {
        log::info!(
            "querying Sentinel-1 {} products for bbox [{}]",
            self.product_type,
            bbox
        );

        let mut products = Vec::new();
        let mut page = 1;
        loop {
            let response = self
                .client
                .get(CDSE_SEARCH_URL)
                .query(&self.search_terms(bbox, page))
                .send()
                .map_err(|e| FireError::Download(format!("catalog request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(FireError::Download(format!(
                    "catalog search returned {}",
                    response.status()
                )));
            }

            let body: RestoResponse = response
                .json()
                .map_err(|e| FireError::Download(format!("malformed catalog response: {}", e)))?;

            let page_len = body.features.len();
            products.extend(body.features.into_iter().map(ProductDescriptor::from));
            if page_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        log::info!("found {} Sentinel-1 products", products.len());
        Ok(products)
    }

    /// Query using the combined bounding box of a vector boundary file
    pub fn query_by_boundary<P: AsRef<Path>>(
        &self,
        boundary_path: P,
    ) -> FireResult<Vec<ProductDescriptor>> {
        let boundary = FireBoundary::from_file(boundary_path)?;
        self.query(&boundary.total_bounds())
    }
}

/// Downloads product archives to a local directory
pub struct ProductDownloader {
    client: reqwest::blocking::Client,
    output_dir: PathBuf,
    token: Option<String>,
}

impl ProductDownloader {
    /// Downloader writing into `output_dir`, or the platform-local default
    /// (`<data dir>/postfire/products`) when none is given.
    pub fn new(output_dir: Option<PathBuf>) -> FireResult<Self> {
        let output_dir = output_dir.unwrap_or_else(Self::default_output_dir);
        std::fs::create_dir_all(&output_dir)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(3600))
            .build()
            .map_err(|e| FireError::Download(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            output_dir,
            token: None,
        })
    }

    /// Platform-specific default download directory
    pub fn default_output_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("postfire")
            .join("products")
    }

    /// Attach a Copernicus bearer token for authenticated downloads
    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fetch one product archive; returns the path of the written file
    pub fn download(&self, product: &ProductDescriptor) -> FireResult<PathBuf> {
        let url = product.download_url.as_deref().ok_or_else(|| {
            FireError::Download(format!("product {} has no download URL", product.id))
        })?;

        let target = self.output_dir.join(format!("{}.zip", product.title));
        log::info!("downloading {} to {}", product.title, target.display());

        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let mut response = request
            .send()
            .map_err(|e| FireError::Download(format!("download request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FireError::Download(format!(
                "download of {} returned {}",
                product.id,
                response.status()
            )));
        }

        let mut file = std::fs::File::create(&target)?;
        response
            .copy_to(&mut file)
            .map_err(|e| FireError::Download(format!("download of {} failed: {}", product.id, e)))?;
        file.flush()?;

        log::info!("download complete: {}", target.display());
        Ok(target)
    }
}
