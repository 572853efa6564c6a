//! Band extraction from Sentinel-1 SAFE archives.
//!
//! A SAFE product is a zipped directory tree with one measurement raster per
//! polarization under `measurement/`. The extractor locates the entry for a
//! requested polarization, decodes it entirely in memory through GDAL's
//! `/vsimem/` virtual filesystem (no disk temp files) and assembles a
//! [`SarGrid`] with coordinate vectors derived from the raster's affine
//! transform. Archive handles and decode buffers live only for the duration
//! of a call.

use crate::types::{FireError, FireResult, GeoTransform, Polarization, SarGrid};
use chrono::{DateTime, NaiveDateTime, Utc};
use ndarray::Array2;
use regex::Regex;
use std::ffi::CString;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use zip::ZipArchive;

/// Raster suffix of measurement entries inside a SAFE archive
const MEASUREMENT_SUFFIX: &str = ".tiff";

/// Counter keeping concurrent vsimem paths distinct across polarizations
static VSI_COUNTER: AtomicU64 = AtomicU64::new(0);

/// In-memory file registered with GDAL's VSI filesystem; unlinked on drop.
/// The backing buffer is owned here because GDAL does not take ownership.
struct VsiMemFile {
    path: String,
    _buffer: Vec<u8>,
}

impl VsiMemFile {
    fn new(path: String, buffer: Vec<u8>) -> FireResult<Self> {
        let c_path = CString::new(path.clone())
            .map_err(|e| FireError::InvalidFormat(format!("vsimem path: {}", e)))?;
        unsafe {
            let handle = gdal_sys::VSIFileFromMemBuffer(
                c_path.as_ptr(),
                buffer.as_ptr() as *mut u8,
                buffer.len() as u64,
                0, // buffer stays owned by this struct
            );
            if handle.is_null() {
                return Err(FireError::InvalidFormat(
                    "failed to register in-memory raster with GDAL".to_string(),
                ));
            }
            gdal_sys::VSIFCloseL(handle);
        }
        Ok(Self {
            path,
            _buffer: buffer,
        })
    }

    fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for VsiMemFile {
    fn drop(&mut self) {
        if let Ok(c_path) = CString::new(self.path.clone()) {
            unsafe {
                gdal_sys::VSIUnlink(c_path.as_ptr());
            }
        }
    }
}

/// Reader for a Sentinel-1 GRD SAFE zip archive
#[derive(Debug, Clone)]
pub struct GrdReader {
    zip_path: PathBuf,
}

impl GrdReader {
    /// Create a reader. The archive must exist; its contents are only
    /// touched by the extraction calls.
    pub fn new<P: AsRef<Path>>(zip_path: P) -> FireResult<Self> {
        let zip_path = zip_path.as_ref().to_path_buf();
        if !zip_path.exists() {
            return Err(FireError::NotFound(format!(
                "SAFE archive not found: {}",
                zip_path.display()
            )));
        }
        Ok(Self { zip_path })
    }

    /// SAFE product identifier derived from the archive file name
    pub fn product_id(&self) -> Option<String> {
        let stem = self.zip_path.file_stem()?.to_str()?;
        Some(stem.trim_end_matches(".SAFE").to_string())
    }

    /// Acquisition start time parsed from the product name, when the name
    /// follows the Sentinel-1 `...YYYYMMDDTHHMMSS...` convention.
    pub fn acquisition_time(&self) -> Option<DateTime<Utc>> {
        let id = self.product_id()?;
        let re = Regex::new(r"(\d{8}T\d{6})").ok()?;
        let stamp = re.captures(&id)?.get(1)?.as_str().to_string();
        NaiveDateTime::parse_from_str(&stamp, "%Y%m%dT%H%M%S")
            .ok()
            .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
    }

    fn open_archive(&self) -> FireResult<ZipArchive<File>> {
        let file = File::open(&self.zip_path)?;
        ZipArchive::new(file)
            .map_err(|e| FireError::InvalidFormat(format!("failed to open SAFE zip: {}", e)))
    }

    /// List all entry names in the archive
    pub fn list_entries(&self) -> FireResult<Vec<String>> {
        let mut archive = self.open_archive()?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(|e| {
                FireError::InvalidFormat(format!("failed to access archive entry {}: {}", i, e))
            })?;
            entries.push(entry.name().to_string());
        }
        Ok(entries)
    }

    /// Measurement entry for the requested polarization.
    ///
    /// Entries under `measurement/` whose name carries the lowercase
    /// polarization token and the raster suffix qualify. No match is a
    /// [`FireError::NotFound`]; several matches indicate an unexpected
    /// archive layout and resolve to the first lexical one with a warning.
    pub fn find_measurement(&self, pol: Polarization) -> FireResult<String> {
        let token = format!("-{}-", pol.token());
        let mut matches: Vec<String> = self
            .list_entries()?
            .into_iter()
            .filter(|name| {
                let lower = name.to_lowercase();
                lower.contains("measurement/")
                    && lower.contains(&token)
                    && lower.ends_with(MEASUREMENT_SUFFIX)
            })
            .collect();

        matches.sort();
        match matches.len() {
            0 => Err(FireError::NotFound(format!(
                "no {} polarization band in {}",
                pol,
                self.zip_path.display()
            ))),
            1 => Ok(matches.remove(0)),
            n => {
                log::warn!(
                    "{} measurement entries match {} in {}, using {}",
                    n,
                    pol,
                    self.zip_path.display(),
                    matches[0]
                );
                Ok(matches.remove(0))
            }
        }
    }

    /// Extract one polarization band into a labeled grid.
    ///
    /// The zip entry is decompressed into memory and handed to GDAL through
    /// the VSI memory filesystem; array, affine transform, CRS and nodata
    /// are read from the first band. The archive handle, the decode buffer
    /// and the vsimem registration are all released before this returns.
    pub fn read_band(&self, pol: Polarization) -> FireResult<SarGrid> {
        let entry_name = self.find_measurement(pol)?;
        log::info!("extracting {} band from {}", pol, entry_name);

        let buffer = {
            let mut archive = self.open_archive()?;
            let mut entry = archive.by_name(&entry_name).map_err(|e| {
                FireError::InvalidFormat(format!("failed to read {}: {}", entry_name, e))
            })?;
            let mut buffer = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buffer)?;
            buffer
        };

        let vsi_path = format!(
            "/vsimem/postfire_{}_{}.tiff",
            pol.token(),
            VSI_COUNTER.fetch_add(1, Ordering::SeqCst)
        );
        let vsi_file = VsiMemFile::new(vsi_path, buffer)?;

        let (data, geo_transform, crs, nodata) = {
            let dataset = gdal::Dataset::open(Path::new(vsi_file.path()))?;
            let (width, height) = dataset.raster_size();
            log::debug!("measurement raster is {}x{} pixels", width, height);

            let band = dataset.rasterband(1)?;
            let nodata = band.no_data_value();
            let raw = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
            let data = Array2::from_shape_vec((height, width), raw.data).map_err(|e| {
                FireError::InvalidFormat(format!("raster buffer does not match its shape: {}", e))
            })?;

            // Raw GRD measurement tiffs often carry no georeferencing; fall
            // back to the identity frame so coordinate vectors stay
            // well-defined.
            let geo_transform = dataset
                .geo_transform()
                .map(|gt| GeoTransform::from_gdal(&gt))
                .unwrap_or_else(|_| GeoTransform::identity());

            let projection = dataset.projection();
            let crs = if projection.is_empty() {
                None
            } else {
                Some(projection)
            };

            (data, geo_transform, crs, nodata)
        };
        drop(vsi_file);

        let mut grid = SarGrid::from_transform(data, geo_transform, crs, nodata);
        grid.provenance.polarization = Some(pol);
        grid.provenance.product_id = self.product_id();
        grid.provenance.acquisition = self.acquisition_time();

        let (grid_height, grid_width) = grid.shape();
        log::info!("loaded {} band with shape {}x{}", pol, grid_height, grid_width);
        Ok(grid)
    }
}
