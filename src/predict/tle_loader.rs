use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::predict::error::TleError;
use crate::predict::types::{ElementCatalog, OrbitalElementSet, SatelliteId};

/// Loads element sets from a directory of `.tle`/`.txt` files, keeping
/// the newest set per satellite.
pub struct TleLoader {
    tle_dir: PathBuf,
    catalog: ElementCatalog,
    sources: HashMap<SatelliteId, String>,
}

impl TleLoader {
    pub fn new(tle_dir: PathBuf) -> Self {
        Self {
            tle_dir,
            catalog: ElementCatalog::new(),
            sources: HashMap::new(),
        }
    }

    /// Load all TLE files from the directory. Unreadable or malformed
    /// files are logged and skipped.
    pub fn load_all(&mut self) -> Result<&ElementCatalog, TleError> {
        if !self.tle_dir.is_dir() {
            return Err(TleError::DirectoryNotFound(
                self.tle_dir.display().to_string(),
            ));
        }

        self.catalog = ElementCatalog::new();
        self.sources.clear();

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.tle_dir)? {
            let path = entry?.path();
            let is_tle = path
                .extension()
                .is_some_and(|ext| ext == "tle" || ext == "txt");
            if path.is_file() && is_tle {
                paths.push(path);
            }
        }
        // Directory order is platform dependent.
        paths.sort();

        for path in paths {
            match parse_tle_file(&path) {
                Ok(sets) => {
                    let source = file_name(&path);
                    for set in sets {
                        let id = set.satellite_id;
                        if self.catalog.insert(set) {
                            self.sources.insert(id, source.clone());
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Failed to parse TLE file {}: {}", path.display(), e);
                }
            }
        }

        log::info!(
            "Loaded {} element sets from {}",
            self.catalog.len(),
            self.tle_dir.display()
        );
        Ok(&self.catalog)
    }

    pub fn catalog(&self) -> &ElementCatalog {
        &self.catalog
    }

    pub fn into_catalog(self) -> ElementCatalog {
        self.catalog
    }

    /// File the current set for `satellite_id` came from.
    pub fn source(&self, satellite_id: SatelliteId) -> Option<&str> {
        self.sources.get(&satellite_id).map(String::as_str)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Parse a single TLE file (may contain multiple satellites).
fn parse_tle_file(path: &Path) -> Result<Vec<OrbitalElementSet>, TleError> {
    let content = fs::read_to_string(path)?;
    parse_multi_tle(&content).map_err(|message| TleError::InvalidTle {
        file: file_name(path),
        message,
    })
}

/// Parse concatenated 2- and 3-line TLE entries. Lines that fit neither
/// shape are skipped.
pub fn parse_multi_tle(content: &str) -> Result<Vec<OrbitalElementSet>, String> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let (name, line1, line2) = if lines[i].starts_with("1 ")
            && i + 1 < lines.len()
            && lines[i + 1].starts_with("2 ")
        {
            i += 2;
            (None, lines[i - 2], lines[i - 1])
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            i += 3;
            (Some(lines[i - 3].to_string()), lines[i - 2], lines[i - 1])
        } else {
            i += 1;
            continue;
        };

        let elements = sgp4::Elements::from_tle(name, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| e.to_string())?;
        result.push(OrbitalElementSet::from_sgp4(&elements));
    }

    Ok(result)
}
