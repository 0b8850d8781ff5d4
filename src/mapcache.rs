// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! PK3 (ZIP) map cache: scans configured `gamedir` directories for
//! `.pk3` archives and extracts the `maps/<name>.bsp` members, caching
//! the result per archive path until its modification time advances.
//!
//! Mirrors the original `MapsState`: a concurrent map keyed by archive
//! path (here `dashmap`, matching the teacher's existing dependency for
//! concurrent maps) holding the cached modification time and map list.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use dashmap::DashMap;
use tracing::warn;

const HUDSETUP_MAP: &str = "_hudsetup";

#[derive(Debug, Clone)]
struct Pk3Info {
    modified: SystemTime,
    maps: Vec<String>,
}

/// Concurrent cache of map lists per PK3 archive path.
#[derive(Debug, Default)]
pub struct MapCache {
    entries: DashMap<PathBuf, Pk3Info>,
}

/// Extracts the basename of a `maps/<name>.bsp` zip member, matching
/// `^maps/([^/\\]+)\.bsp$`.
fn bsp_map_name(entry_name: &str) -> Option<&str> {
    let rest = entry_name.strip_prefix("maps/")?;
    let name = rest.strip_suffix(".bsp")?;
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        None
    } else {
        Some(name)
    }
}

/// Opens `path` as a ZIP archive and collects every map basename found
/// inside it.
fn list_pk3_maps(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut maps = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if let Some(mapname) = bsp_map_name(entry.name()) {
            maps.push(mapname.to_string());
        }
    }
    Ok(maps)
}

impl MapCache {
    pub fn new() -> Self {
        MapCache::default()
    }

    /// Scans every `.pk3` file directly inside `dirs`, refreshing cache
    /// entries whose archive mtime has advanced and dropping entries
    /// whose archive disappeared, then returns the sorted, deduplicated
    /// list of maps found across all archives (`_hudsetup` excluded).
    pub fn list_maps(&self, dirs: &[String]) -> Vec<String> {
        let mut seen_paths = std::collections::HashSet::new();

        for dir in dirs {
            let read_dir = match fs::read_dir(dir) {
                Ok(rd) => rd,
                Err(err) => {
                    warn!(dir = %dir, error = %err, "failed to read gamedir");
                    continue;
                },
            };
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("pk3") {
                    continue;
                }
                let metadata = match entry.metadata() {
                    Ok(m) if m.is_file() => m,
                    _ => continue,
                };
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                seen_paths.insert(path.clone());
                self.refresh_if_stale(&path, modified);
            }
        }

        self.entries.retain(|path, _| seen_paths.contains(path));

        let mut found = std::collections::HashSet::new();
        for entry in self.entries.iter() {
            for mapname in &entry.value().maps {
                found.insert(mapname.clone());
            }
        }
        found.remove(HUDSETUP_MAP);
        let mut maps: Vec<String> = found.into_iter().collect();
        maps.sort();
        maps
    }

    fn refresh_if_stale(&self, path: &Path, modified: SystemTime) {
        let needs_refresh = match self.entries.get(path) {
            Some(info) => modified > info.modified,
            None => true,
        };
        if !needs_refresh {
            return;
        }
        match list_pk3_maps(path) {
            Ok(maps) => {
                self.entries
                    .insert(path.to_path_buf(), Pk3Info { modified, maps });
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to list maps in pk3");
                self.entries.remove(path);
            },
        }
    }
}
