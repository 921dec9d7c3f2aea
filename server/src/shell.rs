//! Offline app shell: a fixed manifest of static files copied into a named cache generation
//! at startup and served cache-first, falling back to the asset directory.

use anyhow::{anyhow, Context, Result};
use axum::body::Bytes;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

pub const SHELL_CACHE_ID: &str = "book-app-cache-v1";

pub const SHELL_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/app.js",
    "/app.css",
    "/icon-192x192.png",
    "/icon-512x512.png",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellAsset {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

pub struct ShellCache {
    root: PathBuf,
    current: Option<String>,
    generations: HashMap<String, HashMap<String, ShellAsset>>,
}

impl ShellCache {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf(), current: None, generations: HashMap::new() }
    }

    /// Installs `SHELL_MANIFEST` under [`SHELL_CACHE_ID`] and activates it.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let mut cache = Self::new(root);
        cache.install(SHELL_CACHE_ID, SHELL_MANIFEST)?;
        cache.activate(SHELL_CACHE_ID);
        Ok(cache)
    }

    /// Reads every manifest entry into generation `cache_id`. All or nothing: if any entry
    /// cannot be read the generation is not created.
    pub fn install(&mut self, cache_id: &str, manifest: &[&str]) -> Result<usize> {
        let mut assets = HashMap::new();
        for path in manifest {
            let asset = self
                .read_from_root(path)
                .with_context(|| format!("installing shell asset {path} into {cache_id}"))?;
            assets.insert(path.to_string(), asset);
        }
        let count = assets.len();
        self.generations.insert(cache_id.to_string(), assets);
        tracing::info!(cache_id, count, "shell cache installed");
        Ok(count)
    }

    /// Makes `cache_id` current and deletes every other generation. Returns the purged ids.
    pub fn activate(&mut self, cache_id: &str) -> Vec<String> {
        let stale: Vec<String> = self.generations.keys().filter(|k| k.as_str() != cache_id).cloned().collect();
        for id in &stale {
            self.generations.remove(id);
            tracing::info!(cache_id = %id, "purged old shell cache");
        }
        self.current = Some(cache_id.to_string());
        stale
    }

    pub fn current(&self) -> Option<&str> { self.current.as_deref() }

    pub fn generations(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.generations.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Cache first, then the asset directory.
    pub fn fetch(&self, path: &str) -> Option<ShellAsset> {
        let cached = self
            .current
            .as_ref()
            .and_then(|id| self.generations.get(id))
            .and_then(|assets| assets.get(path));
        if let Some(asset) = cached {
            return Some(asset.clone());
        }
        match self.read_from_root(path) {
            Ok(asset) => Some(asset),
            Err(err) => {
                tracing::debug!(path, error = %err, "shell asset not in cache or on disk");
                None
            }
        }
    }

    fn read_from_root(&self, path: &str) -> Result<ShellAsset> {
        let rel = asset_relative_path(path).ok_or_else(|| anyhow!("rejected asset path {path}"))?;
        let bytes = std::fs::read(self.root.join(&rel))?;
        Ok(ShellAsset { bytes: Bytes::from(bytes), content_type: content_type_for(&rel) })
    }
}

fn asset_relative_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let rel = if trimmed.is_empty() { Path::new("index.html") } else { Path::new(trimmed) };
    if rel.components().all(|c| matches!(c, Component::Normal(_))) {
        Some(rel.to_path_buf())
    } else {
        None
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|s| s.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js" | "jsx") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json" | "webmanifest") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
