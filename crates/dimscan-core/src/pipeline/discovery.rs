//! Scan planning: lazily finds candidate image files under a root.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::{PipelineError, PipelineResult};

/// Plans the files a scan will probe.
#[derive(Debug, Clone)]
pub struct ScanPlanner {
    /// Lowercased supported extensions
    supported_formats: Vec<String>,
}

/// A single-use, lazy walk over the candidate files of one root.
///
/// Yields `Ok(path)` for every supported file. Unreadable subdirectories are
/// logged and skipped; failing to read the root itself is yielded once as an
/// `Err` and ends the walk.
pub struct Plan {
    walker: walkdir::IntoIter,
    supported_formats: Vec<String>,
    root: PathBuf,
    finished: bool,
}

impl ScanPlanner {
    /// Create a new planner for the configured extensions.
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            supported_formats: config
                .supported_formats
                .iter()
                .map(|fmt| fmt.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Start a lazy walk of `root`. Nothing is read until the plan is iterated.
    pub fn plan(&self, root: &Path) -> Plan {
        Plan {
            walker: WalkDir::new(root).follow_links(true).into_iter(),
            supported_formats: self.supported_formats.clone(),
            root: root.to_path_buf(),
            finished: false,
        }
    }

    /// Count the candidate files under `root` with a full planning pass.
    pub fn count(&self, root: &Path) -> PipelineResult<u64> {
        let mut total = 0u64;
        for entry in self.plan(root) {
            entry?;
            total += 1;
        }
        Ok(total)
    }

    /// Check if a file has a supported extension.
    pub fn is_supported(&self, path: &Path) -> bool {
        is_supported(&self.supported_formats, path)
    }
}

impl Iterator for Plan {
    type Item = PipelineResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.walker.next()? {
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && is_supported(&self.supported_formats, entry.path())
                    {
                        return Some(Ok(entry.into_path()));
                    }
                }
                Err(err) if err.depth() == 0 => {
                    self.finished = true;
                    return Some(Err(PipelineError::Root {
                        path: self.root.clone(),
                        message: err.to_string(),
                    }));
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    tracing::warn!("Skipping unreadable entry {}: {}", path, err);
                }
            }
        }
    }
}

fn is_supported(supported_formats: &[String], path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            supported_formats.iter().any(|fmt| *fmt == ext_lower)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn planner() -> ScanPlanner {
        ScanPlanner::new(&ScanConfig::default())
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_is_supported() {
        let planner = planner();

        assert!(planner.is_supported(Path::new("test.jpg")));
        assert!(planner.is_supported(Path::new("test.JPG")));
        assert!(planner.is_supported(Path::new("test.jpeg")));
        assert!(planner.is_supported(Path::new("test.png")));
        assert!(planner.is_supported(Path::new("test.TIF")));
        assert!(planner.is_supported(Path::new("test.tiff")));
        assert!(planner.is_supported(Path::new("test.bmp")));
        assert!(planner.is_supported(Path::new("test.gif")));
        assert!(planner.is_supported(Path::new("test.webp")));
        assert!(!planner.is_supported(Path::new("test.txt")));
        assert!(!planner.is_supported(Path::new("test.heic")));
        assert!(!planner.is_supported(Path::new("jpg")));
    }

    #[test]
    fn test_plan_recurses_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.png"));
        touch(&dir.path().join("upper_case.JPG"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("sub/b.webp"));
        touch(&dir.path().join("sub/deeper/c.gif"));
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();

        let found: HashSet<String> = planner()
            .plan(dir.path())
            .map(|p| p.unwrap().file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        let expected: HashSet<String> = ["a.png", "upper_case.JPG", "b.webp", "c.gif"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_count_matches_plan() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            touch(&dir.path().join(format!("img_{i}.png")));
        }
        touch(&dir.path().join("readme.md"));

        assert_eq!(planner().count(dir.path()).unwrap(), 5);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(planner().count(dir.path()).unwrap(), 0);
        assert!(planner().plan(dir.path()).next().is_none());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let mut plan = planner().plan(&missing);
        assert!(matches!(plan.next(), Some(Err(PipelineError::Root { .. }))));
        assert!(plan.next().is_none());
        assert!(planner().count(&missing).is_err());
    }

    #[test]
    fn test_custom_formats_with_leading_dot() {
        let config = ScanConfig {
            supported_formats: vec![".PNG".to_string()],
            ..ScanConfig::default()
        };
        let planner = ScanPlanner::new(&config);
        assert!(planner.is_supported(Path::new("x.png")));
        assert!(!planner.is_supported(Path::new("x.jpg")));
    }
}
