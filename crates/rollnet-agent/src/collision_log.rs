//! De-duplicated log of collision positions
//!
//! One `x,y,z` point per line, sorted. Saving merges with whatever is
//! already on disk, so the file only ever grows across sessions. Lines of
//! the existing file that are not points are dropped from the merge; the
//! file as it was is kept next to it with a `.bak` suffix.

use std::collections::BTreeSet;
use std::path::Path;

use rollnet_link::CollisionPoint;
use tokio::fs;
use tracing::{debug, warn};

use crate::persistence::with_suffix;
use crate::PersistError;

/// Set of collision positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionLog {
    points: BTreeSet<CollisionPoint>,
}

/// Non-empty lines with their 1-based numbers, parsed
fn parse_lines(text: &str) -> impl Iterator<Item = (usize, Result<CollisionPoint, String>)> + '_ {
    text.lines().enumerate().filter_map(|(index, line)| {
        let line = line.trim();
        (!line.is_empty()).then(|| (index + 1, line.parse()))
    })
}

impl CollisionLog {
    /// Empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a log; blank lines are skipped
    pub fn parse(text: &str) -> Result<Self, PersistError> {
        let mut log = Self::new();
        for (line, parsed) in parse_lines(text) {
            let point = parsed.map_err(|message| PersistError::Parse { line, message })?;
            log.record(point);
        }
        Ok(log)
    }

    /// Read a log file; a missing file is an empty log
    pub async fn load(path: &Path) -> Result<Self, PersistError> {
        match fs::read_to_string(path).await {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Merge with the file at `path` and rewrite it; returns the number of
    /// points now stored
    pub async fn save(&self, path: &Path) -> Result<usize, PersistError> {
        let mut merged = self.clone();
        match fs::read_to_string(path).await {
            Ok(text) => merged.merge_saved(path, &text).await,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = with_suffix(path, ".tmp");
        fs::write(&tmp, merged.to_text()).await?;
        fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), points = merged.len(), "saved collision log");
        Ok(merged.len())
    }

    async fn merge_saved(&mut self, path: &Path, text: &str) {
        let mut rejected = 0;
        for (line, parsed) in parse_lines(text) {
            match parsed {
                Ok(point) => {
                    self.record(point);
                }
                Err(message) => {
                    warn!(path = %path.display(), line, %message, "skipping malformed collision point");
                    rejected += 1;
                }
            }
        }
        if rejected == 0 {
            return;
        }

        let backup = with_suffix(path, ".bak");
        match fs::write(&backup, text).await {
            Ok(()) => warn!(
                backup = %backup.display(),
                rejected,
                "kept the previous collision log before rewriting it"
            ),
            Err(e) => warn!(
                backup = %backup.display(),
                error = %e,
                "could not keep the previous collision log"
            ),
        }
    }

    /// Add a point; `true` if it was not logged yet
    pub fn record(&mut self, point: CollisionPoint) -> bool {
        self.points.insert(point)
    }

    /// Add every point of `other`
    pub fn merge(&mut self, other: &CollisionLog) {
        self.points.extend(other.points.iter().copied());
    }

    /// Whether `point` is logged
    #[must_use]
    pub fn contains(&self, point: &CollisionPoint) -> bool {
        self.points.contains(point)
    }

    /// Number of distinct points
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nothing is logged
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &CollisionPoint> {
        self.points.iter()
    }

    fn to_text(&self) -> String {
        self.points.iter().map(|p| format!("{p}\n")).collect()
    }
}

impl Extend<CollisionPoint> for CollisionLog {
    fn extend<T: IntoIterator<Item = CollisionPoint>>(&mut self, iter: T) {
        self.points.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deduplicates() {
        let mut log = CollisionLog::new();
        assert!(log.record(CollisionPoint::new(1, 2, 0)));
        assert!(!log.record(CollisionPoint::new(1, 2, 0)));
        assert!(log.record(CollisionPoint::new(-1, 2, 0)));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_parse_tolerates_blank_lines_and_parens() {
        let log = CollisionLog::parse("1,2,3\n\n(4, 5, 6)\n1,2,3\n").unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.contains(&CollisionPoint::new(4, 5, 6)));
    }

    #[test]
    fn test_parse_reports_bad_line() {
        let err = CollisionLog::parse("1,2,3\nnot a point\n").unwrap_err();
        assert!(matches!(err, PersistError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_parse_lines_numbers_skip_blanks() {
        let lines: Vec<(usize, bool)> = parse_lines("1,2,3\n\n1.5,0,0\n")
            .map(|(line, parsed)| (line, parsed.is_ok()))
            .collect();
        assert_eq!(lines, vec![(1, true), (3, false)]);
    }

    #[test]
    fn test_text_is_sorted() {
        let mut log = CollisionLog::new();
        log.extend([CollisionPoint::new(5, 0, 0), CollisionPoint::new(-5, 0, 0)]);
        assert_eq!(log.to_text(), "-5,0,0\n5,0,0\n");
    }
}
