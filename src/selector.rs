//! Track catalog and random track selection.

use std::fmt;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::PlaybackError;

/// Identifier of one playable source: a path or URL.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Final path component, for display.
    pub fn file_name(&self) -> &str {
        self.as_path()
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Ordered, read-only list of playable sources.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioCatalog {
    sources: Vec<SourceRef>,
}

impl AudioCatalog {
    pub fn new(sources: Vec<SourceRef>) -> Self {
        Self { sources }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceRef> {
        self.sources.iter()
    }

    pub fn contains(&self, source: &SourceRef) -> bool {
        self.sources.contains(source)
    }
}

impl FromIterator<SourceRef> for AudioCatalog {
    fn from_iter<I: IntoIterator<Item = SourceRef>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Pick a track uniformly at random. Repeats are allowed.
pub fn pick_track<R: Rng + ?Sized>(
    catalog: &AudioCatalog,
    rng: &mut R,
) -> Result<SourceRef, PlaybackError> {
    catalog
        .sources
        .choose(rng)
        .cloned()
        .ok_or(PlaybackError::EmptyCatalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn abc() -> AudioCatalog {
        ["music/a.wav", "music/b.wav", "music/c.wav"]
            .into_iter()
            .map(SourceRef::from)
            .collect()
    }

    #[test]
    fn empty_catalog_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            pick_track(&AudioCatalog::empty(), &mut rng),
            Err(PlaybackError::EmptyCatalog)
        ));
    }

    #[test]
    fn picks_come_from_catalog() {
        let catalog = abc();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let pick = pick_track(&catalog, &mut rng).unwrap();
            assert!(catalog.contains(&pick));
        }
    }

    #[test]
    fn every_track_gets_picked_eventually() {
        let catalog = abc();
        let mut rng = StdRng::seed_from_u64(12);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            seen.insert(pick_track(&catalog, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn single_track_repeats() {
        let catalog = AudioCatalog::new(vec![SourceRef::from("only.wav")]);
        let mut rng = StdRng::seed_from_u64(13);
        assert_eq!(pick_track(&catalog, &mut rng).unwrap().as_str(), "only.wav");
        assert_eq!(pick_track(&catalog, &mut rng).unwrap().as_str(), "only.wav");
    }

    #[test]
    fn file_name_strips_directories() {
        assert_eq!(SourceRef::from("music/deep/track.wav").file_name(), "track.wav");
    }
}
