//! Tracks: ordered clip references with start offsets
//!
//! Offsets are recorded and reported but not scheduled; playing a track
//! starts every entry at the same time.

use std::time::Duration;

use crate::error::{AudioError, Result};

/// One clip of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackEntry {
    /// Index into the clip list the track is played with
    pub clip: usize,
    pub offset: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    entries: Vec<TrackEntry>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `clip` with its start `offset`
    pub fn add(&mut self, clip: usize, offset: Duration) -> &mut Self {
        self.entries.push(TrackEntry { clip, offset });
        self
    }

    pub fn entries(&self) -> &[TrackEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every entry against a clip list of `available` clips
    pub fn validate(&self, available: usize) -> Result<()> {
        match self
            .entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.clip >= available)
        {
            Some((entry, e)) => Err(AudioError::UnknownClip {
                entry,
                clip: e.clip,
                available,
            }),
            None => Ok(()),
        }
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a TrackEntry;
    type IntoIter = std::slice::Iter<'a, TrackEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<TrackEntry> for Track {
    fn from_iter<I: IntoIterator<Item = TrackEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
