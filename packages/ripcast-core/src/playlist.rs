//! Playlist discovery and the shared playback cursor.
//!
//! Every client hears the same stream: there is exactly one cursor,
//! advanced only at end-of-track, wrapping back to the first track after
//! the last.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Name suffix a file must carry to join the playlist.
const TRACK_SUFFIX: &str = ".rip";

/// Errors from playlist discovery.
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// The directory holds no `.rip` files at all.
    #[error("empty playlist in {0}")]
    Empty(PathBuf),

    /// The directory could not be enumerated.
    #[error("failed to read playlist directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Ordered list of track paths plus the playback cursor.
#[derive(Debug)]
pub struct Playlist {
    tracks: Vec<PathBuf>,
    current: usize,
}

impl Playlist {
    /// Builds a playlist from an already-ordered list of paths.
    ///
    /// # Panics
    ///
    /// Panics when `tracks` is empty: a playlist always holds at least one
    /// track.
    pub fn new(tracks: Vec<PathBuf>) -> Self {
        assert!(!tracks.is_empty(), "playlist must hold at least one track");
        Self { tracks, current: 0 }
    }

    /// Scans `dir` once for regular files named `*.rip`, in directory
    /// enumeration order (no re-sort). Subdirectories, symlinks and other
    /// names are ignored.
    pub fn scan(dir: &Path) -> Result<Self, PlaylistError> {
        let scan_err = |source| PlaylistError::Scan {
            path: dir.to_path_buf(),
            source,
        };

        let mut tracks = Vec::new();
        for entry in fs::read_dir(dir).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            if !entry.file_type().map_err(scan_err)?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.ends_with(TRACK_SUFFIX) {
                tracks.push(entry.path());
            }
        }

        if tracks.is_empty() {
            return Err(PlaylistError::Empty(dir.to_path_buf()));
        }
        log::info!(
            "[Playlist] loaded {} tracks from {}",
            tracks.len(),
            dir.display()
        );
        Ok(Self { tracks, current: 0 })
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Path of the currently playing track.
    pub fn current(&self) -> &Path {
        &self.tracks[self.current]
    }

    /// Advances the cursor with wrap-around and returns the new track.
    pub fn advance(&mut self) -> &Path {
        self.current = (self.current + 1) % self.tracks.len();
        &self.tracks[self.current]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn scan_keeps_only_rip_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("one.rip"), b"x").expect("write");
        fs::write(dir.path().join("two.rip"), b"x").expect("write");
        fs::write(dir.path().join("notes.txt"), b"x").expect("write");
        fs::write(dir.path().join("ripless"), b"x").expect("write");
        fs::create_dir(dir.path().join("nested.rip")).expect("mkdir");

        let playlist = Playlist::scan(dir.path()).expect("scan should succeed");

        // enumeration order is filesystem-defined; compare as a set
        let found: BTreeSet<String> = playlist
            .tracks
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        let expected: BTreeSet<String> =
            ["one.rip".to_string(), "two.rip".to_string()].into();
        assert_eq!(found, expected);
    }

    #[test]
    fn scan_ignores_tracks_inside_subdirectories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = dir.path().join("more");
        fs::create_dir(&sub).expect("mkdir");
        fs::write(sub.join("hidden.rip"), b"x").expect("write");
        fs::write(dir.path().join("top.rip"), b"x").expect("write");

        let playlist = Playlist::scan(dir.path()).expect("scan should succeed");
        assert_eq!(playlist.len(), 1);
        assert!(playlist.current().ends_with("top.rip"));
    }

    #[test]
    fn scan_of_empty_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            Playlist::scan(dir.path()),
            Err(PlaylistError::Empty(_))
        ));
    }

    #[test]
    fn scan_without_any_rip_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("cover.jpg"), b"x").expect("write");

        assert!(matches!(
            Playlist::scan(dir.path()),
            Err(PlaylistError::Empty(_))
        ));
    }

    #[test]
    fn cursor_advances_with_wrap() {
        let mut playlist = Playlist::new(vec![
            PathBuf::from("a.rip"),
            PathBuf::from("b.rip"),
            PathBuf::from("c.rip"),
        ]);

        assert_eq!(playlist.current(), Path::new("a.rip"));
        assert_eq!(playlist.advance(), Path::new("b.rip"));
        assert_eq!(playlist.advance(), Path::new("c.rip"));
        assert_eq!(playlist.advance(), Path::new("a.rip"));
        assert_eq!(playlist.current(), Path::new("a.rip"));
    }

    #[test]
    fn single_track_wraps_to_itself() {
        let mut playlist = Playlist::new(vec![PathBuf::from("only.rip")]);
        assert_eq!(playlist.advance(), Path::new("only.rip"));
        assert_eq!(playlist.advance(), Path::new("only.rip"));
    }
}
