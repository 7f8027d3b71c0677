//! Source locations.
//!
//! Nodes carry an opaque `Location` handle. The handle only means something
//! relative to the `LocationManager` of the translation unit that created it,
//! which expands it back into a `(filepath, line, column)` triple.

use ahash::RandomState;
use hashbrown::HashMap;

/// Opaque source location handle. `Location::NONE` means "no location".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location(u32);

impl Location {
    pub const NONE: Location = Location(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// An expanded location, borrowed from its `LocationManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandedLocation<'a> {
    pub path: &'a str,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone)]
struct LocationEntry {
    path: usize,
    line: u32,
    column: u32,
}

/// Creates and expands `Location` handles for one translation unit.
///
/// File paths are interned, so a unit with many locations in the same file
/// stores the path once.
#[derive(Debug, Clone, Default)]
pub struct LocationManager {
    paths: Vec<String>,
    path_index: HashMap<String, usize, RandomState>,
    entries: Vec<LocationEntry>,
}

impl LocationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_new_location(&mut self, path: &str, line: u32, column: u32) -> Location {
        let path = match self.path_index.get(path) {
            Some(&index) => index,
            None => {
                let index = self.paths.len();
                self.paths.push(path.to_owned());
                self.path_index.insert(path.to_owned(), index);
                index
            }
        };

        self.entries.push(LocationEntry { path, line, column });
        // Handles are 1-based so that 0 stays free for `Location::NONE`.
        Location(self.entries.len() as u32)
    }

    /// Expand a handle. Returns `None` for `Location::NONE` and for handles
    /// this manager never issued.
    pub fn expand_location(&self, location: Location) -> Option<ExpandedLocation<'_>> {
        if location.is_none() {
            return None;
        }

        let entry = self.entries.get(location.0 as usize - 1)?;
        Some(ExpandedLocation {
            path: &self.paths[entry.path],
            line: entry.line,
            column: entry.column,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_location_does_not_expand() {
        let manager = LocationManager::new();
        assert!(manager.expand_location(Location::NONE).is_none());
        assert!(manager.expand_location(Location(7)).is_none());
    }

    #[test]
    fn test_locations_share_interned_paths() {
        let mut manager = LocationManager::new();
        let a = manager.create_new_location("a.h", 1, 2);
        let b = manager.create_new_location("a.h", 10, 4);

        assert_ne!(a, b);
        assert_eq!(manager.paths.len(), 1);

        let expanded = manager.expand_location(b).expect("issued location");
        assert_eq!(expanded.path, "a.h");
        assert_eq!(expanded.line, 10);
        assert_eq!(expanded.column, 4);
    }
}
