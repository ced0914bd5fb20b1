//! House layout

use serde::{Deserialize, Serialize};
use crate::IndoorError;

/// Room position on the house grid (x grows right, y grows down)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub name: String,
    pub x: i32,
    pub y: i32,
}

impl LayoutEntry {
    pub fn new(name: &str, x: i32, y: i32) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
        }
    }
}

/// Static room → coordinate table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable {
    entries: Vec<LayoutEntry>,
}

impl LayoutTable {
    pub fn new(entries: Vec<LayoutEntry>) -> Result<Self, IndoorError> {
        if entries.is_empty() {
            return Err(IndoorError::EmptyTable);
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(IndoorError::DuplicateRoom(entry.name.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn position(&self, room: &str) -> Option<(i32, i32)> {
        self.entries
            .iter()
            .find(|e| e.name == room)
            .map(|e| (e.x, e.y))
    }

    /// Map a spoken room name ("Living Room") to its table key ("living_room")
    pub fn resolve(&self, spoken: &str) -> Option<&str> {
        let key = spoken
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        self.entries
            .iter()
            .find(|e| e.name == key)
            .map(|e| e.name.as_str())
    }
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self {
            entries: vec![
                LayoutEntry::new("living_room", 0, 0),
                LayoutEntry::new("kitchen", 5, 0),
                LayoutEntry::new("bedroom", 0, 6),
                LayoutEntry::new("bathroom", 5, 5),
                LayoutEntry::new("dining_room", 8, 0),
                LayoutEntry::new("office", 8, 5),
            ],
        }
    }
}
