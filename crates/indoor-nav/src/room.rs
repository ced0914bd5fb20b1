//! Room classification

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use crate::IndoorError;

/// Objects expected in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRule {
    pub name: String,
    pub objects: Vec<String>,
}

impl RoomRule {
    pub fn new(name: &str, objects: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            objects: objects.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// Ordered room → required objects table
///
/// Declaration order is the tie-break order for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomProfile {
    rules: Vec<RoomRule>,
}

impl RoomProfile {
    pub fn new(rules: Vec<RoomRule>) -> Result<Self, IndoorError> {
        if rules.is_empty() {
            return Err(IndoorError::EmptyTable);
        }

        let mut seen = HashSet::new();
        let mut cleaned = Vec::with_capacity(rules.len());
        for rule in rules {
            if !seen.insert(rule.name.clone()) {
                return Err(IndoorError::DuplicateRoom(rule.name));
            }

            // Required objects form an ordered set
            let mut objects_seen = HashSet::new();
            let objects: Vec<String> = rule
                .objects
                .into_iter()
                .filter(|o| objects_seen.insert(o.clone()))
                .collect();
            if objects.is_empty() {
                return Err(IndoorError::EmptyRoom(rule.name));
            }

            cleaned.push(RoomRule { name: rule.name, objects });
        }

        Ok(Self { rules: cleaned })
    }

    pub fn rules(&self) -> &[RoomRule] {
        &self.rules
    }
}

impl Default for RoomProfile {
    fn default() -> Self {
        Self {
            rules: vec![
                RoomRule::new("bedroom", &["bed", "wardrobe", "chair"]),
                RoomRule::new("bathroom", &["toilet", "sink", "bathtub", "shower"]),
                RoomRule::new("kitchen", &["refrigerator", "oven", "sink", "microwave", "dining table"]),
                RoomRule::new("living_room", &["couch", "tv", "chair", "sofa"]),
                RoomRule::new("dining_room", &["dining table", "chair"]),
                RoomRule::new("office", &["desk", "chair", "laptop", "monitor"]),
            ],
        }
    }
}

/// Room with its match score in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct RoomMatch {
    pub room: String,
    pub score: f32,
}

/// Infers the current room from visible object labels
#[derive(Debug, Clone, Default)]
pub struct RoomClassifier {
    profile: RoomProfile,
}

impl RoomClassifier {
    pub fn new(profile: RoomProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &RoomProfile {
        &self.profile
    }

    /// Score of every room, in table order
    pub fn scores<'a, I>(&self, observed: I) -> Vec<RoomMatch>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let observed: HashSet<&str> = observed.into_iter().collect();

        self.profile
            .rules
            .iter()
            .map(|rule| {
                let matches = rule
                    .objects
                    .iter()
                    .filter(|o| observed.contains(o.as_str()))
                    .count();
                RoomMatch {
                    room: rule.name.clone(),
                    score: matches as f32 / rule.objects.len() as f32,
                }
            })
            .collect()
    }

    /// Best-scoring room; ties go to the room declared first.
    ///
    /// No minimum score applies: with nothing recognized every room scores
    /// zero and the first room is returned.
    pub fn classify<'a, I>(&self, observed: I) -> RoomMatch
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best: Option<RoomMatch> = None;
        for candidate in self.scores(observed) {
            let better = match &best {
                Some(current) => candidate.score > current.score,
                None => true,
            };
            if better {
                best = Some(candidate);
            }
        }

        // RoomProfile guarantees at least one room
        let best = best.unwrap_or_else(|| RoomMatch {
            room: self.profile.rules[0].name.clone(),
            score: 0.0,
        });
        debug!("Room classified as {} ({:.2})", best.room, best.score);
        best
    }
}
