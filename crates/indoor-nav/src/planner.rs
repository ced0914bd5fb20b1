//! Room-to-room direction hints

use std::cmp::Ordering;
use std::fmt;
use crate::layout::LayoutTable;
use crate::IndoorError;

/// Directional instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Current and target room are the same
    AlreadyThere,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Instruction::AlreadyThere => "You are already in the target room.",
            Instruction::MoveLeft => "Move left",
            Instruction::MoveRight => "Move right",
            Instruction::MoveUp => "Move up",
            Instruction::MoveDown => "Move down",
        };
        f.write_str(text)
    }
}

/// Directions from `current` to `target`: horizontal first, then vertical.
///
/// Only compares room coordinates; this is not a path and ignores walls.
pub fn plan(current: &str, target: &str, layout: &LayoutTable) -> Result<Vec<Instruction>, IndoorError> {
    let (cx, cy) = layout
        .position(current)
        .ok_or_else(|| IndoorError::UnknownRoom(current.to_string()))?;
    let (tx, ty) = layout
        .position(target)
        .ok_or_else(|| IndoorError::UnknownRoom(target.to_string()))?;

    if current == target {
        return Ok(vec![Instruction::AlreadyThere]);
    }

    let mut instructions = Vec::with_capacity(2);
    match tx.cmp(&cx) {
        Ordering::Greater => instructions.push(Instruction::MoveRight),
        Ordering::Less => instructions.push(Instruction::MoveLeft),
        Ordering::Equal => {}
    }
    match ty.cmp(&cy) {
        Ordering::Greater => instructions.push(Instruction::MoveDown),
        Ordering::Less => instructions.push(Instruction::MoveUp),
        Ordering::Equal => {}
    }
    Ok(instructions)
}

/// Spoken form of a plan
pub fn describe(instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutEntry;

    fn grid() -> LayoutTable {
        LayoutTable::new(vec![
            LayoutEntry::new("origin", 0, 0),
            LayoutEntry::new("east", 5, 0),
            LayoutEntry::new("south_east", 5, 5),
            LayoutEntry::new("twin", 0, 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_horizontal_only() {
        assert_eq!(plan("origin", "east", &grid()).unwrap(), vec![Instruction::MoveRight]);
        assert_eq!(plan("east", "origin", &grid()).unwrap(), vec![Instruction::MoveLeft]);
    }

    #[test]
    fn test_horizontal_before_vertical() {
        assert_eq!(
            plan("origin", "south_east", &grid()).unwrap(),
            vec![Instruction::MoveRight, Instruction::MoveDown]
        );
        assert_eq!(
            plan("south_east", "origin", &grid()).unwrap(),
            vec![Instruction::MoveLeft, Instruction::MoveUp]
        );
    }

    #[test]
    fn test_same_room() {
        assert_eq!(plan("origin", "origin", &grid()).unwrap(), vec![Instruction::AlreadyThere]);
    }

    #[test]
    fn test_distinct_rooms_at_same_position() {
        assert!(plan("origin", "twin", &grid()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_room() {
        assert_eq!(
            plan("origin", "garage", &grid()),
            Err(IndoorError::UnknownRoom("garage".to_string()))
        );
        assert_eq!(
            plan("attic", "origin", &grid()),
            Err(IndoorError::UnknownRoom("attic".to_string()))
        );
    }

    #[test]
    fn test_default_layout_directions() {
        let layout = LayoutTable::default();
        let steps = plan("living_room", "office", &layout).unwrap();
        assert_eq!(describe(&steps), "Move right -> Move down");
        assert_eq!(describe(&plan("kitchen", "kitchen", &layout).unwrap()), "You are already in the target room.");
    }
}
