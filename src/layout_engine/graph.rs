use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn cross(self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

/// Side of a stack the header is drawn on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    #[default]
    Up,
    Down,
}

impl Direction {
    /// Axis the header spans, i.e. the axis tabs are laid out along.
    pub fn header_axis(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Vertical,
            Direction::Up | Direction::Down => Orientation::Horizontal,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Part of a stack's content area a drop lands in.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Region {
    North,
    South,
    East,
    West,
}

impl Region {
    /// Axis the new split runs along.
    pub fn orientation(self) -> Orientation {
        match self {
            Region::East | Region::West => Orientation::Horizontal,
            Region::North | Region::South => Orientation::Vertical,
        }
    }

    /// True when the dropped item goes before the target.
    pub fn is_leading(self) -> bool { matches!(self, Region::North | Region::West) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum RenderableKind {
    Root,
    XyContainer,
    XyItem,
    Stack,
    StackItem,
    Component,
}

impl RenderableKind {
    /// Kinds that wrap exactly one content child.
    pub fn is_wrapper(self) -> bool {
        matches!(self, RenderableKind::Root | RenderableKind::XyItem | RenderableKind::StackItem)
    }

    /// Kinds that may sit inside a wrapper.
    pub fn is_content(self) -> bool {
        matches!(
            self,
            RenderableKind::XyContainer | RenderableKind::Stack | RenderableKind::Component
        )
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn region_orientation() {
        let horizontal: Vec<_> =
            Region::iter().filter(|r| r.orientation() == Orientation::Horizontal).collect();
        assert_eq!(horizontal, vec![Region::East, Region::West]);
        assert!(Region::North.is_leading());
        assert!(!Region::East.is_leading());
        assert_eq!(Region::West.to_string(), "west");
    }

    #[test]
    fn header_axis() {
        assert_eq!(Direction::Up.header_axis(), Orientation::Horizontal);
        assert_eq!(Direction::Left.header_axis(), Orientation::Vertical);
        assert_eq!(Direction::Down.opposite(), Direction::Up);
        assert_eq!(Orientation::Horizontal.cross(), Orientation::Vertical);
    }

    #[test]
    fn kind_roles() {
        assert!(RenderableKind::XyItem.is_wrapper());
        assert!(!RenderableKind::Stack.is_wrapper());
        assert!(RenderableKind::Component.is_content());
        assert!(!RenderableKind::StackItem.is_content());
    }
}
