//! Directional input to velocity conversion

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Player movement speed in world units per simulated second
pub const MOVE_SPEED: f32 = 200.0;

/// Velocity in world units per second
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// State of one input axis. `Back` points toward negative world
/// coordinates (left / up), `Forward` toward positive (right / down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Back,
    #[default]
    Neutral,
    Forward,
}

impl Axis {
    /// Resolve a pair of held keys into an axis state.
    /// When both are held the negative key wins.
    pub fn from_keys(negative_held: bool, positive_held: bool) -> Self {
        if negative_held {
            Axis::Back
        } else if positive_held {
            Axis::Forward
        } else {
            Axis::Neutral
        }
    }

    fn sign(self) -> f32 {
        match self {
            Axis::Back => -1.0,
            Axis::Neutral => 0.0,
            Axis::Forward => 1.0,
        }
    }
}

/// Discrete key state on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyState {
    pub horizontal: Axis,
    pub vertical: Axis,
}

/// One movement request, in either supported modality
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementInput {
    /// Polar angle in degrees, 0 = down, 90 = right, 180 = up, 270 = left
    Angle(f32),
    /// Held keys on each axis
    Keys(KeyState),
}

/// Which movement encoding the wire accepts. A server speaks exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementEncoding {
    /// `move: Up | Down | Left | Right`, resolved as key state
    #[default]
    Keys,
    /// `angle` in degrees
    Angle,
}

impl FromStr for MovementEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keys" | "move" => Ok(Self::Keys),
            "angle" => Ok(Self::Angle),
            other => Err(format!("unknown movement encoding: {other}")),
        }
    }
}

/// The eight angle sectors, in increasing angle order starting at "down"
const SECTOR_DIRECTIONS: [(f32, f32); 8] = [
    (0.0, 1.0),   // down
    (1.0, 1.0),   // down-right
    (1.0, 0.0),   // right
    (1.0, -1.0),  // up-right
    (0.0, -1.0),  // up
    (-1.0, -1.0), // up-left
    (-1.0, 0.0),  // left
    (-1.0, 1.0),  // down-left
];

const SECTOR_WIDTH: f32 = 45.0;

/// Converts directional input into a velocity at a fixed speed
#[derive(Debug, Clone, Copy)]
pub struct MovementResolver {
    speed: f32,
}

impl MovementResolver {
    pub fn new(speed: f32) -> Self {
        Self { speed }
    }

    /// Resolve any input modality. Returns `None` for a non-finite angle.
    pub fn resolve(&self, input: MovementInput) -> Option<Velocity> {
        match input {
            MovementInput::Angle(degrees) => self.resolve_angle(degrees),
            MovementInput::Keys(keys) => Some(self.resolve_keys(keys)),
        }
    }

    /// Key-state movement, normalized so diagonals are no faster than axes
    pub fn resolve_keys(&self, keys: KeyState) -> Velocity {
        let direction = Velocity::new(keys.horizontal.sign(), keys.vertical.sign());
        let len = direction.magnitude();
        if len == 0.0 {
            return Velocity::ZERO;
        }
        Velocity::new(direction.x / len * self.speed, direction.y / len * self.speed)
    }

    /// Angle movement bucketed into eight 45° sectors centred on the
    /// cardinal and diagonal directions. Diagonals carry full speed on both
    /// axes and are deliberately not normalized.
    pub fn resolve_angle(&self, degrees: f32) -> Option<Velocity> {
        if !degrees.is_finite() {
            return None;
        }
        let shifted = (degrees + SECTOR_WIDTH / 2.0).rem_euclid(360.0);
        let sector = ((shifted / SECTOR_WIDTH) as usize).min(SECTOR_DIRECTIONS.len() - 1);
        let (x, y) = SECTOR_DIRECTIONS[sector];
        Some(Velocity::new(x * self.speed, y * self.speed))
    }
}

impl Default for MovementResolver {
    fn default() -> Self {
        Self::new(MOVE_SPEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(horizontal: Axis, vertical: Axis) -> KeyState {
        KeyState {
            horizontal,
            vertical,
        }
    }

    #[test]
    fn key_axes_map_to_cardinals() {
        let resolver = MovementResolver::default();
        assert_eq!(
            resolver.resolve_keys(keys(Axis::Back, Axis::Neutral)),
            Velocity::new(-200.0, 0.0)
        );
        assert_eq!(
            resolver.resolve_keys(keys(Axis::Neutral, Axis::Forward)),
            Velocity::new(0.0, 200.0)
        );
        assert_eq!(resolver.resolve_keys(KeyState::default()), Velocity::ZERO);
    }

    #[test]
    fn key_diagonals_are_normalized() {
        let resolver = MovementResolver::default();
        let v = resolver.resolve_keys(keys(Axis::Forward, Axis::Back));
        assert!((v.magnitude() - MOVE_SPEED).abs() < 1e-3);
        assert!(v.x > 0.0 && v.y < 0.0);
        assert!((v.x + v.y).abs() < 1e-3);
    }

    #[test]
    fn negative_key_wins_when_both_held() {
        assert_eq!(Axis::from_keys(true, true), Axis::Back);
        assert_eq!(Axis::from_keys(false, true), Axis::Forward);
        assert_eq!(Axis::from_keys(false, false), Axis::Neutral);
    }

    #[test]
    fn angle_sectors_cover_the_circle() {
        let resolver = MovementResolver::default();
        let cases = [
            (0.0, (0.0, 200.0)),
            (22.4, (0.0, 200.0)),
            (22.5, (200.0, 200.0)),
            (90.0, (200.0, 0.0)),
            (135.0, (200.0, -200.0)),
            (180.0, (0.0, -200.0)),
            (225.0, (-200.0, -200.0)),
            (270.0, (-200.0, 0.0)),
            (315.0, (-200.0, 200.0)),
            (337.5, (0.0, 200.0)),
            (359.9, (0.0, 200.0)),
            (360.0, (0.0, 200.0)),
        ];
        for (angle, (x, y)) in cases {
            assert_eq!(
                resolver.resolve_angle(angle),
                Some(Velocity::new(x, y)),
                "angle {angle}"
            );
        }
    }

    #[test]
    fn angle_diagonals_keep_full_axis_speed() {
        let resolver = MovementResolver::default();
        let v = resolver.resolve_angle(45.0).unwrap();
        assert_eq!(v, Velocity::new(200.0, 200.0));
        assert!(v.magnitude() > MOVE_SPEED);
    }

    #[test]
    fn out_of_range_angles_wrap() {
        let resolver = MovementResolver::default();
        assert_eq!(resolver.resolve_angle(-90.0), resolver.resolve_angle(270.0));
        assert_eq!(resolver.resolve_angle(450.0), resolver.resolve_angle(90.0));
    }

    #[test]
    fn encoding_names_parse() {
        assert_eq!("keys".parse(), Ok(MovementEncoding::Keys));
        assert_eq!("Move".parse(), Ok(MovementEncoding::Keys));
        assert_eq!(" angle ".parse(), Ok(MovementEncoding::Angle));
        assert!("polar".parse::<MovementEncoding>().is_err());
        assert_eq!(MovementEncoding::default(), MovementEncoding::Keys);
    }

    #[test]
    fn non_finite_angle_is_rejected() {
        let resolver = MovementResolver::default();
        assert_eq!(resolver.resolve(MovementInput::Angle(f32::NAN)), None);
        assert_eq!(resolver.resolve(MovementInput::Angle(f32::INFINITY)), None);
    }
}
