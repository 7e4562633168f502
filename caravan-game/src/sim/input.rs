//! Raw key and pointer input interpreted by the session.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Keys the engine understands. Anything else parses to `Err(())` and is
/// ignored by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// `W` or `ArrowUp`.
    Up,
    /// `ArrowDown` only; `S` is the settings hotkey.
    Down,
    /// `A` or `ArrowLeft`.
    Left,
    /// `D` or `ArrowRight`.
    Right,
    Recruit,
    CrewTrade,
    Trade,
    Hangar,
    Mount,
    Settings,
    Escape,
    Space,
    Enter,
    /// Choice ordinal `1..=9`.
    Digit(u8),
}

impl Key {
    #[must_use]
    pub const fn is_movement(self) -> bool {
        matches!(self, Self::Up | Self::Down | Self::Left | Self::Right)
    }
}

impl FromStr for Key {
    type Err = ();

    /// Accepts DOM-style key names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_ascii_lowercase();
        let parsed = match key.as_str() {
            "w" | "arrowup" => Self::Up,
            "arrowdown" => Self::Down,
            "a" | "arrowleft" => Self::Left,
            "d" | "arrowright" => Self::Right,
            "e" => Self::Recruit,
            "p" => Self::CrewTrade,
            "t" => Self::Trade,
            "v" => Self::Hangar,
            "c" => Self::Mount,
            "s" => Self::Settings,
            "escape" | "esc" => Self::Escape,
            " " | "space" | "spacebar" => Self::Space,
            "enter" => Self::Enter,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c @ '1'..='9'), None) => {
                        Self::Digit(u8::try_from(c.to_digit(10).ok_or(())?).map_err(|_| ())?)
                    }
                    _ => return Err(()),
                }
            }
        };
        Ok(parsed)
    }
}

/// Held movement keys plus the last pointer position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    held: BTreeSet<Key>,
    pointer: Option<(f32, f32)>,
}

impl InputState {
    pub fn press(&mut self, key: Key) {
        if key.is_movement() {
            self.held.insert(key);
        }
    }

    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.pointer = Some((x, y));
    }

    #[must_use]
    pub const fn pointer(&self) -> Option<(f32, f32)> {
        self.pointer
    }

    #[must_use]
    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Any movement key held.
    #[must_use]
    pub fn is_steering(&self) -> bool {
        !self.held.is_empty()
    }

    /// Unit direction from held keys; opposing keys cancel.
    #[must_use]
    pub fn direction(&self) -> (f32, f32) {
        let axis = |neg: Key, pos: Key| -> f32 {
            match (self.is_held(neg), self.is_held(pos)) {
                (true, false) => -1.0,
                (false, true) => 1.0,
                _ => 0.0,
            }
        };
        (axis(Key::Left, Key::Right), axis(Key::Up, Key::Down))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dom_names() {
        assert_eq!("ArrowUp".parse::<Key>(), Ok(Key::Up));
        assert_eq!("S".parse::<Key>(), Ok(Key::Settings));
        assert_eq!(" ".parse::<Key>(), Ok(Key::Space));
        assert_eq!("3".parse::<Key>(), Ok(Key::Digit(3)));
        assert!("0".parse::<Key>().is_err());
        assert!("12".parse::<Key>().is_err());
        assert!("q".parse::<Key>().is_err());
    }

    #[test]
    fn only_movement_keys_are_held() {
        let mut input = InputState::default();
        input.press(Key::Recruit);
        assert!(!input.is_steering());
        input.press(Key::Left);
        input.press(Key::Down);
        assert_eq!(input.direction(), (-1.0, 1.0));
        input.press(Key::Right);
        assert_eq!(input.direction(), (0.0, 1.0));
        input.release(Key::Down);
        input.release(Key::Left);
        input.release(Key::Right);
        assert!(!input.is_steering());
    }
}
