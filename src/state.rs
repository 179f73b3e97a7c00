//! Top-level application states.
//!
//! The viewer only ever reaches [`ApplicationState::Start`] and
//! [`ApplicationState::Game`]. [`ApplicationState::Lose`] and
//! [`ApplicationState::Cutscene`] are declared so that later flows can be added
//! without changing the render loop, but nothing transitions into them yet.

use std::fmt;

/// The state read once per render tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ApplicationState {
    /// Introductory overlay over the start scene.
    Start = 0,
    /// First-person walkthrough of the exhibition.
    Game = 1,
    /// Reserved.
    Lose = 2,
    /// Reserved.
    Cutscene = 3,
}

impl ApplicationState {
    pub const ALL: [ApplicationState; 4] = [
        ApplicationState::Start,
        ApplicationState::Game,
        ApplicationState::Lose,
        ApplicationState::Cutscene,
    ];

    /// Map a raw state value, returning `None` for anything outside the enum.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Start),
            1 => Some(Self::Game),
            2 => Some(Self::Lose),
            3 => Some(Self::Cutscene),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Whether a frame in this state renders the active scene.
    ///
    /// Every declared state renders; the match stays exhaustive so a new
    /// variant has to make the decision explicitly.
    pub fn renders(self) -> bool {
        match self {
            ApplicationState::Start => true,
            ApplicationState::Game => true,
            ApplicationState::Lose => true,
            ApplicationState::Cutscene => true,
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApplicationState::Start => "START",
            ApplicationState::Game => "GAME",
            ApplicationState::Lose => "LOSE",
            ApplicationState::Cutscene => "CUTSCENE",
        };
        f.write_str(name)
    }
}

impl TryFrom<u8> for ApplicationState {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_round_trip() {
        for state in ApplicationState::ALL {
            assert_eq!(ApplicationState::from_raw(state.raw()), Some(state));
        }
    }

    #[test]
    fn unknown_raw_values_are_rejected() {
        assert_eq!(ApplicationState::from_raw(4), None);
        assert_eq!(ApplicationState::try_from(200), Err(200));
    }

    #[test]
    fn every_declared_state_renders() {
        assert!(ApplicationState::ALL.iter().all(|s| s.renders()));
    }
}
