use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::simulation_engine::lanes::LaneId;

/// The pair of opposing approaches currently holding green. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "NS")]
    NorthSouth,
    #[serde(rename = "EW")]
    EastWest,
}

impl Phase {
    pub fn opposite(self) -> Phase {
        match self {
            Phase::NorthSouth => Phase::EastWest,
            Phase::EastWest => Phase::NorthSouth,
        }
    }

    /// Phase membership table.
    pub fn lanes(self) -> [LaneId; 2] {
        match self {
            Phase::NorthSouth => [LaneId::North, LaneId::South],
            Phase::EastWest => [LaneId::East, LaneId::West],
        }
    }

    pub fn is_green(self, lane: LaneId) -> bool {
        self.lanes().contains(&lane)
    }

    pub fn code(self) -> &'static str {
        match self {
            Phase::NorthSouth => "NS",
            Phase::EastWest => "EW",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NS" => Ok(Phase::NorthSouth),
            "EW" => Ok(Phase::EastWest),
            other => Err(format!("unknown phase '{}'", other)),
        }
    }
}

/// Rolling arrival pressure per phase group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePressure {
    pub ns: u32,
    pub ew: u32,
}

impl PhasePressure {
    /// NS minus EW.
    pub fn difference(&self) -> i32 {
        self.ns as i32 - self.ew as i32
    }
}
