use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::global_variables::RECENT_WINDOW;

/// The four approaches into the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneId {
    North,
    South,
    East,
    West,
}

impl LaneId {
    pub const ALL: [LaneId; 4] = [LaneId::North, LaneId::South, LaneId::East, LaneId::West];

    pub fn index(self) -> usize {
        match self {
            LaneId::North => 0,
            LaneId::South => 1,
            LaneId::East => 2,
            LaneId::West => 3,
        }
    }

    /// The two lanes whose traffic crosses this lane's path.
    pub fn crossing(self) -> [LaneId; 2] {
        match self {
            LaneId::North | LaneId::South => [LaneId::East, LaneId::West],
            LaneId::East | LaneId::West => [LaneId::North, LaneId::South],
        }
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            LaneId::North => "north",
            LaneId::South => "south",
            LaneId::East => "east",
            LaneId::West => "west",
        };
        write!(f, "{}", name)
    }
}

/// A single approach: its waiting queue, signal and short arrival history.
#[derive(Debug, Clone)]
pub struct Lane {
    pub id: LaneId,
    /// Vehicles waiting at the stop line.
    pub queue: u32,
    pub green: bool,
    /// Arrivals not yet drawn by the presentation layer. Separate from `queue`.
    pub visual_queue: u32,
    /// Ticks left in the current arrival burst; 0 when no burst is running.
    pub burst_countdown: u32,
    recent_arrivals: VecDeque<u8>,
}

impl Lane {
    pub fn new(id: LaneId, green: bool) -> Self {
        Self {
            id,
            queue: 0,
            green,
            visual_queue: 0,
            burst_countdown: 0,
            recent_arrivals: VecDeque::with_capacity(RECENT_WINDOW + 1),
        }
    }

    /// Records this tick's arrival outcome, evicting the oldest entry past the window.
    pub fn record_arrival(&mut self, arrived: bool) {
        if arrived {
            self.queue += 1;
            self.visual_queue += 1;
        }
        self.recent_arrivals.push_back(u8::from(arrived));
        while self.recent_arrivals.len() > RECENT_WINDOW {
            self.recent_arrivals.pop_front();
        }
    }

    /// Sum of arrivals over the rolling window.
    pub fn recent_pressure(&self) -> u32 {
        self.recent_arrivals.iter().map(|&a| a as u32).sum()
    }

    pub fn recent_arrivals(&self) -> impl Iterator<Item = u8> + '_ {
        self.recent_arrivals.iter().copied()
    }

    /// Lets up to `max_pass` vehicles through. Red lanes never release.
    pub fn release(&mut self, max_pass: u32) -> u32 {
        if !self.green {
            return 0;
        }
        let released = self.queue.min(max_pass);
        self.queue -= released;
        released
    }

    /// A cosmetic vehicle was drawn for one queued unit.
    pub fn consume_visual(&mut self) {
        self.visual_queue = self.visual_queue.saturating_sub(1);
    }
}
