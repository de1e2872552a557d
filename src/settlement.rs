//! Reward settlement seam.
//!
//! The real profile/currency service lives outside this process; from the
//! core's point of view it is a pure function from finishing position to
//! account deltas, so that is all this module is.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub coins: i64,
    pub xp: u32,
}

/// Deltas for finishing `rank` of `seats` in one match.
pub fn settle(rank: u8, seats: usize) -> Reward {
    let position = rank.max(1) as usize;
    let beaten = seats.saturating_sub(position) as i64;
    Reward {
        coins: beaten * 40,
        xp: 20 + beaten as u32 * 20,
    }
}
