//! Read-only view of indexed block headers.
//!
//! Retarget code only ever walks backwards from a tip. Storage layers expose
//! their index through [`HeaderView`]; the in-memory [`crate::HeaderChain`]
//! is one implementation.
//!
//! A view must be a consistent snapshot for the duration of a call. The
//! engine takes no locks of its own.

use crate::arith::U256;

/// Number of blocks whose timestamps form the median time past.
pub const MEDIAN_TIME_SPAN: usize = 11;

/// Handle to one indexed header.
///
/// Handles are cheap to clone (a reference, index or pointer).
pub trait HeaderView: Clone {
    /// Height, genesis = 0.
    fn height(&self) -> u32;

    /// Block timestamp in seconds. Not monotonic along the chain.
    fn time(&self) -> i64;

    /// Compact target stored in the header.
    fn bits(&self) -> u32;

    /// Cumulative work up to and including this header.
    fn chain_work(&self) -> U256;

    /// Immediate parent, `None` only at genesis.
    fn parent(&self) -> Option<Self>;

    /// Ancestor at `height`.
    ///
    /// `None` if `height` is above this header. The default walks parents;
    /// indexed stores should override it with a direct lookup.
    fn ancestor(&self, height: u32) -> Option<Self> {
        if height > self.height() {
            return None;
        }
        let mut current = self.clone();
        while current.height() > height {
            current = current.parent()?;
        }
        Some(current)
    }

    /// Median timestamp of this header and up to ten parents.
    ///
    /// With an even count the upper median is taken.
    fn median_time_past(&self) -> i64 {
        let mut times = Vec::with_capacity(MEDIAN_TIME_SPAN);
        let mut current = Some(self.clone());
        while let Some(header) = current {
            if times.len() == MEDIAN_TIME_SPAN {
                break;
            }
            times.push(header.time());
            current = header.parent();
        }
        times.sort_unstable();
        times[times.len() / 2]
    }
}
