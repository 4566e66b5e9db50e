//! Round-robin assignment over an ordered member list.

use crate::error::ScheduleError;
use crate::models::MemberId;

/// Whose turn is next. Does not advance.
pub fn peek_next(order: &[MemberId], current_index: usize) -> Result<&MemberId, ScheduleError> {
    order.get(current_index).ok_or(ScheduleError::InvalidState {
        index: current_index,
        len: order.len(),
    })
}

/// Index after the current member has taken a turn, wrapping at the end.
///
/// Always valid for the order it is given, even if the order changed length
/// since `current_index` was stored. An empty order yields 0.
pub fn advance(order: &[MemberId], current_index: usize) -> usize {
    if order.is_empty() {
        return 0;
    }
    (current_index % order.len() + 1) % order.len()
}

/// Resets an out-of-bounds index to 0. The flag reports whether a reset happened.
pub fn normalize_index(order: &[MemberId], current_index: usize) -> (usize, bool) {
    if current_index < order.len() {
        (current_index, false)
    } else {
        (0, true)
    }
}
