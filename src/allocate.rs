use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A named, contiguous block of roster rows `[start, start + size)`.
///
/// Rooms are only ever created by slicing off the next unallocated block,
/// so `start` always equals the allocated count at creation time.
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub start: usize,
    pub size: usize,
}

/// Requested room size exceeds the unallocated remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityError {
    pub requested: usize,
    pub remaining: usize,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "not enough remaining students: requested {}, remaining {}",
            self.requested, self.remaining
        )
    }
}

impl std::error::Error for CapacityError {}

/// Ordered room sequence for one session. Rooms always partition a strict
/// prefix of the roster: no gaps, no overlaps, no reordering. The only
/// mutations are appending a room and a full reset.
#[derive(Debug, Default)]
pub struct Allocation {
    rooms: Vec<Room>,
}

impl Allocation {
    /// Append a room holding the next `count` unallocated rows.
    ///
    /// Fails without touching state when fewer than `count` rows remain.
    /// Duplicate names are allowed; the generated id tells rooms apart.
    pub fn add_room(
        &mut self,
        name: &str,
        count: usize,
        total_rows: usize,
    ) -> Result<Room, CapacityError> {
        let allocated = self.allocated_count();
        if allocated + count > total_rows {
            return Err(CapacityError {
                requested: count,
                remaining: total_rows - allocated,
            });
        }
        let room = Room {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            start: allocated,
            size: count,
        };
        self.rooms.push(room.clone());
        Ok(room)
    }

    /// Clear all rooms. Always succeeds; idempotent.
    pub fn reset(&mut self) {
        self.rooms.clear();
    }

    pub fn allocated_count(&self) -> usize {
        self.rooms.iter().map(|r| r.size).sum()
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Advisory: every roster row has been placed in a room.
    pub fn is_complete(&self, total_rows: usize) -> bool {
        self.allocated_count() == total_rows
    }
}
