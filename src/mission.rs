//! Local mission model
//!
//! Holds a mission being edited on the ground. Sequence numbers are dense
//! and zero-based: `items()[i].seq == i` after every operation. Only the
//! list request and MISSION_START travel over the link; uploading and
//! downloading items is not part of this crate.

use thiserror::Error;

use crate::messages::{CoordinateFrame, MavCmd, MavMissionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissionError {
    #[error("sequence {seq} out of range for mission of {len} items")]
    OutOfRange { seq: u16, len: usize },
    #[error("mission is full")]
    Full,
}

/// One mission item (MISSION_ITEM_INT semantics, unscaled)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionItem {
    /// Position in the mission, maintained by [`Mission`]
    pub seq: u16,
    pub frame: CoordinateFrame,
    pub command: MavCmd,
    pub current: bool,
    pub autocontinue: bool,
    pub params: [f32; 4],
    /// Latitude in degrees for global frames
    pub x: f64,
    /// Longitude in degrees for global frames
    pub y: f64,
    /// Altitude in meters, meaning depends on `frame`
    pub z: f32,
    pub mission_type: MavMissionType,
}

impl MissionItem {
    /// Waypoint at a position relative to home altitude
    pub fn waypoint(latitude: f64, longitude: f64, altitude: f32) -> Self {
        Self {
            seq: 0,
            frame: CoordinateFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT,
            command: MavCmd::MAV_CMD_NAV_WAYPOINT,
            current: false,
            autocontinue: true,
            params: [0.0; 4],
            x: latitude,
            y: longitude,
            z: altitude,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        }
    }
}

/// Ordered mission item list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mission {
    items: Vec<MissionItem>,
}

impl Mission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[MissionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, seq: u16) -> Option<&MissionItem> {
        self.items.get(seq as usize)
    }

    /// Append an item, returning its sequence number.
    pub fn push(&mut self, item: MissionItem) -> Result<u16, MissionError> {
        let seq = u16::try_from(self.items.len()).map_err(|_| MissionError::Full)?;
        self.items.push(MissionItem { seq, ..item });
        Ok(seq)
    }

    /// Insert an item before `seq` (or at the end when `seq == len`).
    pub fn insert(&mut self, seq: u16, item: MissionItem) -> Result<(), MissionError> {
        if seq as usize > self.items.len() {
            return Err(MissionError::OutOfRange {
                seq,
                len: self.items.len(),
            });
        }
        if self.items.len() >= u16::MAX as usize {
            return Err(MissionError::Full);
        }
        self.items.insert(seq as usize, item);
        self.renumber();
        Ok(())
    }

    /// Remove the item at `seq`; later items move down by one.
    pub fn remove(&mut self, seq: u16) -> Result<MissionItem, MissionError> {
        if seq as usize >= self.items.len() {
            return Err(MissionError::OutOfRange {
                seq,
                len: self.items.len(),
            });
        }
        let removed = self.items.remove(seq as usize);
        self.renumber();
        Ok(removed)
    }

    /// Mark `seq` as the current item, clearing the flag elsewhere.
    pub fn set_current(&mut self, seq: u16) -> Result<(), MissionError> {
        if seq as usize >= self.items.len() {
            return Err(MissionError::OutOfRange {
                seq,
                len: self.items.len(),
            });
        }
        for item in &mut self.items {
            item.current = item.seq == seq;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn renumber(&mut self) {
        for (i, item) in self.items.iter_mut().enumerate() {
            item.seq = i as u16;
        }
    }
}
