//! Vehicle parameter table
//!
//! The confirmed set mirrors what the vehicle has reported through
//! PARAM_VALUE. A local edit creates a staged copy that lives beside the
//! confirmed value until the vehicle echoes a PARAM_VALUE for the same ID,
//! which confirms the new value and drops the staged entry.

use std::collections::{BTreeMap, BTreeSet};

use heapless::String as BoundedString;
use thiserror::Error;

use crate::messages::{MavParamType, PARAM_VALUE_DATA};

/// Maximum parameter ID length on the wire
pub const PARAM_ID_LEN: usize = 16;

/// Parameter identifier, at most 16 ASCII bytes
pub type ParamId = BoundedString<PARAM_ID_LEN>;

/// Invalid parameter identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamIdError {
    #[error("parameter id is empty")]
    Empty,
    #[error("parameter id is {0} bytes, at most 16 allowed")]
    TooLong(usize),
    #[error("parameter id must be printable ASCII")]
    NotAscii,
}

/// Validate and convert a parameter ID.
pub fn param_id(id: &str) -> Result<ParamId, ParamIdError> {
    if id.is_empty() {
        return Err(ParamIdError::Empty);
    }
    if !id.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(ParamIdError::NotAscii);
    }
    ParamId::try_from(id).map_err(|_| ParamIdError::TooLong(id.len()))
}

/// NUL-padded wire form of a parameter ID.
pub fn encode_param_id(id: &str) -> Result<[u8; PARAM_ID_LEN], ParamIdError> {
    let id = param_id(id)?;
    let mut raw = [0u8; PARAM_ID_LEN];
    raw[..id.len()].copy_from_slice(id.as_bytes());
    Ok(raw)
}

/// Parse the wire form: up to the first NUL, or all 16 bytes.
pub fn decode_param_id(raw: &[u8; PARAM_ID_LEN]) -> Result<ParamId, ParamIdError> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(PARAM_ID_LEN);
    let text = std::str::from_utf8(&raw[..end]).map_err(|_| ParamIdError::NotAscii)?;
    param_id(text)
}

/// A single parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub id: ParamId,
    pub value: f32,
    /// Storage type on the vehicle
    pub param_type: MavParamType,
    /// Position in the vehicle's list, unknown for local edits
    pub index: Option<u16>,
    pub description: Option<String>,
}

/// Confirmed parameters plus in-flight edits
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    confirmed: BTreeMap<ParamId, Parameter>,
    staged: BTreeMap<ParamId, Parameter>,
    expected_count: Option<u16>,
    seen_indices: BTreeSet<u16>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a PARAM_VALUE from the vehicle.
    ///
    /// # Returns
    ///
    /// The parameter's ID, or an error when the wire ID is malformed (the
    /// message is then ignored).
    pub fn apply_param_value(&mut self, msg: &PARAM_VALUE_DATA) -> Result<ParamId, ParamIdError> {
        let id = decode_param_id(&msg.param_id)?;

        self.expected_count = Some(msg.param_count);
        // 0xFFFF marks a value sent in reply to PARAM_SET rather than a list entry
        let index = (msg.param_index != u16::MAX).then_some(msg.param_index);
        if let Some(index) = index {
            self.seen_indices.insert(index);
        }

        let description = self
            .confirmed
            .get(&id)
            .and_then(|p| p.description.clone());
        let index = index.or_else(|| self.confirmed.get(&id).and_then(|p| p.index));

        self.staged.remove(&id);
        self.confirmed.insert(
            id.clone(),
            Parameter {
                id: id.clone(),
                value: msg.param_value,
                param_type: msg.param_type,
                index,
                description,
            },
        );
        Ok(id)
    }

    /// Stage a local edit. The confirmed value is left as is.
    pub fn stage(&mut self, id: &str, value: f32) -> Result<&Parameter, ParamIdError> {
        let id = param_id(id)?;
        let base = self.confirmed.get(&id);
        let staged = Parameter {
            id: id.clone(),
            value,
            param_type: base.map_or(MavParamType::MAV_PARAM_TYPE_REAL32, |p| p.param_type),
            index: base.and_then(|p| p.index),
            description: base.and_then(|p| p.description.clone()),
        };
        self.staged.insert(id.clone(), staged);
        Ok(&self.staged[&id])
    }

    /// Drop a staged edit, e.g. after the PARAM_SET could not be sent.
    pub fn unstage(&mut self, id: &str) -> Option<Parameter> {
        let id = param_id(id).ok()?;
        self.staged.remove(&id)
    }

    /// Attach a human-readable description to a parameter.
    pub fn describe(&mut self, id: &str, description: impl Into<String>) -> Result<(), ParamIdError> {
        let id = param_id(id)?;
        let description = description.into();
        if let Some(p) = self.confirmed.get_mut(&id) {
            p.description = Some(description.clone());
        }
        if let Some(p) = self.staged.get_mut(&id) {
            p.description = Some(description);
        }
        Ok(())
    }

    /// Confirmed parameter by ID
    pub fn get(&self, id: &str) -> Option<&Parameter> {
        let id = param_id(id).ok()?;
        self.confirmed.get(&id)
    }

    /// Staged edit by ID
    pub fn get_staged(&self, id: &str) -> Option<&Parameter> {
        let id = param_id(id).ok()?;
        self.staged.get(&id)
    }

    /// Confirmed parameters in ID order
    pub fn confirmed(&self) -> impl Iterator<Item = &Parameter> {
        self.confirmed.values()
    }

    /// Staged edits in ID order
    pub fn staged(&self) -> impl Iterator<Item = &Parameter> {
        self.staged.values()
    }

    /// Total the vehicle reports, once any PARAM_VALUE has arrived
    pub fn expected_count(&self) -> Option<u16> {
        self.expected_count
    }

    /// Distinct list indices received so far
    pub fn received_count(&self) -> usize {
        self.seen_indices.len()
    }

    /// Whether every index up to the reported total has been received
    pub fn is_complete(&self) -> bool {
        self.expected_count
            .is_some_and(|count| self.seen_indices.len() >= count as usize)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
