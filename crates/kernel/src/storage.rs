//! Signal cells and the arena that owns them.
//!
//! An [`ObservableValue`] holds the current state of one wire together with
//! the observers to notify when it changes. Cells never notify on their own:
//! [`ValueStore::store`] reports whether the state changed and the model
//! performs the fan-out, which keeps every cell free of back references.
//!
//! # Reads
//!
//! - [`ValueStore::get`] fails with [`Error::HighZRead`] if any bit floats
//! - [`ValueStore::snapshot`] returns the state including floating bits and
//!   never fails on high impedance

use crate::bits;
use crate::error::{Error, Result};
use crate::types::{NodeId, Observer, ValueId};
use crate::value::Value;

/// Mutable state of one wire.
#[derive(Debug, Clone)]
pub struct ObservableValue {
    name: String,
    bits: u8,
    mask: u64,
    value: u64,
    high_z: u64,
    observers: Vec<Observer>,
    constant: bool,
    bidirectional: bool,
    description: Option<String>,
}

impl ObservableValue {
    fn new(name: String, bits: u8) -> Result<Self> {
        if !(1..=bits::MAX_BITS).contains(&bits) {
            return Err(Error::InvalidBits { bits });
        }
        Ok(Self {
            name,
            bits,
            mask: bits::mask(bits),
            value: 0,
            high_z: 0,
            observers: Vec::new(),
            constant: false,
            bidirectional: false,
            description: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// True if any bit floats.
    pub fn is_high_z(&self) -> bool {
        self.high_z != 0
    }

    pub fn high_z_mask(&self) -> u64 {
        self.high_z
    }

    /// The driven bits with floating bits read as zero.
    pub fn value_high_z_is_zero(&self) -> u64 {
        self.value
    }

    /// Current state, floating bits included.
    pub fn snapshot(&self) -> Value {
        Value::with_high_z(self.value, self.high_z, self.bits)
    }

    /// Current state as a number. Fails if any bit floats.
    pub fn get(&self, id: ValueId) -> Result<Value> {
        if self.high_z != 0 {
            return Err(Error::HighZRead {
                value: id,
                name: self.name.clone(),
                node: None,
            });
        }
        Ok(Value::new(self.value, self.bits))
    }

    /// Rendering of the current state, `Z` style for floating bits.
    pub fn value_string(&self) -> String {
        self.snapshot().to_string()
    }

    /// Fails unless this cell is exactly `bits` wide.
    pub fn check_bits(&self, id: ValueId, bits: u8, node: Option<NodeId>) -> Result<()> {
        if self.bits != bits {
            return Err(Error::BitsMismatch {
                expected: bits,
                found: self.bits,
                value: id,
                node,
            });
        }
        Ok(())
    }

    pub fn observers(&self) -> &[Observer] {
        &self.observers
    }

    pub fn is_constant(&self) -> bool {
        self.constant
    }

    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    pub fn set_bidirectional(&mut self, bidirectional: bool) {
        self.bidirectional = bidirectional;
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Returns false if the observer was already registered.
    pub(crate) fn add_observer(&mut self, observer: Observer) -> bool {
        if self.observers.contains(&observer) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    pub(crate) fn remove_observer(&mut self, observer: Observer) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| *o != observer);
        self.observers.len() != before
    }

    /// Reduce a write through the mask. Returns the new `(value, high_z)`
    /// pair, or `None` if it equals the stored state.
    fn reduce(&self, raw: u64, high_z: u64) -> Option<(u64, u64)> {
        let high_z = high_z & self.mask;
        let value = raw & self.mask & !high_z;
        (value != self.value || high_z != self.high_z).then_some((value, high_z))
    }
}

/// Arena owning every [`ObservableValue`] of a model.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    cells: Vec<ObservableValue>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cell, initially zero and driven.
    pub fn create(&mut self, name: impl Into<String>, bits: u8) -> Result<ValueId> {
        let cell = ObservableValue::new(name.into(), bits)?;
        let id = ValueId(self.cells.len() as u32);
        self.cells.push(cell);
        Ok(id)
    }

    /// Create a cell holding `value` that rejects every write changing it.
    pub fn create_constant(&mut self, name: impl Into<String>, bits: u8, value: u64) -> Result<ValueId> {
        let id = self.create(name, bits)?;
        let cell = &mut self.cells[id.index()];
        cell.value = value & cell.mask;
        cell.constant = true;
        Ok(id)
    }

    pub fn cell(&self, id: ValueId) -> Result<&ObservableValue> {
        self.cells.get(id.index()).ok_or(Error::UnknownValue(id))
    }

    pub fn cell_mut(&mut self, id: ValueId) -> Result<&mut ObservableValue> {
        self.cells.get_mut(id.index()).ok_or(Error::UnknownValue(id))
    }

    /// The numeric state of `id`. Fails if any bit floats.
    pub fn get(&self, id: ValueId) -> Result<Value> {
        self.cell(id)?.get(id)
    }

    pub fn snapshot(&self, id: ValueId) -> Result<Value> {
        Ok(self.cell(id)?.snapshot())
    }

    pub fn bool(&self, id: ValueId) -> Result<bool> {
        Ok(self.get(id)?.bool())
    }

    /// The state of `id` sign extended from its width.
    pub fn signed(&self, id: ValueId) -> Result<i64> {
        Ok(self.get(id)?.signed())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ValueId> + '_ {
        (0..self.cells.len() as u32).map(ValueId)
    }

    /// Store a new state. Returns true if observers must be notified.
    ///
    /// Writing a constant's own state again is not a modification.
    pub(crate) fn store(&mut self, id: ValueId, raw: u64, high_z: u64) -> Result<bool> {
        let cell = self.cell_mut(id)?;
        let Some((value, high_z)) = cell.reduce(raw, high_z) else {
            return Ok(false);
        };
        if cell.constant {
            return Err(Error::ConstantModified {
                value: id,
                name: cell.name.clone(),
            });
        }
        cell.value = value;
        cell.high_z = high_z;
        Ok(true)
    }
}
