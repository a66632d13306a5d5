//! The architectural register file, with a pending-tag overlay for
//! register renaming.

use crate::bus::Value;
use crate::common::{InvariantViolation, RobTag};
use crate::isa::operand::{Operand, RegRef};

/// Holds committed values for every general register plus `pc`, and for
/// each a tag if an in-flight instruction is due to overwrite it.
///
/// This is the Rust rendering of the Python `RegisterFile`'s habit of
/// storing either a value or a tag under the same dict key: here the two
/// are parallel arrays instead of one array of a variant, since every
/// register always has *some* last-committed value even while a producer
/// is pending.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    values: Vec<Value>,
    pending: Vec<Option<RobTag>>,
    pc: i64,
    pc_pending: Option<RobTag>,
}

impl RegisterFile {
    pub fn new(register_count: usize) -> Self {
        Self {
            values: vec![Value::Int(0); register_count],
            pending: vec![None; register_count],
            pc: 0,
            pc_pending: None,
        }
    }

    fn index(&self, idx: usize) -> Result<usize, InvariantViolation> {
        if idx >= self.values.len() {
            Err(InvariantViolation::RegisterOutOfRange {
                index: idx,
                size: self.values.len(),
            })
        } else {
            Ok(idx)
        }
    }

    /// Renames a source reference: if a producer is pending for this
    /// register, returns its tag; otherwise returns the committed value.
    pub fn read(&self, reg: RegRef) -> Result<Operand, InvariantViolation> {
        match reg {
            RegRef::Pc => Ok(match self.pc_pending {
                Some(tag) => Operand::Tag(tag),
                None => Operand::Value(Value::Int(self.pc)),
            }),
            RegRef::General(idx) => {
                let idx = self.index(idx)?;
                Ok(match self.pending[idx] {
                    Some(tag) => Operand::Tag(tag),
                    None => Operand::Value(self.values[idx]),
                })
            }
        }
    }

    /// Returns the last committed value regardless of any pending
    /// producer, for reporting (`committed_state`) and for a store's
    /// address/value operands once they are no longer pending.
    pub fn committed_value(&self, reg: RegRef) -> Result<Value, InvariantViolation> {
        match reg {
            RegRef::Pc => Ok(Value::Int(self.pc)),
            RegRef::General(idx) => Ok(self.values[self.index(idx)?]),
        }
    }

    /// Marks `reg` as pending on `tag`: the next read of `reg` returns
    /// `Operand::Tag(tag)` until [`RegisterFile::commit`] clears it.
    pub fn set_pending(&mut self, reg: RegRef, tag: RobTag) -> Result<(), InvariantViolation> {
        match reg {
            RegRef::Pc => self.pc_pending = Some(tag),
            RegRef::General(idx) => {
                let idx = self.index(idx)?;
                self.pending[idx] = Some(tag);
            }
        }
        Ok(())
    }

    /// Writes `value` as the committed value of `reg`. Clears the pending
    /// tag only if it still equals `tag` — a later, still in-flight
    /// instruction may already have claimed the register for itself, and
    /// that claim must survive this commit.
    pub fn commit(&mut self, reg: RegRef, value: Value, tag: RobTag) -> Result<(), InvariantViolation> {
        match reg {
            RegRef::Pc => {
                self.pc = value.as_int();
                if self.pc_pending == Some(tag) {
                    self.pc_pending = None;
                }
            }
            RegRef::General(idx) => {
                let idx = self.index(idx)?;
                self.values[idx] = value;
                if self.pending[idx] == Some(tag) {
                    self.pending[idx] = None;
                }
            }
        }
        Ok(())
    }

    /// Clears every pending tag without touching committed values, used
    /// when a misprediction flush discards every in-flight renaming.
    pub fn clear_all_pending(&mut self) {
        self.pending.iter_mut().for_each(|p| *p = None);
        self.pc_pending = None;
    }

    pub fn pc(&self) -> i64 {
        self.pc
    }

    pub fn set_pc(&mut self, value: i64) {
        self.pc = value;
    }

    /// A snapshot of every general register's committed value, for
    /// `Simulator::committed_state`.
    pub fn snapshot(&self) -> Vec<Value> {
        self.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_without_pending_returns_value() {
        let rf = RegisterFile::new(4);
        assert_eq!(rf.read(RegRef::General(1)).unwrap(), Operand::Value(Value::Int(0)));
    }

    #[test]
    fn pending_then_commit_resolves() {
        let mut rf = RegisterFile::new(4);
        let tag = RobTag(7);
        rf.set_pending(RegRef::General(2), tag).unwrap();
        assert_eq!(rf.read(RegRef::General(2)).unwrap(), Operand::Tag(tag));

        rf.commit(RegRef::General(2), Value::Int(9), tag).unwrap();
        assert_eq!(rf.read(RegRef::General(2)).unwrap(), Operand::Value(Value::Int(9)));
    }

    #[test]
    fn commit_from_stale_tag_leaves_newer_pending() {
        let mut rf = RegisterFile::new(4);
        let old_tag = RobTag(1);
        let new_tag = RobTag(2);
        rf.set_pending(RegRef::General(0), old_tag).unwrap();
        rf.set_pending(RegRef::General(0), new_tag).unwrap();

        rf.commit(RegRef::General(0), Value::Int(5), old_tag).unwrap();
        assert_eq!(rf.read(RegRef::General(0)).unwrap(), Operand::Tag(new_tag));
    }

    #[test]
    fn out_of_range_register_errors() {
        let rf = RegisterFile::new(2);
        assert!(rf.read(RegRef::General(5)).is_err());
    }
}
