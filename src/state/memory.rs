//! A flat, word-addressed memory array.

use crate::bus::Value;
use crate::common::InvariantViolation;

/// Backing store for `ldr`/`str`. Reads and writes are immediate — there
/// is no speculative memory state here, because the load/store queue is
/// the component responsible for holding a store back until it is no
/// longer speculative (see [`crate::backend::load_store_queue`]).
#[derive(Debug, Clone)]
pub struct Memory {
    cells: Vec<Value>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![Value::Int(0); size],
        }
    }

    fn index(&self, address: i64) -> Result<usize, InvariantViolation> {
        if address < 0 || address as usize >= self.cells.len() {
            return Err(InvariantViolation::AddressOutOfRange {
                address,
                size: self.cells.len(),
            });
        }
        Ok(address as usize)
    }

    pub fn read(&self, address: i64) -> Result<Value, InvariantViolation> {
        Ok(self.cells[self.index(address)?])
    }

    pub fn write(&mut self, address: i64, value: Value) -> Result<(), InvariantViolation> {
        let idx = self.index(address)?;
        self.cells[idx] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut mem = Memory::new(16);
        mem.write(3, Value::Int(42)).unwrap();
        assert_eq!(mem.read(3).unwrap(), Value::Int(42));
    }

    #[test]
    fn out_of_range_errors() {
        let mem = Memory::new(4);
        assert!(mem.read(-1).is_err());
        assert!(mem.read(4).is_err());
    }
}
