//! Simulator configuration: capacities, widths, and per-kind execution delays.

use serde::{Deserialize, Serialize};

use crate::common::ConfigError;

/// Baseline values, documented individually the way `rvsim-core`'s
/// `config::defaults` module documents its memory map constants.
pub mod defaults {
    /// Reorder buffer capacity (entries).
    pub const ROB_CAPACITY: usize = 32;
    /// Reservation station capacity (entries).
    pub const RS_CAPACITY: usize = 16;
    /// Load/store queue capacity (entries).
    pub const LSQ_CAPACITY: usize = 16;
    /// Shared dispatch / issue / retire width (instructions per cycle).
    pub const WIDTH: usize = 2;
    /// Number of ALU execution units.
    pub const ALU_UNITS: usize = 2;
    /// ALU execution latency, in cycles, after operands are ready.
    pub const ALU_DELAY: u32 = 1;
    /// Number of branch/jump execution units.
    pub const BRANCH_UNITS: usize = 1;
    /// Branch/jump execution latency, in cycles.
    pub const BRANCH_DELAY: u32 = 1;
    /// Load/store execution latency, in cycles, once dispatched from the LSQ.
    pub const MEM_DELAY: u32 = 2;
    /// Number of architectural registers (including the `pc` pseudo-register).
    pub const REGISTER_COUNT: usize = 32;
    /// Flat memory size, in addressable words.
    pub const MEMORY_SIZE: usize = 4096;
}

/// Every tunable named throughout the back-end, collected in one struct so
/// a run can be reproduced from a single serialized value.
///
/// ```
/// use procsim::Config;
///
/// let json = r#"{
///     "rob_capacity": 64,
///     "rs_capacity": 32,
///     "width": 4
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.rob_capacity, 64);
/// assert_eq!(config.width, 4);
/// // Every field the JSON omits falls back to `Config::default()`'s value.
/// assert_eq!(config.mem_delay, procsim::config::defaults::MEM_DELAY);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rob_capacity: usize,
    pub rs_capacity: usize,
    pub lsq_capacity: usize,
    pub width: usize,
    pub alu_units: usize,
    pub alu_delay: u32,
    pub branch_units: usize,
    pub branch_delay: u32,
    pub mem_delay: u32,
    pub register_count: usize,
    pub memory_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rob_capacity: defaults::ROB_CAPACITY,
            rs_capacity: defaults::RS_CAPACITY,
            lsq_capacity: defaults::LSQ_CAPACITY,
            width: defaults::WIDTH,
            alu_units: defaults::ALU_UNITS,
            alu_delay: defaults::ALU_DELAY,
            branch_units: defaults::BRANCH_UNITS,
            branch_delay: defaults::BRANCH_DELAY,
            mem_delay: defaults::MEM_DELAY,
            register_count: defaults::REGISTER_COUNT,
            memory_size: defaults::MEMORY_SIZE,
        }
    }
}

impl Config {
    /// Validates every capacity is positive and every width is at least 1,
    /// matching the Python reference's constructor assertions
    /// (`ReorderBuffer`, `ReservationStation`, and `LoadStoreQueue` all
    /// raise `ValueError` on a non-positive capacity).
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("rob_capacity", self.rob_capacity)?;
        check_positive("rs_capacity", self.rs_capacity)?;
        check_positive("lsq_capacity", self.lsq_capacity)?;
        check_positive("register_count", self.register_count)?;
        check_positive("memory_size", self.memory_size)?;

        if self.width < 1 {
            return Err(ConfigError::ZeroWidth {
                field: "width",
                value: self.width,
            });
        }
        if self.alu_units < 1 {
            return Err(ConfigError::ZeroWidth {
                field: "alu_units",
                value: self.alu_units,
            });
        }
        if self.branch_units < 1 {
            return Err(ConfigError::ZeroWidth {
                field: "branch_units",
                value: self.branch_units,
            });
        }
        Ok(())
    }
}

fn check_positive(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NonPositive {
            field,
            value: 0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_rob_capacity_rejected() {
        let cfg = Config {
            rob_capacity: 0,
            ..Config::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonPositive {
                field: "rob_capacity",
                value: 0
            })
        );
    }

    #[test]
    fn zero_width_rejected() {
        let cfg = Config {
            width: 0,
            ..Config::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroWidth {
                field: "width",
                value: 0
            })
        );
    }
}
