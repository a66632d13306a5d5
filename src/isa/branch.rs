//! Branch-prediction metadata carried alongside a conditional branch.

/// Recorded at dispatch time so the ROB can detect and correct a
/// misprediction at commit time.
///
/// The Python reference's `BranchInfo` carries a fourth, always-`None`
/// field alongside these three (reserved, apparently, for a predictor
/// handle that the reference never populates); it is dropped here since
/// nothing reads it. It also carries an `actual_target_if_mispredict`
/// field that `ReorderBuffer` commit logic never actually consults —
/// `test_conditional_instructions_incorrect_prediction_no_commit` delivers
/// a mismatch and asserts the corrected `pc` equals the branch's own
/// `target` operand, not this field. It is kept here for parity with the
/// reference's data shape, but [`crate::backend::reorder_buffer::ReorderBuffer`]
/// computes the correction from the instruction's `target` and
/// `pc_at_dispatch` instead, per that test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchInfo {
    pub predicted_taken: bool,
    pub actual_target_if_mispredict: i64,
    pub pc_at_dispatch: i64,
}

impl BranchInfo {
    pub fn new(predicted_taken: bool, actual_target_if_mispredict: i64, pc_at_dispatch: i64) -> Self {
        Self {
            predicted_taken,
            actual_target_if_mispredict,
            pc_at_dispatch,
        }
    }

    /// The PC to resume fetching from if the actual outcome agrees with
    /// the prediction: `pc_at_dispatch + 1` when not taken, otherwise the
    /// caller substitutes the branch's own `target` field.
    pub fn fallthrough_pc(&self) -> i64 {
        self.pc_at_dispatch + 1
    }

    pub fn mispredicted(&self, actual_taken: bool) -> bool {
        actual_taken != self.predicted_taken
    }
}
