//! Line-oriented instruction decoder.
//!
//! Grounded in the Python reference's `front_end/decode.py`, which
//! dispatches on the leading mnemonic through a `dict` of lambdas and
//! raises `ValueError('unknown instruction %r' % text)` on a miss. Reworked
//! here as a `match` returning a typed [`DecodeError`] instead of a raised
//! exception, and register operands are resolved to indices instead of
//! being kept as strings.

use crate::common::DecodeError;
use crate::isa::branch::BranchInfo;
use crate::isa::instruction::RawInstruction;

/// Parses one line of the form `"mnemonic arg0 arg1 ..."`.
///
/// `Blth` is decoded with a placeholder [`BranchInfo`] (not-taken,
/// `pc_at_dispatch: 0`); the caller attaches the real prediction and
/// dispatch `pc` via [`RawInstruction::with_branch_info`] once it knows
/// them, since decoding alone has no access to either.
pub fn decode(line: &str) -> Result<RawInstruction, DecodeError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((mnemonic, args)) = tokens.split_first() else {
        return Err(DecodeError::MalformedOperands(line.to_owned()));
    };

    let malformed = || DecodeError::MalformedOperands(line.to_owned());

    match *mnemonic {
        "add" => {
            let [rd, r1, r2] = reg_triple(args).ok_or_else(malformed)?;
            Ok(RawInstruction::Add { rd, r1, r2 })
        }
        "sub" => {
            let [rd, r1, r2] = reg_triple(args).ok_or_else(malformed)?;
            Ok(RawInstruction::Sub { rd, r1, r2 })
        }
        "mul" => {
            let [rd, r1, r2] = reg_triple(args).ok_or_else(malformed)?;
            Ok(RawInstruction::Mul { rd, r1, r2 })
        }
        "addi" => {
            let (rd, r1, imm) = reg_reg_imm(args).ok_or_else(malformed)?;
            Ok(RawInstruction::AddI { rd, r1, imm })
        }
        "subi" => {
            let (rd, r1, imm) = reg_reg_imm(args).ok_or_else(malformed)?;
            Ok(RawInstruction::SubI { rd, r1, imm })
        }
        "muli" => {
            let (rd, r1, imm) = reg_reg_imm(args).ok_or_else(malformed)?;
            Ok(RawInstruction::MulI { rd, r1, imm })
        }
        "ldr" => {
            let [rd, base] = reg_pair(args).ok_or_else(malformed)?;
            Ok(RawInstruction::Load { rd, base })
        }
        "str" => {
            let [base, value] = reg_pair(args).ok_or_else(malformed)?;
            Ok(RawInstruction::Store { base, value })
        }
        "j" => {
            let [target] = args else { return Err(malformed()) };
            let target = target.parse().map_err(|_| malformed())?;
            Ok(RawInstruction::Jump { target })
        }
        "blth" => {
            let [r1, r2, target] = args else { return Err(malformed()) };
            let r1 = reg_index(r1).ok_or_else(malformed)?;
            let r2 = reg_index(r2).ok_or_else(malformed)?;
            let target = target.parse().map_err(|_| malformed())?;
            Ok(RawInstruction::Blth {
                r1,
                r2,
                target,
                branch_info: BranchInfo::new(false, 0, 0),
            })
        }
        other => Err(DecodeError::UnknownMnemonic(other.to_owned())),
    }
}

fn reg_index(token: &str) -> Option<usize> {
    token.strip_prefix('r')?.parse().ok()
}

fn reg_pair(args: &[&str]) -> Option<[usize; 2]> {
    let [a, b] = args else { return None };
    Some([reg_index(a)?, reg_index(b)?])
}

fn reg_triple(args: &[&str]) -> Option<[usize; 3]> {
    let [a, b, c] = args else { return None };
    Some([reg_index(a)?, reg_index(b)?, reg_index(c)?])
}

fn reg_reg_imm(args: &[&str]) -> Option<(usize, usize, i64)> {
    let [a, b, imm] = args else { return None };
    Some((reg_index(a)?, reg_index(b)?, imm.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_mnemonic() {
        assert_eq!(
            decode("add r1 r2 r3").unwrap(),
            RawInstruction::Add { rd: 1, r1: 2, r2: 3 }
        );
        assert_eq!(
            decode("subi r1 r2 5").unwrap(),
            RawInstruction::SubI { rd: 1, r1: 2, imm: 5 }
        );
        assert_eq!(
            decode("ldr r1 r2").unwrap(),
            RawInstruction::Load { rd: 1, base: 2 }
        );
        assert_eq!(
            decode("str r1 r2").unwrap(),
            RawInstruction::Store { base: 1, value: 2 }
        );
        assert_eq!(decode("j 10").unwrap(), RawInstruction::Jump { target: 10 });
        assert!(matches!(
            decode("blth r1 r2 10").unwrap(),
            RawInstruction::Blth { r1: 1, r2: 2, target: 10, .. }
        ));
    }

    #[test]
    fn rejects_unknown_mnemonic() {
        assert_eq!(
            decode("foo r1 r2"),
            Err(DecodeError::UnknownMnemonic("foo".to_owned()))
        );
    }

    #[test]
    fn rejects_malformed_operands() {
        assert!(matches!(decode("add r1 r2"), Err(DecodeError::MalformedOperands(_))));
        assert!(matches!(decode(""), Err(DecodeError::MalformedOperands(_))));
    }
}
