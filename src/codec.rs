// src/codec.rs
//
// Mixed-radix index codec.
//
// Maps a multi-sensor state reading (discretized bins) and a multi-actuator
// action choice into the flat integer indices the Q-table is addressed by,
// and back. Position 0 is the least significant digit: for quantization
// steps [q0, q1, ..] the encoded index is sum(b_i * prod_{j<i} q_j).
//
// Pure functions, no shared state. Misuse (unknown actuator, value not in
// an actuator's action list, bin out of range) fails fast instead of being
// masked with a default index.

use std::fmt;

use crate::agent::Actuator;
use crate::types::{ActionChoice, ActuatorId};

/// Codec misuse or capacity failure. All variants are caller bugs or
/// construction-time rejections; none are recoverable mid-iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Empty radix list or a zero quantization step count.
    Degenerate,
    /// The product of quantization steps does not fit in `usize`.
    CapacityOverflow,
    /// The number of bins does not match the number of radices.
    ArityMismatch { expected: usize, found: usize },
    /// A discretized bin is not below its sensor's step count.
    BinOutOfRange {
        position: usize,
        bin: usize,
        steps: usize,
    },
    /// A flat index is not below the total capacity.
    IndexOutOfRange { index: usize, capacity: usize },
    /// The choice omits, or names, an actuator the agent does not own.
    UnknownActuator { id: ActuatorId },
    /// The choice names the same actuator more than once.
    DuplicateActuator { id: ActuatorId },
    /// The chosen value is not in the actuator's action list.
    UnknownAction { id: ActuatorId, value: i32 },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Degenerate => {
                write!(f, "degenerate rig: empty list or zero quantization steps")
            }
            CodecError::CapacityOverflow => {
                write!(f, "quantization step product overflows the index type")
            }
            CodecError::ArityMismatch { expected, found } => {
                write!(f, "expected {} digits, found {}", expected, found)
            }
            CodecError::BinOutOfRange {
                position,
                bin,
                steps,
            } => write!(
                f,
                "bin {} at position {} exceeds {} quantization steps",
                bin, position, steps
            ),
            CodecError::IndexOutOfRange { index, capacity } => {
                write!(f, "index {} exceeds capacity {}", index, capacity)
            }
            CodecError::UnknownActuator { id } => {
                write!(f, "choice does not match actuator set at actuator {}", id)
            }
            CodecError::DuplicateActuator { id } => {
                write!(f, "actuator {} named more than once in choice", id)
            }
            CodecError::UnknownAction { id, value } => {
                write!(f, "value {} is not an action of actuator {}", value, id)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Total number of combinations for the given quantization step counts.
///
/// This is `num_states` for sensor steps and `num_actions` for actuator
/// steps. Rejects empty and zero-step rigs, and products that overflow.
pub fn capacity(steps: &[usize]) -> Result<usize, CodecError> {
    if steps.is_empty() {
        return Err(CodecError::Degenerate);
    }
    let mut total: usize = 1;
    for &q in steps {
        if q == 0 {
            return Err(CodecError::Degenerate);
        }
        total = total.checked_mul(q).ok_or(CodecError::CapacityOverflow)?;
    }
    Ok(total)
}

/// Encode per-position digits into a single flat index, position 0 least
/// significant. Used for both state bins and actuator position indices.
pub fn encode_digits(digits: &[usize], steps: &[usize]) -> Result<usize, CodecError> {
    if digits.len() != steps.len() {
        return Err(CodecError::ArityMismatch {
            expected: steps.len(),
            found: digits.len(),
        });
    }
    if steps.is_empty() {
        return Err(CodecError::Degenerate);
    }
    let mut index: usize = 0;
    let mut factor: usize = 1;
    for (position, (&digit, &q)) in digits.iter().zip(steps.iter()).enumerate() {
        if q == 0 {
            return Err(CodecError::Degenerate);
        }
        if digit >= q {
            return Err(CodecError::BinOutOfRange {
                position,
                bin: digit,
                steps: q,
            });
        }
        index += factor * digit;
        factor = factor.checked_mul(q).ok_or(CodecError::CapacityOverflow)?;
    }
    Ok(index)
}

/// Decode a flat index back into per-position digits. Exact inverse of
/// `encode_digits` for any index below the capacity.
pub fn decode_digits(index: usize, steps: &[usize]) -> Result<Vec<usize>, CodecError> {
    let total = capacity(steps)?;
    if index >= total {
        return Err(CodecError::IndexOutOfRange {
            index,
            capacity: total,
        });
    }
    let mut digits = Vec::with_capacity(steps.len());
    let mut rem = index;
    for &q in steps {
        digits.push(rem % q);
        rem /= q;
    }
    Ok(digits)
}

/// Encode a state-bin vector into a flat state index.
pub fn encode_state(bins: &[usize], steps: &[usize]) -> Result<usize, CodecError> {
    encode_digits(bins, steps)
}

/// Decode a flat state index into per-sensor bins.
pub fn decode_state(index: usize, steps: &[usize]) -> Result<Vec<usize>, CodecError> {
    decode_digits(index, steps)
}

/// Encode an action choice into a flat action index.
///
/// Actuators are taken in the order they were supplied to the agent at
/// construction; that order determines which radix factor each positional
/// index is weighted by and is part of the contract. The choice must name
/// exactly the agent's actuator set, each actuator once.
pub fn encode_action(choice: &ActionChoice, actuators: &[Actuator]) -> Result<usize, CodecError> {
    if actuators.is_empty() {
        return Err(CodecError::Degenerate);
    }
    // An ID the agent does not own must be surfaced, never silently
    // ignored: a choice like that is a caller bug.
    for (id, _) in &choice.packets {
        if !actuators.iter().any(|a| a.id() == *id) {
            return Err(CodecError::UnknownActuator { id: *id });
        }
    }
    for (i, (id, _)) in choice.packets.iter().enumerate() {
        if choice.packets[..i].iter().any(|(prev, _)| prev == id) {
            return Err(CodecError::DuplicateActuator { id: *id });
        }
    }

    let mut index: usize = 0;
    let mut factor: usize = 1;
    for actuator in actuators {
        let value = choice
            .value_for(actuator.id())
            .ok_or(CodecError::UnknownActuator { id: actuator.id() })?;
        let position = actuator
            .actions()
            .iter()
            .position(|&a| a == value)
            .ok_or(CodecError::UnknownAction {
                id: actuator.id(),
                value,
            })?;
        index += factor * position;
        factor = factor
            .checked_mul(actuator.quantization_steps())
            .ok_or(CodecError::CapacityOverflow)?;
    }
    Ok(index)
}

/// Decode a flat action index into an action choice, actuator construction
/// order, one packet per actuator. Inverse of `encode_action`.
pub fn decode_action(index: usize, actuators: &[Actuator]) -> Result<ActionChoice, CodecError> {
    let steps: Vec<usize> = actuators.iter().map(|a| a.quantization_steps()).collect();
    let positions = decode_digits(index, &steps)?;
    let packets = actuators
        .iter()
        .zip(positions.iter())
        .map(|(actuator, &pos)| (actuator.id(), actuator.actions()[pos]))
        .collect();
    Ok(ActionChoice::new(packets))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> Vec<Actuator> {
        vec![
            Actuator::new(0, vec![-45, 0, 45]),
            Actuator::new(1, vec![-30, 30]),
            Actuator::new(7, vec![0, 1]),
        ]
    }

    #[test]
    fn capacity_is_exact_product() {
        assert_eq!(capacity(&[3, 2, 2]).unwrap(), 12);
        assert_eq!(capacity(&[10, 10, 10]).unwrap(), 1000);
        assert_eq!(capacity(&[1]).unwrap(), 1);
    }

    #[test]
    fn capacity_rejects_degenerate_and_overflow() {
        assert_eq!(capacity(&[]), Err(CodecError::Degenerate));
        assert_eq!(capacity(&[3, 0, 2]), Err(CodecError::Degenerate));
        assert_eq!(
            capacity(&[usize::MAX, 2]),
            Err(CodecError::CapacityOverflow)
        );
    }

    #[test]
    fn digits_round_trip_exhaustive() {
        let steps = [3usize, 2, 4];
        let total = capacity(&steps).unwrap();
        for index in 0..total {
            let digits = decode_digits(index, &steps).unwrap();
            assert_eq!(encode_digits(&digits, &steps).unwrap(), index);
            for (d, q) in digits.iter().zip(steps.iter()) {
                assert!(d < q);
            }
        }
    }

    #[test]
    fn encode_is_position_zero_least_significant() {
        // steps [3,2,2]: second value of position 0, first of 1 and 2
        // => 1 + 3*0 + 6*0 = 1
        assert_eq!(encode_digits(&[1, 0, 0], &[3, 2, 2]).unwrap(), 1);
        // last combination maps to capacity - 1
        assert_eq!(encode_digits(&[2, 1, 1], &[3, 2, 2]).unwrap(), 11);
    }

    #[test]
    fn encode_rejects_out_of_range_bin() {
        let err = encode_digits(&[0, 2, 0], &[3, 2, 2]).unwrap_err();
        assert_eq!(
            err,
            CodecError::BinOutOfRange {
                position: 1,
                bin: 2,
                steps: 2
            }
        );
    }

    #[test]
    fn decode_rejects_out_of_range_index() {
        let err = decode_digits(12, &[3, 2, 2]).unwrap_err();
        assert_eq!(
            err,
            CodecError::IndexOutOfRange {
                index: 12,
                capacity: 12
            }
        );
    }

    #[test]
    fn action_worked_example() {
        // Actuator steps [3,2,2]; choosing the 2nd value of actuator 0 and
        // the 1st of the others must encode to 1 + 3*0 + 6*0 = 1.
        let actuators = rig();
        let choice = ActionChoice::new(vec![(0, 0), (1, -30), (7, 0)]);
        assert_eq!(encode_action(&choice, &actuators).unwrap(), 1);
    }

    #[test]
    fn action_round_trip_full_space() {
        let actuators = rig();
        let total = 3 * 2 * 2;
        for index in 0..total {
            let choice = decode_action(index, &actuators).unwrap();
            assert_eq!(encode_action(&choice, &actuators).unwrap(), index);
        }
    }

    #[test]
    fn action_packet_order_is_irrelevant() {
        let actuators = rig();
        let forward = ActionChoice::new(vec![(0, 45), (1, 30), (7, 1)]);
        let shuffled = ActionChoice::new(vec![(7, 1), (0, 45), (1, 30)]);
        assert_eq!(
            encode_action(&forward, &actuators).unwrap(),
            encode_action(&shuffled, &actuators).unwrap()
        );
    }

    #[test]
    fn unknown_actuator_id_is_surfaced() {
        let actuators = rig();
        let foreign = ActionChoice::new(vec![(0, 0), (1, -30), (99, 0)]);
        assert_eq!(
            encode_action(&foreign, &actuators),
            Err(CodecError::UnknownActuator { id: 99 })
        );
    }

    #[test]
    fn missing_actuator_is_surfaced() {
        let actuators = rig();
        let partial = ActionChoice::new(vec![(0, 0), (1, -30)]);
        assert_eq!(
            encode_action(&partial, &actuators),
            Err(CodecError::UnknownActuator { id: 7 })
        );
    }

    #[test]
    fn duplicate_actuator_is_surfaced() {
        let actuators = rig();
        let doubled = ActionChoice::new(vec![(0, 0), (0, 45), (1, -30), (7, 0)]);
        assert_eq!(
            encode_action(&doubled, &actuators),
            Err(CodecError::DuplicateActuator { id: 0 })
        );
    }

    #[test]
    fn unknown_action_value_is_surfaced() {
        let actuators = rig();
        let bogus = ActionChoice::new(vec![(0, 17), (1, -30), (7, 0)]);
        assert_eq!(
            encode_action(&bogus, &actuators),
            Err(CodecError::UnknownAction { id: 0, value: 17 })
        );
    }
}
