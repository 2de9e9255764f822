//! Integer-list coding with an automatically chosen scheme.
//!
//! A finite `i64` sequence is written under whichever of four layouts costs
//! the fewest bits: fixed-width, per-element tagged, or the delta variant of
//! either (successive differences, seeded from 0). All four share a common
//! header: a 2-bit scheme id, a 24-bit element count, and one bit recording
//! whether every (delta) element is non-negative — when any is negative, each
//! element pays an extra sign bit.
//!
//! The cost model is exact: the scheme the writer picks always matches the
//! number of bits it then emits, and ties resolve in declaration order.

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{QrWasmError, Result};
use crate::numeric::{TAG_WIDTH_BITS, required_bits};

/// Bits used for the scheme id.
pub const LIST_TYPE_BITS: u8 = 2;
/// Bits used for the element count; lists are capped at `2^24 - 1` elements.
pub const LIST_SIZE_BITS: u8 = 24;

/// The four list layouts, in tie-breaking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerListEncoding {
    /// Every element in `max_bits` bits (6-bit width prefix).
    Fixed = 0,
    /// Every element tagged with its own 6-bit width.
    Tagged = 1,
    /// Successive differences, fixed-width.
    DeltaFixed = 2,
    /// Successive differences, tagged.
    DeltaTagged = 3,
}

/// The writer's decision for a list: scheme, sign flag, and exact bit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPlan {
    /// Chosen layout.
    pub encoding: IntegerListEncoding,
    /// The sign flag that will be written (computed over deltas for the
    /// delta schemes).
    pub all_nonnegative: bool,
    /// Total bits the list will occupy, header included.
    pub cost_bits: u64,
}

/// Cost sentinel for schemes a list cannot use.
const INELIGIBLE: u64 = u64::MAX;

/// Compute all four candidate costs and pick the cheapest.
pub fn plan(data: &[i64]) -> Result<ListPlan> {
    if data.len() >= (1 << LIST_SIZE_BITS) {
        return Err(QrWasmError::unsupported(format!(
            "integer list of {} elements exceeds the 24-bit count field",
            data.len()
        )));
    }

    let header = (LIST_TYPE_BITS + LIST_SIZE_BITS + 1) as u64;
    let len = data.len() as u64;

    let mut max_bits_fixed = 0u8;
    let mut tagged_cost = header;
    let mut max_bits_delta = 0u8;
    let mut delta_tagged_cost = header;
    let mut nonneg = true;
    let mut nonneg_delta = true;
    let mut delta_eligible = true;
    let mut last = 0i64;

    for &num in data {
        let bits = required_bits(num);
        if bits > 63 {
            return Err(QrWasmError::unsupported(
                "integer list element magnitude needs 64 bits",
            ));
        }
        max_bits_fixed = max_bits_fixed.max(bits);
        if num < 0 {
            nonneg = false;
        }
        tagged_cost += (TAG_WIDTH_BITS + bits) as u64;

        let delta = num.wrapping_sub(last);
        let delta_bits = required_bits(delta);
        if delta_bits > 63 {
            delta_eligible = false;
        }
        max_bits_delta = max_bits_delta.max(delta_bits);
        if delta < 0 {
            nonneg_delta = false;
        }
        delta_tagged_cost += (TAG_WIDTH_BITS + delta_bits) as u64;

        last = num;
    }

    let mut fixed_cost = header + TAG_WIDTH_BITS as u64 + len * max_bits_fixed as u64;
    let mut delta_fixed_cost = header + TAG_WIDTH_BITS as u64 + len * max_bits_delta as u64;
    if !nonneg {
        fixed_cost += len;
        tagged_cost += len;
    }
    if !nonneg_delta {
        delta_fixed_cost += len;
        delta_tagged_cost += len;
    }
    if !delta_eligible {
        delta_fixed_cost = INELIGIBLE;
        delta_tagged_cost = INELIGIBLE;
    }

    let candidates = [
        (IntegerListEncoding::Fixed, fixed_cost, nonneg),
        (IntegerListEncoding::Tagged, tagged_cost, nonneg),
        (IntegerListEncoding::DeltaFixed, delta_fixed_cost, nonneg_delta),
        (IntegerListEncoding::DeltaTagged, delta_tagged_cost, nonneg_delta),
    ];
    let &(encoding, cost_bits, all_nonnegative) = candidates
        .iter()
        .min_by_key(|&&(_, cost, _)| cost)
        .expect("four candidates");

    Ok(ListPlan {
        encoding,
        all_nonnegative,
        cost_bits,
    })
}

/// Write `data` under the cheapest scheme and return the decision.
pub fn write_list(writer: &mut BitWriter, data: &[i64]) -> Result<ListPlan> {
    let plan = plan(data)?;
    writer.write_bits_unsigned(plan.encoding as u64, LIST_TYPE_BITS);
    writer.write_bits_unsigned(data.len() as u64, LIST_SIZE_BITS);
    writer.write_bit(plan.all_nonnegative);

    let max_bits = |deltas: bool| -> u8 {
        let mut max = 0u8;
        let mut last = 0i64;
        for &num in data {
            let x = if deltas { num.wrapping_sub(last) } else { num };
            max = max.max(required_bits(x));
            last = num;
        }
        max
    };

    match plan.encoding {
        IntegerListEncoding::Fixed => {
            let width = max_bits(false);
            writer.write_bits_unsigned(width as u64, TAG_WIDTH_BITS);
            for &num in data {
                if plan.all_nonnegative {
                    writer.write_bits_unsigned(num as u64, width);
                } else {
                    writer.write_bits_signed(num, width);
                }
            }
        }
        IntegerListEncoding::Tagged => {
            for &num in data {
                if plan.all_nonnegative {
                    writer.write_tagged_unsigned(num as u64)?;
                } else {
                    writer.write_tagged_signed(num)?;
                }
            }
        }
        IntegerListEncoding::DeltaFixed => {
            let width = max_bits(true);
            writer.write_bits_unsigned(width as u64, TAG_WIDTH_BITS);
            let mut last = 0i64;
            for &num in data {
                let delta = num.wrapping_sub(last);
                if plan.all_nonnegative {
                    writer.write_bits_unsigned(delta as u64, width);
                } else {
                    writer.write_bits_signed(delta, width);
                }
                last = num;
            }
        }
        IntegerListEncoding::DeltaTagged => {
            let mut last = 0i64;
            for &num in data {
                let delta = num.wrapping_sub(last);
                if plan.all_nonnegative {
                    writer.write_tagged_unsigned(delta as u64)?;
                } else {
                    writer.write_tagged_signed(delta)?;
                }
                last = num;
            }
        }
    }
    Ok(plan)
}

/// Read a list written by [`write_list`].
pub fn read_list(reader: &mut BitReader<'_>) -> Result<Vec<i64>> {
    let scheme = reader.read_bits_unsigned(LIST_TYPE_BITS)?;
    let len = reader.read_bits_unsigned(LIST_SIZE_BITS)? as usize;
    let nonneg = reader.read_bit()?;

    let mut out = Vec::with_capacity(len.min(1 << 16));
    match scheme {
        0 | 2 => {
            let width = reader.read_bits_unsigned(TAG_WIDTH_BITS)? as u8;
            let mut last = 0i64;
            for _ in 0..len {
                let num = if nonneg {
                    reader.read_bits_unsigned(width)? as i64
                } else {
                    reader.read_bits_signed(width)?
                };
                if scheme == 2 {
                    last = last.wrapping_add(num);
                    out.push(last);
                } else {
                    out.push(num);
                }
            }
        }
        1 | 3 => {
            let mut last = 0i64;
            for _ in 0..len {
                let num = if nonneg {
                    reader.read_tagged_unsigned()?.0 as i64
                } else {
                    reader.read_tagged_signed()?
                };
                if scheme == 3 {
                    last = last.wrapping_add(num);
                    out.push(last);
                } else {
                    out.push(num);
                }
            }
        }
        _ => unreachable!("2-bit scheme id"),
    }
    Ok(out)
}
