//! Regression-line codec.
//!
//! Payload: `[n: varint][slope_numerator: varint][intercept: zigzag varint]
//! [residual_bits: u8][packed zigzag residuals]`, `[0]` when empty and
//! `[1][value: varint]` for a single element.
//!
//! The prediction for position `pos` is
//! `intercept + round(slope_numerator * pos / n)`, evaluated with integer
//! arithmetic only, so encoder and decoder agree on every platform. The fit is
//! quantized to `slope_numerator` before any residual is computed.

use super::compact::PackedArray;
use crate::index::error::{IndexError, IndexResult};
use crate::utils::{
    ByteReader, SharedBytes, bits_needed, encode_varint, zigzag_decode, zigzag_encode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Line {
    n: u64,
    slope_num: u64,
    intercept: i64,
}

impl Line {
    #[inline]
    fn predict(&self, pos: u64) -> i128 {
        let n = self.n as u128;
        let scaled = (2 * self.slope_num as u128 * pos as u128 + n) / (2 * n);
        self.intercept as i128 + scaled as i128
    }

    /// Least-squares slope over `(pos, value)`, scaled by `n` and rounded
    fn fit<T: Copy + Into<u64>>(values: &[T]) -> u64 {
        let n = values.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = values.iter().map(|&v| Into::<u64>::into(v) as f64).sum::<f64>() / n;
        let sxy: f64 = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64 - mean_x) * (Into::<u64>::into(v) as f64 - mean_y))
            .sum();
        let sxx = n * (n * n - 1.0) / 12.0;
        let slope = sxy / sxx;
        if slope.is_finite() && slope > 0.0 {
            // `as` saturates at u64::MAX
            (slope * n).round() as u64
        } else {
            0
        }
    }
}

#[derive(Clone, Debug)]
enum Model {
    Empty,
    Single(u64),
    Fitted { line: Line, residuals: PackedArray },
}

/// Monotonic `u64` sequence stored as a regression line plus residuals
///
/// Used directly for store offset tables and wrapped by [`RegLineIndex`] for
/// item sets.
#[derive(Clone, Debug)]
pub struct RegLineArray {
    model: Model,
    len: u32,
    payload_len: usize,
}

impl RegLineArray {
    pub fn encode<T: Copy + Into<u64>>(values: &[T], out: &mut Vec<u8>) -> IndexResult<()> {
        let n = u32::try_from(values.len())
            .map_err(|_| IndexError::Overflow(format!("{} elements", values.len())))?;
        encode_varint(n as u64, out);
        match values {
            [] => return Ok(()),
            [only] => {
                encode_varint((*only).into(), out);
                return Ok(());
            }
            _ => {}
        }

        let mut line = Line {
            n: n as u64,
            slope_num: Line::fit(values),
            intercept: 0,
        };
        let deltas: Vec<i128> = values
            .iter()
            .enumerate()
            .map(|(pos, &v)| Into::<u64>::into(v) as i128 - line.predict(pos as u64))
            .collect();
        let min = deltas.iter().copied().min().unwrap_or(0);
        let max = deltas.iter().copied().max().unwrap_or(0);
        let centre = min + (max - min) / 2;
        line.intercept = i64::try_from(centre)
            .map_err(|_| IndexError::Overflow(format!("regression intercept {centre}")))?;

        let residuals = deltas
            .iter()
            .map(|&d| {
                let r = d - centre;
                i64::try_from(r)
                    .map(zigzag_encode)
                    .map_err(|_| IndexError::Overflow(format!("regression residual {r}")))
            })
            .collect::<IndexResult<Vec<u64>>>()?;
        let bits = bits_needed(residuals.iter().copied().max().unwrap_or(0));

        encode_varint(line.slope_num, out);
        encode_varint(zigzag_encode(line.intercept), out);
        out.push(bits);
        PackedArray::write(residuals, bits, out);
        Ok(())
    }

    pub fn parse(payload: &SharedBytes) -> IndexResult<Self> {
        let mut reader = ByteReader::new(payload);
        let len = reader.varint_u32("regline size")?;
        let model = match len {
            0 => Model::Empty,
            1 => Model::Single(reader.varint("regline value")?),
            _ => {
                let slope_num = reader.varint("regline slope")?;
                let intercept = zigzag_decode(reader.varint("regline intercept")?);
                let bits = reader.u8("regline residual width")?;
                if !(1..=64).contains(&bits) {
                    return Err(IndexError::corrupt(format!("regline residual width {bits}")));
                }
                let offset = reader.skip(
                    crate::utils::packed_len(len as usize, bits),
                    "regline residuals",
                )?;
                Model::Fitted {
                    line: Line {
                        n: len as u64,
                        slope_num,
                        intercept,
                    },
                    residuals: PackedArray::parse(payload, offset, bits, len as usize)?,
                }
            }
        };
        Ok(Self {
            model,
            len,
            payload_len: reader.position(),
        })
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    pub fn residual_bits(&self) -> u8 {
        match &self.model {
            Model::Fitted { residuals, .. } => residuals.bits(),
            _ => 0,
        }
    }

    /// Reconstructed value at `pos` before range checking; `pos < len`
    #[inline]
    pub(crate) fn raw(&self, pos: u32) -> i128 {
        match &self.model {
            Model::Empty => 0,
            Model::Single(value) => *value as i128,
            Model::Fitted { line, residuals } => {
                line.predict(pos as u64) + zigzag_decode(residuals.get(pos as usize)) as i128
            }
        }
    }

    pub fn get(&self, pos: u32) -> IndexResult<u64> {
        if pos >= self.len {
            return Err(IndexError::out_of_bounds(pos, self.len));
        }
        let value = self.raw(pos);
        u64::try_from(value)
            .map_err(|_| IndexError::corrupt(format!("regline value {value} at {pos}")))
    }
}

/// Item set stored with the regression-line codec
#[derive(Clone, Debug)]
pub struct RegLineIndex {
    array: RegLineArray,
}

impl RegLineIndex {
    pub fn encode(values: &[u32], out: &mut Vec<u8>) -> IndexResult<()> {
        RegLineArray::encode(values, out)
    }

    /// Parse a payload and check every reconstructed value
    ///
    /// Fails with `CorruptData` unless the values strictly ascend inside the
    /// `u32` range, so the accessors below never see an out-of-range value.
    pub fn parse(payload: &SharedBytes) -> IndexResult<Self> {
        let array = RegLineArray::parse(payload)?;
        let mut prev = -1i128;
        for pos in 0..array.len() {
            let value = array.raw(pos);
            if value <= prev || value > u32::MAX as i128 {
                return Err(IndexError::corrupt(format!(
                    "regline value {value} at {pos} after {prev}"
                )));
            }
            prev = value;
        }
        Ok(Self { array })
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.array.len()
    }

    pub fn payload_len(&self) -> usize {
        self.array.payload_len()
    }

    pub fn residual_bits(&self) -> u8 {
        self.array.residual_bits()
    }

    /// Value at `pos`, which must be below `len`
    #[inline]
    pub fn get(&self, pos: u32) -> u32 {
        self.array.raw(pos) as u32
    }

    pub fn iter(&self) -> RegLineIter<'_> {
        RegLineIter {
            array: &self.array,
            pos: 0,
        }
    }

    pub fn find(&self, value: u32) -> Option<u32> {
        super::search_sorted(self.len(), value, |pos| self.get(pos))
    }
}

#[derive(Clone, Debug)]
pub struct RegLineIter<'a> {
    array: &'a RegLineArray,
    pos: u32,
}

impl Iterator for RegLineIter<'_> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.pos >= self.array.len() {
            return None;
        }
        // In range: parse checked every value
        let value = self.array.raw(self.pos) as u32;
        self.pos += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.array.len() - self.pos) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for RegLineIter<'_> {}
