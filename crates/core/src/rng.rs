//! Seedable linear congruential generator shared by sequencing and reward rolls.
//! The stream is fixed by the constants below, so a seed replays identically on every platform.

use std::error::Error;
use std::fmt;

const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Returned when a draw is requested from a list or table with nothing to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyInputError;

impl fmt::Display for EmptyInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cannot draw from an empty input")
    }
}

impl Error for EmptyInputError {}

/// Folds a text seed into LCG state: `hash * 31 + code_unit`, wrapped to signed 32 bits,
/// absolute value taken.
pub fn fold_text_seed(text: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    hash.unsigned_abs()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prng {
    initial: u32,
    state: u32,
}

impl Prng {
    pub fn new(seed: u32) -> Self {
        Self { initial: seed, state: seed }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(fold_text_seed(text))
    }

    pub fn seed(&self) -> u32 {
        self.initial
    }

    /// Restores the generator to its initial seed.
    pub fn reset(&mut self) {
        self.state = self.initial;
    }

    pub fn next_float(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
        f64::from(self.state) / TWO_POW_32
    }

    /// Integer in `[min, max)`. A degenerate range yields `min`.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min) as f64;
        min + (self.next_float() * span).floor() as i64
    }

    pub fn next_bool(&mut self) -> bool {
        self.next_float() < 0.5
    }

    pub fn next_bool_with(&mut self, probability: f64) -> bool {
        self.next_float() < probability
    }

    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Result<&'a T, EmptyInputError> {
        if items.is_empty() {
            return Err(EmptyInputError);
        }
        let index = self.next_int(0, items.len() as i64) as usize;
        Ok(&items[index])
    }

    /// Picks an entry with probability proportional to its weight.
    pub fn weighted_choice<'a, T>(
        &mut self,
        entries: &'a [(T, u32)],
    ) -> Result<&'a T, EmptyInputError> {
        let total: u64 = entries.iter().map(|(_, weight)| u64::from(*weight)).sum();
        if total == 0 {
            return Err(EmptyInputError);
        }
        let mut roll = self.next_float() * total as f64;
        for (item, weight) in entries {
            let weight = f64::from(*weight);
            if roll < weight {
                return Ok(item);
            }
            roll -= weight;
        }
        // Float rounding can leave a sliver past the last bucket.
        entries
            .iter()
            .rev()
            .find(|(_, weight)| *weight > 0)
            .map(|(item, _)| item)
            .ok_or(EmptyInputError)
    }

    /// Fisher–Yates over a copy of `items`; the input is left untouched.
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut shuffled = items.to_vec();
        for i in (1..shuffled.len()).rev() {
            let j = (self.next_float() * (i + 1) as f64).floor() as usize;
            shuffled.swap(i, j);
        }
        shuffled
    }
}
