use chrono::NaiveDate;

use super::error::NfseError;

/// Per-sheet RPS number sequence.
///
/// Starts at the first row's declared `rps` value (or 1) and hands out
/// strictly increasing numbers.
#[derive(Debug, Clone)]
pub struct RpsSequence {
    next_number: u64,
}

impl RpsSequence {
    /// Create a new sequence starting at 1.
    pub fn new() -> Self {
        Self { next_number: 1 }
    }

    /// Create a sequence continuing from a given number.
    pub fn starting_at(next_number: u64) -> Self {
        Self { next_number }
    }

    /// Seed from the first row's declared number (0 included), falling back
    /// to 1 when the row declares none.
    pub fn from_declared(declared: Option<u64>) -> Self {
        declared.map_or_else(Self::new, Self::starting_at)
    }

    /// Hand out the next RPS number.
    pub fn next_number(&mut self) -> Result<u64, NfseError> {
        let num = self.next_number;
        self.next_number = num
            .checked_add(1)
            .ok_or_else(|| NfseError::Numbering("RPS sequence exhausted".into()))?;
        Ok(num)
    }

    /// Preview the next number without consuming it.
    pub fn peek(&self) -> u64 {
        self.next_number
    }
}

impl Default for RpsSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Batch identifier: `YYYYMMDD` followed by the RPS number, read as an integer.
///
/// Only unique per (date, RPS number) pair.
pub fn numero_lote(date: NaiveDate, rps_number: u64) -> Result<u64, NfseError> {
    let digits = format!("{}{}", date.format("%Y%m%d"), rps_number);
    digits.parse::<u64>().map_err(|e| {
        NfseError::Numbering(format!("batch number {digits} does not fit in 64 bits: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sequential_numbering() {
        let mut seq = RpsSequence::new();
        assert_eq!(seq.next_number().unwrap(), 1);
        assert_eq!(seq.next_number().unwrap(), 2);
        assert_eq!(seq.next_number().unwrap(), 3);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut seq = RpsSequence::starting_at(40);
        assert_eq!(seq.peek(), 40);
        assert_eq!(seq.peek(), 40);
        assert_eq!(seq.next_number().unwrap(), 40);
        assert_eq!(seq.peek(), 41);
    }

    #[test]
    fn declared_seed() {
        assert_eq!(RpsSequence::from_declared(Some(120)).peek(), 120);
        assert_eq!(RpsSequence::from_declared(None).peek(), 1);
        assert_eq!(RpsSequence::from_declared(Some(0)).peek(), 0);
    }

    #[test]
    fn exhausted_sequence_errors() {
        let mut seq = RpsSequence::starting_at(u64::MAX);
        assert!(seq.next_number().is_err());
    }

    #[test]
    fn batch_number_concatenates_date_and_rps() {
        assert_eq!(numero_lote(date(2024, 3, 7), 15).unwrap(), 2024030715);
        assert_eq!(numero_lote(date(2024, 12, 31), 1).unwrap(), 202412311);
    }

    #[test]
    fn batch_number_overflow() {
        assert!(numero_lote(date(2024, 1, 1), 99_999_999_999_999).is_err());
    }
}
