//! Order number generation.

use chrono::Utc;
use rand::Rng;

use bloom_core::OrderNumber;

/// Source of fresh order numbers.
pub trait OrderNumberSource: Send + Sync {
    /// Produce the next candidate order number.
    fn next_number(&self) -> OrderNumber;
}

/// `ORD-<unix-millis>-<random 0..999>` from the wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampOrderNumbers;

impl OrderNumberSource for TimestampOrderNumbers {
    fn next_number(&self) -> OrderNumber {
        let disambiguator = rand::rng().random_range(0..=OrderNumber::MAX_SUFFIX);
        OrderNumber::generate(Utc::now(), disambiguator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_numbers_are_well_formed() {
        let number = TimestampOrderNumbers.next_number();
        assert!(number.as_str().starts_with(OrderNumber::PREFIX));
        assert!(number.suffix() <= OrderNumber::MAX_SUFFIX);
        assert!(OrderNumber::parse(number.as_str()).is_ok());
    }
}
