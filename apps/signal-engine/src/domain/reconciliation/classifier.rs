//! Mismatch classification.
//!
//! Broker is authoritative for quantity held; the store is authoritative for
//! intent.

use rust_decimal::Decimal;

use super::record::MismatchKind;

/// Classifies store/broker disagreements.
pub struct MismatchClassifier;

impl MismatchClassifier {
    /// Compare a stored position quantity with the broker's holding.
    ///
    /// `broker_quantity` of `None` means the symbol was missing from the broker
    /// response, which counts as zero.
    #[must_use]
    pub fn classify_position(
        store_quantity: Decimal,
        broker_quantity: Option<Decimal>,
    ) -> Option<MismatchKind> {
        let broker = broker_quantity.unwrap_or(Decimal::ZERO).abs();
        let store = store_quantity.abs();

        if store > Decimal::ZERO && broker.is_zero() {
            Some(MismatchKind::OrphanPosition)
        } else if store > Decimal::ZERO && store != broker {
            Some(MismatchKind::QuantityDrift)
        } else {
            None
        }
    }

    /// Classify an expected broker order by whether the broker knows it.
    #[must_use]
    pub const fn classify_order(found_at_broker: bool) -> Option<MismatchKind> {
        if found_at_broker {
            None
        } else {
            Some(MismatchKind::OrphanOrder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(dec!(5), Some(Decimal::ZERO), Some(MismatchKind::OrphanPosition) ; "broker flat")]
    #[test_case(dec!(5), None, Some(MismatchKind::OrphanPosition) ; "missing from response")]
    #[test_case(dec!(5), Some(dec!(3)), Some(MismatchKind::QuantityDrift) ; "partial close")]
    #[test_case(dec!(5), Some(dec!(-5)), None ; "short reported signed")]
    #[test_case(dec!(5), Some(dec!(5)), None ; "in sync")]
    #[test_case(Decimal::ZERO, Some(dec!(2)), None ; "no stored quantity")]
    fn position_classification(
        store: Decimal,
        broker: Option<Decimal>,
        expected: Option<MismatchKind>,
    ) {
        assert_eq!(MismatchClassifier::classify_position(store, broker), expected);
    }

    #[test]
    fn missing_order_is_orphan() {
        assert_eq!(
            MismatchClassifier::classify_order(false),
            Some(MismatchKind::OrphanOrder)
        );
        assert_eq!(MismatchClassifier::classify_order(true), None);
    }
}
