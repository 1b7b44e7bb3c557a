use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::entities::offer::{self, DiscountType};

/// Discount a single discount definition yields against `base`.
///
/// Percentage discounts are rounded to two decimal places and capped at
/// `max_discount_value` when one is set. Fixed discounts never exceed the
/// base amount, so a discounted price can reach zero but never go negative.
pub fn discount_amount(
    discount_type: DiscountType,
    discount_value: Decimal,
    max_discount_value: Option<Decimal>,
    base: Decimal,
) -> Decimal {
    let raw = match discount_type {
        DiscountType::Percentage => {
            let pct = (base * discount_value / Decimal::from(100)).round_dp(2);
            match max_discount_value {
                Some(cap) => pct.min(cap),
                None => pct,
            }
        }
        DiscountType::Fixed => discount_value.min(base),
    };
    raw.max(Decimal::ZERO)
}

/// Effective unit price of a product given its own offer and its category's
/// offer. The larger absolute discount wins; on a tie the product offer does.
pub fn discounted_price(
    base: Decimal,
    product_offer: Option<&offer::Model>,
    category_offer: Option<&offer::Model>,
    now: DateTime<Utc>,
) -> Decimal {
    let from_product = product_offer
        .filter(|o| o.is_eligible(now))
        .map(|o| discount_amount(o.discount_type, o.discount_value, o.max_discount_value, base))
        .unwrap_or(Decimal::ZERO);
    let from_category = category_offer
        .filter(|o| o.is_eligible(now))
        .map(|o| discount_amount(o.discount_type, o.discount_value, o.max_discount_value, base))
        .unwrap_or(Decimal::ZERO);

    let winning = if from_category > from_product {
        from_category
    } else {
        from_product
    };
    (base - winning).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use test_case::test_case;
    use uuid::Uuid;

    fn offer_with(
        discount_type: DiscountType,
        value: Decimal,
        cap: Option<Decimal>,
    ) -> offer::Model {
        let now = Utc::now();
        offer::Model {
            id: Uuid::new_v4(),
            name: "test offer".into(),
            offer_kind: offer::OfferKind::Product,
            discount_type,
            discount_value: value,
            max_discount_value: cap,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test_case(DiscountType::Percentage, dec!(50), Some(dec!(100)), dec!(1000), dec!(100); "percentage is capped")]
    #[test_case(DiscountType::Percentage, dec!(33), None, dec!(99.99), dec!(33.00); "percentage rounds to two places")]
    #[test_case(DiscountType::Percentage, dec!(10), None, dec!(0), dec!(0); "percentage of zero base")]
    #[test_case(DiscountType::Fixed, dec!(150), None, dec!(80), dec!(80); "fixed never exceeds base")]
    #[test_case(DiscountType::Fixed, dec!(25), None, dec!(80), dec!(25); "fixed below base applies fully")]
    #[test_case(DiscountType::Fixed, dec!(-5), None, dec!(80), dec!(0); "negative value yields nothing")]
    fn discount_amount_matrix(
        discount_type: DiscountType,
        value: Decimal,
        cap: Option<Decimal>,
        base: Decimal,
        expected: Decimal,
    ) {
        assert_eq!(discount_amount(discount_type, value, cap, base), expected);
    }

    #[test]
    fn larger_discount_wins() {
        let product = offer_with(DiscountType::Fixed, dec!(20), None);
        let category = offer_with(DiscountType::Fixed, dec!(50), None);
        let price = discounted_price(dec!(200), Some(&product), Some(&category), Utc::now());
        assert_eq!(price, dec!(150));
    }

    #[test]
    fn tie_goes_to_product_offer() {
        let product = offer_with(DiscountType::Fixed, dec!(30), None);
        let category = offer_with(DiscountType::Percentage, dec!(15), None);
        // Both yield 30 on a base of 200.
        let price = discounted_price(dec!(200), Some(&product), Some(&category), Utc::now());
        assert_eq!(price, dec!(170));
    }

    #[test]
    fn expired_offer_is_ignored() {
        let mut expired = offer_with(DiscountType::Fixed, dec!(50), None);
        expired.valid_until = Utc::now() - Duration::hours(1);
        let price = discounted_price(dec!(200), Some(&expired), None, Utc::now());
        assert_eq!(price, dec!(200));
    }

    #[test]
    fn inactive_offer_is_ignored() {
        let mut inactive = offer_with(DiscountType::Percentage, dec!(10), None);
        inactive.is_active = false;
        let price = discounted_price(dec!(100), Some(&inactive), None, Utc::now());
        assert_eq!(price, dec!(100));
    }
}
