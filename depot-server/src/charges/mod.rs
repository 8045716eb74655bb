//! Platform charge calculation
//!
//! Pure tiered lookup from order value to the fee deducted from the
//! branch wallet on delivery completion. Upper bounds are inclusive.
//!
//! | Order total | Charge |
//! |-------------|--------|
//! | ≤ 1000      | 2      |
//! | ≤ 1999      | 4      |
//! | ≤ 2999      | 6      |
//! | > 2999      | 8      |

use rust_decimal::Decimal;

/// Compute the platform charge for an order total
///
/// Pure, no side effects, no errors. Amounts are in the same currency
/// unit as the order total.
pub fn platform_charge(order_total: Decimal) -> Decimal {
    if order_total <= Decimal::from(1000) {
        Decimal::from(2)
    } else if order_total <= Decimal::from(1999) {
        Decimal::from(4)
    } else if order_total <= Decimal::from(2999) {
        Decimal::from(6)
    } else {
        Decimal::from(8)
    }
}
