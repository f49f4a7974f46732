use rust_decimal::Decimal;

/// Coupon rule applied to the price snapshot at subscription creation.
pub trait CouponPricing: Send + Sync {
    fn apply(&self, code: &str, price: Decimal) -> Decimal;
}

/// Accepts any code and leaves the price unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiscount;

impl CouponPricing for NoDiscount {
    fn apply(&self, code: &str, price: Decimal) -> Decimal {
        tracing::debug!(coupon = %code, "No coupon rules configured, price unchanged");
        price
    }
}
