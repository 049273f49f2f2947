//! Domain models for orders and money.

mod money;
mod order;

pub use money::{CURRENCY, format_money, round_money, totals_match};
pub use order::{
    FulfillmentStatus, LineItem, MAX_NOTE_LENGTH, Order, OrderUpdate, PaymentProvider,
    PaymentStatus, ShippingAddress, normalize_email,
};
