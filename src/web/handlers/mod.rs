pub mod orders;
pub mod paypal;
