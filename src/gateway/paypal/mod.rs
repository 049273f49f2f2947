//! PayPal REST payments integration.

mod client;
mod gateway;

#[cfg(test)]
mod tests;

pub use gateway::PayPalGateway;
