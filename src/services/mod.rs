pub mod payment;

pub use payment::{PaymentGateway, PaymentIntent, PaymentError, StripeGateway};
