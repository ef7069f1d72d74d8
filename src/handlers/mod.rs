// handlers/mod.rs - one module per resource
//
// Which guard runs in front of each handler is decided in `routes`, by tier:
// public (no token) -> protected (valid token) -> elevated (valid token + admin role).
pub mod carts;
pub mod menu;
pub mod payments;
pub mod reviews;
pub mod stats;
pub mod system;
pub mod token;
pub mod users;

mod utils;
