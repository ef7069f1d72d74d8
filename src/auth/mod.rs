pub mod roles;
pub mod token;

pub use roles::{Role, RoleLookupError, RoleStore};
pub use token::{IdentityClaim, TokenError, TokenService};
