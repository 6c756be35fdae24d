pub mod gate;
pub mod identity;
pub mod policy;

pub use gate::{MaybeIdentity, Operator};
pub use identity::{Identity, IdentityVerifier};
pub use policy::AuthorizationPolicy;
