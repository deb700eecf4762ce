//! Optional caller identity: bearer JWTs verified against the issuer's JWKS.

mod jwks;
mod model;
mod validator;

pub use jwks::JwksClient;
pub use model::AuthenticatedUser;
pub use validator::JwtValidator;
