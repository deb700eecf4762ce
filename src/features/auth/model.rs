/// Identity attached to a request by the bearer-token middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Subject claim of the validated token; recorded as the upload owner
    pub sub: String,
}
