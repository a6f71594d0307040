use thiserror::Error;

/// Errors surfaced by the Oma Helen client. Nothing is retried and nothing
/// is swallowed; callers are expected to present kind and message verbatim.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A step of the login choreography failed: transport error, unexpected
    /// HTML shape, or a missing access token at the end. The message names
    /// the failing step.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The identity provider kept redirecting past the hop budget.
    #[error("Authentication failed: more than {0} redirects")]
    TooManyRedirects(u32),

    /// The session token is older than the validity heuristic allows.
    /// Raised lazily on the first use after expiry; log in again.
    #[error("Session has expired - log in again")]
    SessionExpired,

    /// No login has been performed on this client yet.
    #[error("Not logged in")]
    NotLoggedIn,

    /// A data endpoint answered with a non-2xx status.
    #[error("API request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    /// A data endpoint answered 2xx but the body did not match the
    /// expected shape.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The contract list has no contract that is currently active.
    #[error("No active contract found")]
    NoActiveContract,

    /// An explicitly selected delivery site does not belong to any active
    /// contract.
    #[error("Delivery site {0} does not belong to any active contract")]
    InvalidDeliverySite(String),

    /// Contract data is missing entirely where a figure lookup requires it.
    #[error("Missing contract data: {0}")]
    MissingContractData(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data around
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            // Back off to a char boundary so multibyte text never splits.
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..cut],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::Http {
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status, 502);
                assert!(body.len() < 600);
                assert!(body.contains("truncated"));
            }
            _ => panic!("expected Http variant"),
        }
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        // 499 ASCII bytes followed by two-byte chars puts the cut point
        // mid-character; truncation must back off instead of panicking.
        let body = format!("{}{}", "x".repeat(499), "ä".repeat(600));
        let err = ApiError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status, 502);
                assert!(body.contains("truncated"));
                assert!(body.starts_with(&"x".repeat(499)));
            }
            _ => panic!("expected Http variant"),
        }
    }
}
