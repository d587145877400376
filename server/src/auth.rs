//! HTTP basic authentication against credentials handed in at startup.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rocket::{
    Request,
    http::Status,
    request::{self, FromRequest},
};
use tracing::{debug, warn};

/// Accepted `user -> password` pairs.
#[derive(Clone, Default)]
pub struct Credentials {
    users: HashMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Credentials {
    /// Parses comma separated `user:password` pairs. Entries without a colon are skipped.
    pub fn parse(users: &str) -> Self {
        let users = users
            .split(',')
            .filter_map(|pair| {
                let (user, password) = pair.trim().split_once(':')?;
                (!user.is_empty()).then(|| (user.to_string(), password.to_string()))
            })
            .collect();

        Self { users }
    }

    pub fn verify(&self, user: &str, password: &str) -> bool {
        self.users.get(user).is_some_and(|expected| expected == password)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    Malformed,
    Rejected,
}

/// Decodes the value of an `Authorization: Basic ...` header into user and password.
pub fn decode_basic(header: &str) -> Result<(String, String), AuthError> {
    let (scheme, encoded) = header.trim().split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::Malformed);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
    let (user, password) = decoded.split_once(':').ok_or(AuthError::Malformed)?;

    Ok((user.to_string(), password.to_string()))
}

/// Request guard for routes that need a known user.
#[derive(Debug)]
pub struct AuthenticatedUser(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(credentials) = req.rocket().state::<Credentials>() else {
            warn!("No credentials configured, rejecting request");
            return request::Outcome::Error((Status::Unauthorized, AuthError::Rejected));
        };

        let Some(header) = req.headers().get_one("Authorization") else {
            return request::Outcome::Error((Status::Unauthorized, AuthError::Missing));
        };

        match decode_basic(header) {
            Ok((user, password)) if credentials.verify(&user, &password) => {
                request::Outcome::Success(AuthenticatedUser(user))
            }
            Ok((user, _)) => {
                debug!("Rejected credentials for user '{}'", user);
                request::Outcome::Error((Status::Unauthorized, AuthError::Rejected))
            }
            Err(err) => request::Outcome::Error((Status::Unauthorized, err)),
        }
    }
}
