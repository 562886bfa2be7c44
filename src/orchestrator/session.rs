use time::{Duration, OffsetDateTime};

/// The identity service does not return an expiry, so assume a fixed window.
pub const SESSION_TTL: Duration = Duration::hours(24);
/// Re-authenticate this long before the assumed expiry.
pub const EXPIRY_MARGIN: Duration = Duration::seconds(60);

/// Cached identity session.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    None,
    Valid {
        token: String,
        expires_at: OffsetDateTime,
    },
}

impl Session {
    pub fn issued(token: String, now: OffsetDateTime) -> Self {
        Session::Valid {
            token,
            expires_at: now + SESSION_TTL,
        }
    }

    /// The token, if the session is still usable at `now`.
    pub fn token_at(&self, now: OffsetDateTime) -> Option<&str> {
        match self {
            Session::Valid { token, expires_at } if now < *expires_at - EXPIRY_MARGIN => {
                Some(token)
            }
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        match self {
            Session::None => None,
            Session::Valid { expires_at, .. } => Some(*expires_at),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Session::None => f.write_str("Session::None"),
            Session::Valid { expires_at, .. } => f
                .debug_struct("Session::Valid")
                .field("expires_at", expires_at)
                .finish_non_exhaustive(),
        }
    }
}
