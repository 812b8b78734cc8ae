//! CSRF tokens bound to a session

use crate::crypto::{constant_time_eq, generate_token, DEFAULT_TOKEN_BYTES};
use crate::error::Result;
use crate::session::SessionStore;

/// Session key holding the CSRF token
pub const CSRF_SESSION_KEY: &str = "csrf_token";

/// Return the session's CSRF token, creating it on first use
///
/// The token is generated once per session and returned unchanged afterwards.
pub fn csrf_token(session: &dyn SessionStore) -> Result<String> {
    session.get_or_try_insert_with(CSRF_SESSION_KEY, &mut || {
        generate_token(DEFAULT_TOKEN_BYTES)
    })
}

/// True iff the session holds a token equal to `candidate`
pub fn verify_csrf_token(session: &dyn SessionStore, candidate: &str) -> bool {
    match session.get(CSRF_SESSION_KEY) {
        Some(stored) if !stored.is_empty() => constant_time_eq(&stored, candidate),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_token_stable_per_session() {
        let session = MemorySession::new();
        let first = csrf_token(&session).unwrap();
        let second = csrf_token(&session).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), DEFAULT_TOKEN_BYTES * 2);
    }

    #[test]
    fn test_tokens_differ_across_sessions() {
        let a = csrf_token(&MemorySession::new()).unwrap();
        let b = csrf_token(&MemorySession::new()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify() {
        let session = MemorySession::new();
        let token = csrf_token(&session).unwrap();

        assert!(verify_csrf_token(&session, &token));
        assert!(!verify_csrf_token(&session, ""));
        assert!(!verify_csrf_token(&session, &token[..token.len() - 1]));
        assert!(!verify_csrf_token(&session, &token.to_uppercase()));
    }

    #[test]
    fn test_verify_without_token() {
        let session = MemorySession::new();
        assert!(!verify_csrf_token(&session, ""));
        assert!(!verify_csrf_token(&session, "deadbeef"));
    }

    #[test]
    fn test_verify_with_empty_stored_token() {
        let session = MemorySession::new();
        session.set(CSRF_SESSION_KEY, String::new());
        assert!(!verify_csrf_token(&session, ""));
    }

    #[test]
    fn test_concurrent_first_use_yields_one_token() {
        let session = Arc::new(MemorySession::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || csrf_token(&*session).unwrap())
            })
            .collect();

        let tokens: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(tokens.iter().all(|t| t == &tokens[0]));
    }
}
