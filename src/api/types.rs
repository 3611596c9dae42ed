//! Shared types for the API layer: context, session registry, token
//! helpers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::chat::ChatService;
use crate::models::Identity;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes, middleware and the WebSocket
/// upgrade path.
#[derive(Clone)]
pub struct ApiContext {
    pub chat: Arc<ChatService>,
    pub sessions: Arc<Mutex<SessionRegistry>>,
}

impl ApiContext {
    pub fn new(chat: Arc<ChatService>) -> Self {
        Self {
            chat,
            sessions: Arc::new(Mutex::new(SessionRegistry::new())),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Session registry — bearer token → identity
// ═══════════════════════════════════════════════════════════

/// In-memory projection of the authentication collaborator's sessions.
/// Tokens are stored as SHA-256 hashes only. Token lifecycle (issuance,
/// expiry, rotation) belongs to the collaborator; this registry just
/// answers "who is this bearer".
pub struct SessionRegistry {
    tokens: HashMap<[u8; 32], Identity>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
        }
    }

    /// Register a bearer token for an identity. Called by the
    /// authentication collaborator when it issues a session.
    pub fn register(&mut self, token: &str, identity: Identity) {
        self.tokens.insert(hash_token(token), identity);
    }

    /// Resolve a bearer token to its identity.
    pub fn resolve(&self, token: &str) -> Option<Identity> {
        self.tokens.get(&hash_token(token)).cloned()
    }

    /// Drop a session. Returns whether the token was known.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.tokens.remove(&hash_token(token)).is_some()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
