//! Authentication: token storage, session state and permission checks

pub mod context;
pub mod jwt;
pub mod models;
pub mod store;

pub use context::{AuthContext, AuthState, Session};
pub use jwt::{inspect_token, Claims};
pub use models::{LoginResponse, TokenPair, User, UserRole};
pub use store::{FileTokenStore, MemoryTokenStore, StoredSession, TokenStore};
