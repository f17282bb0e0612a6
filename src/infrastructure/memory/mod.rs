//! Memory Layer - In-Memory State Management
//!
//! 实现 AuthContext，保存外部身份提供方同步过来的登录状态

mod auth_session;

pub use auth_session::InMemoryAuthSession;
