//! In-Memory Auth Session Implementation

use std::sync::{Arc, PoisonError, RwLock};

use crate::application::ports::AuthContext;

#[derive(Debug, Clone, Default)]
struct SessionState {
    loaded: bool,
    user_id: Option<String>,
}

/// 内存身份会话
///
/// 外部身份提供方加载完成后调用 `sign_in` / `sign_out` 同步状态
#[derive(Debug, Default)]
pub struct InMemoryAuthSession {
    state: RwLock<SessionState>,
}

impl InMemoryAuthSession {
    /// 身份信息尚未加载
    pub fn new() -> Self {
        Self::default()
    }

    /// 已加载且已登录
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(user_id);
        session
    }

    /// 已加载但未登录
    pub fn signed_out() -> Self {
        let session = Self::new();
        session.sign_out();
        session
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        tracing::info!(user_id = %user_id, "Signed in");
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.loaded = true;
        state.user_id = Some(user_id);
    }

    pub fn sign_out(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(user_id) = state.user_id.take() {
            tracing::info!(user_id = %user_id, "Signed out");
        }
        state.loaded = true;
    }
}

impl AuthContext for InMemoryAuthSession {
    fn user_id(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_id
            .clone()
    }

    fn is_ready(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.loaded && state.user_id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_loaded_is_not_ready() {
        let session = InMemoryAuthSession::new();
        assert!(!session.is_ready());
        assert_eq!(session.ready_user(), None);
    }

    #[test]
    fn test_sign_in_and_out() {
        let session = InMemoryAuthSession::signed_out();
        assert!(!session.is_ready());

        session.sign_in("user-1");
        assert!(session.is_ready());
        assert_eq!(session.ready_user().as_deref(), Some("user-1"));

        session.sign_out();
        assert!(!session.is_ready());
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn test_blank_user_is_not_ready() {
        let session = InMemoryAuthSession::signed_in("  ");
        assert!(!session.is_ready());
    }
}
