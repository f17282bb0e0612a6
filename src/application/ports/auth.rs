//! Auth Context Port - 身份会话抽象
//!
//! 身份提供方是外部协作者，这里只读取 `{user_id, is_ready}`

/// Auth Context
///
/// 在 `is_ready()` 且存在 `user_id()` 之前，不允许提交任务或打开推送通道
pub trait AuthContext: Send + Sync {
    /// 当前登录用户 ID
    fn user_id(&self) -> Option<String>;

    /// 身份信息已加载且已登录
    fn is_ready(&self) -> bool;

    /// 已就绪时返回用户 ID
    fn ready_user(&self) -> Option<String> {
        if self.is_ready() {
            self.user_id()
        } else {
            None
        }
    }
}
