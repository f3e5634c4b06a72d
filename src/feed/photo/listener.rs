//! 信息流监听器回调接口

use crate::feed::photo::models::Photo;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// 信息流监听器（UI 层实现）
#[async_trait]
pub trait FeedListener: Send + Sync {
    /// 一次加载成功，参数为本次需要渲染的照片
    async fn on_photos_changed(&self, new_photos: Vec<Photo>);

    /// 一次加载失败，参数为可读的失败原因
    async fn on_load_failed(&self, reason: String);

    /// 点赞状态已由服务端确认
    async fn on_like_status_changed(&self, _photo: Photo) {}
}

/// 默认空实现（无操作）
pub struct EmptyFeedListener;

#[async_trait]
impl FeedListener for EmptyFeedListener {
    async fn on_photos_changed(&self, _new_photos: Vec<Photo>) {
        // 默认不做任何处理
    }

    async fn on_load_failed(&self, _reason: String) {
        // 默认不做任何处理
    }
}

/// 监听器订阅句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// 监听器注册表：按订阅顺序分发事件
#[derive(Default)]
pub struct FeedListeners {
    next_id: AtomicU64,
    entries: RwLock<Vec<(ListenerId, Arc<dyn FeedListener>)>>,
}

impl FeedListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册监听器，返回用于取消订阅的句柄
    pub fn subscribe(&self, listener: Arc<dyn FeedListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut entries) = self.entries.write() {
            entries.push((id, listener));
        }
        id
    }

    /// 取消订阅，返回是否找到了对应监听器
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|(entry_id, _)| *entry_id != id);
                entries.len() != before
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前监听器快照（分发期间不持有锁）
    fn snapshot(&self) -> Vec<Arc<dyn FeedListener>> {
        self.entries
            .read()
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) async fn notify_photos_changed(&self, new_photos: &[Photo]) {
        for listener in self.snapshot() {
            listener.on_photos_changed(new_photos.to_vec()).await;
        }
    }

    pub(crate) async fn notify_load_failed(&self, reason: &str) {
        for listener in self.snapshot() {
            listener.on_load_failed(reason.to_string()).await;
        }
    }

    pub(crate) async fn notify_like_status_changed(&self, photo: &Photo) {
        for listener in self.snapshot() {
            listener.on_like_status_changed(photo.clone()).await;
        }
    }
}
