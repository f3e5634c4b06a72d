//! 信息流同步服务层
//!
//! 每次“加载下一页”都在三条路径中选择一条：直接读缓存、首屏对齐新发布的照片、
//! 或者向服务端请求下一页。任何时刻最多只有一个分页请求在进行中，
//! 每次完成的加载（成功或失败）恰好通知监听器一次。

use crate::feed::error::{ApiError, ApiResult};
use crate::feed::photo::api::PhotoFeedApi;
use crate::feed::photo::dao::PhotoDao;
use crate::feed::photo::listener::{FeedListener, FeedListeners, ListenerId};
use crate::feed::photo::models::{FeedSyncerConfig, Photo};
use crate::feed::token::TokenStorage;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

/// 会话状态（只存在于内存中）
#[derive(Default)]
struct SessionState {
    last_loaded_page: u32,
    is_initial_load_completed: bool,
    /// 单飞守卫：正在进行的加载任务
    in_flight: Option<AbortHandle>,
    /// 每次 reset 递增，旧任务完成时据此丢弃结果
    generation: u64,
}

/// 一次加载成功后的结果
struct LoadedPage {
    photos: Vec<Photo>,
    last_loaded_page: u32,
}

/// 信息流同步器
pub struct FeedSyncer {
    config: FeedSyncerConfig,
    /// 远程信息流接口
    api: Arc<dyn PhotoFeedApi>,
    /// 照片缓存 DAO
    photo_dao: PhotoDao,
    /// 令牌存储
    tokens: Arc<dyn TokenStorage>,
    /// 监听器注册表
    listeners: FeedListeners,
    state: Mutex<SessionState>,
}

impl FeedSyncer {
    /// 创建新的信息流同步器
    pub fn new(
        config: FeedSyncerConfig,
        api: Arc<dyn PhotoFeedApi>,
        photo_dao: PhotoDao,
        tokens: Arc<dyn TokenStorage>,
    ) -> Arc<Self> {
        info!(
            "[FeedSync] 创建信息流同步器，每页 {} 条",
            config.page_size
        );
        Arc::new(Self {
            config,
            api,
            photo_dao,
            tokens,
            listeners: FeedListeners::new(),
            state: Mutex::new(SessionState::default()),
        })
    }

    /// 注册监听器
    pub fn add_listener(&self, listener: Arc<dyn FeedListener>) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    /// 取消注册监听器
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// 照片缓存 DAO
    pub fn photo_dao(&self) -> &PhotoDao {
        &self.photo_dao
    }

    /// 最后一次成功加载的页码（0 表示尚未加载）
    pub fn last_loaded_page(&self) -> u32 {
        self.lock_state().last_loaded_page
    }

    /// 首屏加载是否已完成
    pub fn is_initial_load_completed(&self) -> bool {
        self.lock_state().is_initial_load_completed
    }

    /// 是否有加载任务在进行中
    pub fn is_loading(&self) -> bool {
        self.lock_state().in_flight.is_some()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // 状态只含简单字段，锁中毒时继续使用内部数据
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 加载下一页
    ///
    /// 已有加载在进行中时直接返回 `None`；否则在后台任务中执行加载并返回其句柄。
    pub fn fetch_photos_next_page(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut state = self.lock_state();
        if state.in_flight.is_some() {
            debug!("[FeedSync] 已有加载在进行中，忽略本次请求");
            return None;
        }

        let generation = state.generation;
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            this.run_load(generation).await;
        });
        state.in_flight = Some(handle.abort_handle());
        Some(handle)
    }

    /// 执行一次加载并收尾：更新会话状态、释放守卫、通知监听器
    async fn run_load(&self, generation: u64) {
        let (initial_completed, last_loaded_page) = {
            let state = self.lock_state();
            (state.is_initial_load_completed, state.last_loaded_page)
        };

        let outcome = if initial_completed {
            self.load_incremental_page(last_loaded_page).await
        } else {
            self.load_initial().await
        };

        {
            let mut state = self.lock_state();
            if state.generation != generation {
                debug!("[FeedSync] 会话已重置，丢弃过期的加载结果");
                return;
            }
            state.in_flight = None;
            if let Ok(page) = &outcome {
                state.last_loaded_page = page.last_loaded_page;
                state.is_initial_load_completed = true;
            }
        }

        match outcome {
            Ok(page) => {
                info!(
                    "[FeedSync] ✅ 加载完成，本次 {} 张照片，当前页: {}",
                    page.photos.len(),
                    page.last_loaded_page
                );
                self.listeners.notify_photos_changed(&page.photos).await;
            }
            Err(e) => {
                error!("[FeedSync] ❌ 加载失败: {}", e);
                self.listeners.notify_load_failed(&e.to_string()).await;
            }
        }
    }

    fn token(&self) -> ApiResult<String> {
        self.tokens.token().ok_or(ApiError::MissingToken)
    }

    /// 缓存条数对应的页数（向上取整）
    fn pages_for(&self, count: usize) -> u32 {
        let page_size = self.config.page_size.max(1) as usize;
        count.div_ceil(page_size) as u32
    }

    /// 首屏加载：缓存新鲜时直接使用缓存，否则拉取第一页并与缓存对齐
    async fn load_initial(&self) -> ApiResult<LoadedPage> {
        info!("[FeedSync] 🔄 开始首屏加载...");

        if !self.photo_dao.needs_cache_refresh().await {
            let cached = self.photo_dao.fetch_all_cached_photos().await;
            if !cached.is_empty() {
                info!("[FeedSync] 缓存仍然有效，直接使用 {} 张缓存照片", cached.len());
                let last_loaded_page = self.pages_for(cached.len());
                return Ok(LoadedPage {
                    photos: cached,
                    last_loaded_page,
                });
            }
            warn!("[FeedSync] 缓存标记为有效但读取为空，改为请求服务端");
        }

        let token = self.token()?;
        let first_page = self
            .api
            .fetch_photos(&token, 1, self.config.page_size)
            .await?;
        Ok(self.reconcile_first_page(first_page).await)
    }

    /// 新照片对齐：把服务端第一页中未缓存的照片插到缓存头部
    async fn reconcile_first_page(&self, first_page: Vec<Photo>) -> LoadedPage {
        let cached_count = self.photo_dao.get_cached_photos_count().await;

        if cached_count == 0 {
            info!(
                "[FeedSync] 本地无缓存，保存第一页 {} 张照片",
                first_page.len()
            );
            self.photo_dao.save_photos(&first_page, 0).await;
        } else {
            let mut new_items = Vec::new();
            let mut seen = HashSet::new();
            for photo in first_page.iter() {
                if seen.insert(photo.id.clone()) && !self.photo_dao.photo_exists(&photo.id).await {
                    new_items.push(photo.clone());
                }
            }

            if new_items.is_empty() {
                info!(
                    "[FeedSync] 信息流没有新照片，沿用 {} 张缓存照片",
                    cached_count
                );
            } else {
                info!(
                    "[FeedSync] 发现 {} 张新照片，缓存整体后移后插入头部",
                    new_items.len()
                );
                self.photo_dao.insert_photos_at_head(&new_items).await;
            }
        }

        let all = self.photo_dao.fetch_all_cached_photos().await;
        if all.is_empty() {
            // 缓存不可用时退化为直接展示服务端数据
            warn!("[FeedSync] 缓存不可读，直接使用服务端第一页");
            let last_loaded_page = self.pages_for(first_page.len()).max(1);
            return LoadedPage {
                photos: first_page,
                last_loaded_page,
            };
        }

        let last_loaded_page = self.pages_for(all.len());
        LoadedPage {
            photos: all,
            last_loaded_page,
        }
    }

    /// 后续分页：缓存中有这一页的数据就直接使用，否则请求服务端并写入缓存
    async fn load_incremental_page(&self, last_loaded_page: u32) -> ApiResult<LoadedPage> {
        let next_page = last_loaded_page + 1;
        let page_size = self.config.page_size;
        let start_position = i64::from(next_page - 1) * i64::from(page_size);

        let cached = self
            .photo_dao
            .get_cached_photos(start_position, page_size as usize)
            .await;
        if !cached.is_empty() {
            debug!(
                "[FeedSync] 第 {} 页命中缓存，{} 张照片",
                next_page,
                cached.len()
            );
            return Ok(LoadedPage {
                photos: cached,
                last_loaded_page: next_page,
            });
        }

        info!("[FeedSync] 📡 第 {} 页不在缓存中，请求服务端", next_page);
        let token = self.token()?;
        let photos = self.api.fetch_photos(&token, next_page, page_size).await?;
        self.photo_dao.save_photos(&photos, start_position).await;

        Ok(LoadedPage {
            photos,
            last_loaded_page: next_page,
        })
    }

    /// 修改点赞状态；成功后更新缓存并返回服务端确认的照片
    pub async fn change_like_status(&self, photo_id: &str, is_like: bool) -> ApiResult<Photo> {
        let token = self.token()?;
        let photo = match self.api.change_like(&token, photo_id, is_like).await {
            Ok(photo) => photo,
            Err(e) => {
                error!("[FeedSync] 修改照片 {} 点赞状态失败: {}", photo_id, e);
                return Err(e);
            }
        };

        self.photo_dao
            .update_photo_like_status(&photo.id, photo.is_liked)
            .await;
        self.listeners.notify_like_status_changed(&photo).await;
        Ok(photo)
    }

    /// 取消进行中的加载并重置分页状态（不影响缓存内容）
    pub fn reset(&self) {
        let mut state = self.lock_state();
        if let Some(handle) = state.in_flight.take() {
            info!("[FeedSync] 取消进行中的加载");
            handle.abort();
        }
        state.generation += 1;
        state.last_loaded_page = 0;
        state.is_initial_load_completed = false;
        info!("[FeedSync] 会话状态已重置");
    }

    /// 清空缓存并重置会话
    ///
    /// 先取消进行中的加载再删除，删除之后不会再有旧加载写入缓存。
    pub async fn clear_cache(&self) {
        self.reset();
        self.photo_dao.clear_cache().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::db::create_sqlite_pool_with_migration;
    use crate::feed::photo::models::fixtures::{ids, photo, photo_with_like};
    use crate::feed::token::MemoryTokenStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// 可编排的远程接口：按页返回预设数据，可选地在闸门打开前挂起
    #[derive(Default)]
    struct MockFeedApi {
        pages: Mutex<HashMap<u32, ApiResult<Vec<Photo>>>>,
        liked: Mutex<HashMap<String, ApiResult<Photo>>>,
        fetch_calls: Mutex<Vec<(u32, u32)>>,
        like_calls: AtomicUsize,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockFeedApi {
        fn gated() -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            (
                Self {
                    gate: Some(gate.clone()),
                    ..Self::default()
                },
                gate,
            )
        }

        fn set_page(&self, page: u32, result: ApiResult<Vec<Photo>>) {
            self.pages.lock().unwrap().insert(page, result);
        }

        fn set_like(&self, id: &str, result: ApiResult<Photo>) {
            self.liked.lock().unwrap().insert(id.to_string(), result);
        }

        fn fetched_pages(&self) -> Vec<u32> {
            self.fetch_calls
                .lock()
                .unwrap()
                .iter()
                .map(|(page, _)| *page)
                .collect()
        }
    }

    /// ApiError 不可 Clone，按变体重放预设结果
    fn replay<T: Clone>(result: &ApiResult<T>) -> ApiResult<T> {
        match result {
            Ok(value) => Ok(value.clone()),
            Err(ApiError::HttpStatus { status, body }) => Err(ApiError::HttpStatus {
                status: *status,
                body: body.clone(),
            }),
            Err(e) => Err(ApiError::Decode(e.to_string())),
        }
    }

    #[async_trait]
    impl PhotoFeedApi for MockFeedApi {
        async fn fetch_photos(
            &self,
            token: &str,
            page: u32,
            per_page: u32,
        ) -> ApiResult<Vec<Photo>> {
            assert_eq!(token, "token");
            self.fetch_calls.lock().unwrap().push((page, per_page));
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let pages = self.pages.lock().unwrap();
            pages.get(&page).map(replay).unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn change_like(
            &self,
            _token: &str,
            photo_id: &str,
            _is_like: bool,
        ) -> ApiResult<Photo> {
            self.like_calls.fetch_add(1, Ordering::SeqCst);
            let liked = self.liked.lock().unwrap();
            liked.get(photo_id).map(replay).unwrap_or(Err(ApiError::HttpStatus {
                status: 404,
                body: "Couldn't find Photo".to_string(),
            }))
        }
    }

    #[derive(Default)]
    struct RecordingListener {
        changed: Mutex<Vec<Vec<String>>>,
        failed: Mutex<Vec<String>>,
        liked: Mutex<Vec<Photo>>,
    }

    impl RecordingListener {
        fn events(&self) -> usize {
            self.changed.lock().unwrap().len() + self.failed.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FeedListener for RecordingListener {
        async fn on_photos_changed(&self, new_photos: Vec<Photo>) {
            self.changed.lock().unwrap().push(ids(&new_photos));
        }

        async fn on_load_failed(&self, reason: String) {
            self.failed.lock().unwrap().push(reason);
        }

        async fn on_like_status_changed(&self, photo: Photo) {
            self.liked.lock().unwrap().push(photo);
        }
    }

    struct Harness {
        syncer: Arc<FeedSyncer>,
        api: Arc<MockFeedApi>,
        listener: Arc<RecordingListener>,
    }

    async fn harness_with(api: MockFeedApi, page_size: u32) -> Harness {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:")
            .await
            .unwrap();
        let api = Arc::new(api);
        let syncer = FeedSyncer::new(
            FeedSyncerConfig { page_size },
            api.clone(),
            PhotoDao::new(pool),
            Arc::new(MemoryTokenStorage::new(Some("token".to_string()))),
        );
        let listener = Arc::new(RecordingListener::default());
        syncer.add_listener(listener.clone());
        Harness {
            syncer,
            api,
            listener,
        }
    }

    async fn harness(page_size: u32) -> Harness {
        harness_with(MockFeedApi::default(), page_size).await
    }

    fn photos(prefix: &str, n: usize) -> Vec<Photo> {
        (0..n).map(|i| photo(&format!("{}{}", prefix, i))).collect()
    }

    async fn load(h: &Harness) {
        h.syncer
            .fetch_photos_next_page()
            .expect("load should start")
            .await
            .unwrap();
    }

    /// 把缓存写成过期状态，强制首屏走对齐路径
    async fn expire_cache(h: &Harness) {
        let pool = h.syncer.photo_dao().db_for_tests();
        sqlx::query("UPDATE local_photos SET last_updated = 0")
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn initial_load_with_empty_cache_saves_first_page() {
        let h = harness(3).await;
        h.api.set_page(1, Ok(photos("p", 3)));

        load(&h).await;

        assert_eq!(h.api.fetched_pages(), vec![1]);
        assert_eq!(*h.listener.changed.lock().unwrap(), vec![ids(&photos("p", 3))]);
        assert_eq!(h.syncer.last_loaded_page(), 1);
        assert!(h.syncer.is_initial_load_completed());
        assert_eq!(
            ids(&h.syncer.photo_dao().fetch_all_cached_photos().await),
            vec!["p0", "p1", "p2"]
        );
    }

    #[tokio::test]
    async fn fresh_cache_is_served_without_network() {
        let h = harness(2).await;
        h.syncer.photo_dao().save_photos(&photos("c", 5), 0).await;

        load(&h).await;

        assert!(h.api.fetched_pages().is_empty());
        assert_eq!(
            *h.listener.changed.lock().unwrap(),
            vec![vec!["c0", "c1", "c2", "c3", "c4"]]
        );
        assert_eq!(h.syncer.last_loaded_page(), 3);
    }

    #[tokio::test]
    async fn reconciliation_splices_new_items_at_head() {
        let h = harness(3).await;
        h.syncer
            .photo_dao()
            .save_photos(&[photo("A"), photo("B"), photo("C")], 0)
            .await;
        expire_cache(&h).await;
        h.api
            .set_page(1, Ok(vec![photo("X"), photo("A"), photo("B")]));

        load(&h).await;

        let records = h.syncer.photo_dao().fetch_all_cached_records().await;
        let cached: Vec<(String, i64)> = records
            .iter()
            .map(|r| (r.photo.id.clone(), r.position))
            .collect();
        assert_eq!(
            cached,
            vec![
                ("X".to_string(), 0),
                ("A".to_string(), 1),
                ("B".to_string(), 2),
                ("C".to_string(), 3)
            ]
        );
        assert_eq!(
            *h.listener.changed.lock().unwrap(),
            vec![vec!["X", "A", "B", "C"]]
        );
        assert_eq!(h.syncer.last_loaded_page(), 2);
    }

    #[tokio::test]
    async fn reconciliation_without_new_items_keeps_cache() {
        let h = harness(3).await;
        h.syncer
            .photo_dao()
            .save_photos(&[photo("A"), photo("B"), photo("C")], 0)
            .await;
        expire_cache(&h).await;
        h.api.set_page(1, Ok(vec![photo("A"), photo("B")]));

        load(&h).await;

        assert_eq!(
            *h.listener.changed.lock().unwrap(),
            vec![vec!["A", "B", "C"]]
        );
        let records = h.syncer.photo_dao().fetch_all_cached_records().await;
        assert!(records.iter().all(|r| r.last_updated.timestamp_millis() == 0));
        assert_eq!(h.syncer.last_loaded_page(), 1);
    }

    #[tokio::test]
    async fn reconciliation_handles_more_new_items_than_a_page() {
        let h = harness(2).await;
        h.syncer
            .photo_dao()
            .save_photos(&[photo("A"), photo("B")], 0)
            .await;
        expire_cache(&h).await;
        h.api
            .set_page(1, Ok(vec![photo("X"), photo("Y"), photo("Z")]));

        load(&h).await;

        assert_eq!(
            ids(&h.syncer.photo_dao().fetch_all_cached_photos().await),
            vec!["X", "Y", "Z", "A", "B"]
        );
        assert_eq!(h.syncer.last_loaded_page(), 3);
    }

    #[tokio::test]
    async fn next_page_is_served_from_cache_when_present() {
        let h = harness(2).await;
        h.api.set_page(1, Ok(photos("p", 2)));
        load(&h).await;
        // 后续页已在缓存中（例如上次会话留下的数据）
        h.syncer
            .photo_dao()
            .save_photos(&[photo("q0"), photo("q1")], 2)
            .await;

        load(&h).await;

        assert_eq!(h.api.fetched_pages(), vec![1]);
        assert_eq!(
            h.listener.changed.lock().unwrap().last().unwrap(),
            &vec!["q0", "q1"]
        );
        assert_eq!(h.syncer.last_loaded_page(), 2);
    }

    #[tokio::test]
    async fn next_page_from_network_is_persisted_at_its_start_position() {
        let h = harness(2).await;
        h.api.set_page(1, Ok(photos("p", 2)));
        h.api.set_page(2, Ok(vec![photo("n0"), photo("n1")]));
        load(&h).await;

        load(&h).await;

        assert_eq!(h.api.fetched_pages(), vec![1, 2]);
        let records = h.syncer.photo_dao().fetch_all_cached_records().await;
        let positions: Vec<(String, i64)> = records
            .iter()
            .map(|r| (r.photo.id.clone(), r.position))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("p0".to_string(), 0),
                ("p1".to_string(), 1),
                ("n0".to_string(), 2),
                ("n1".to_string(), 3)
            ]
        );
        assert_eq!(
            h.listener.changed.lock().unwrap().last().unwrap(),
            &vec!["n0", "n1"]
        );
        assert_eq!(h.syncer.last_loaded_page(), 2);
    }

    #[tokio::test]
    async fn failed_page_does_not_advance_cursor() {
        let h = harness(2).await;
        h.api.set_page(1, Ok(photos("p", 2)));
        h.api.set_page(
            2,
            Err(ApiError::HttpStatus {
                status: 503,
                body: "unavailable".to_string(),
            }),
        );
        load(&h).await;

        load(&h).await;
        assert_eq!(h.syncer.last_loaded_page(), 1);
        assert_eq!(h.listener.failed.lock().unwrap().len(), 1);
        assert!(h.listener.failed.lock().unwrap()[0].contains("503"));

        h.api.set_page(2, Ok(vec![photo("n0")]));
        load(&h).await;
        assert_eq!(h.api.fetched_pages(), vec![1, 2, 2]);
        assert_eq!(h.syncer.last_loaded_page(), 2);
    }

    #[tokio::test]
    async fn failed_initial_load_retries_initial_protocol() {
        let h = harness(2).await;
        h.api.set_page(1, Err(ApiError::Decode("bad payload".to_string())));

        load(&h).await;
        assert!(!h.syncer.is_initial_load_completed());
        assert_eq!(h.listener.failed.lock().unwrap().len(), 1);

        h.api.set_page(1, Ok(photos("p", 2)));
        load(&h).await;
        assert!(h.syncer.is_initial_load_completed());
        assert_eq!(h.api.fetched_pages(), vec![1, 1]);
    }

    #[tokio::test]
    async fn missing_token_surfaces_as_load_failure() {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:")
            .await
            .unwrap();
        let api = Arc::new(MockFeedApi::default());
        let syncer = FeedSyncer::new(
            FeedSyncerConfig::default(),
            api.clone(),
            PhotoDao::new(pool),
            Arc::new(MemoryTokenStorage::default()),
        );
        let listener = Arc::new(RecordingListener::default());
        syncer.add_listener(listener.clone());

        syncer.fetch_photos_next_page().unwrap().await.unwrap();

        assert!(api.fetched_pages().is_empty());
        assert_eq!(listener.failed.lock().unwrap().len(), 1);
        assert_eq!(syncer.last_loaded_page(), 0);
    }

    #[tokio::test]
    async fn rapid_calls_issue_a_single_request() {
        let (api, gate) = MockFeedApi::gated();
        let h = harness_with(api, 2).await;
        h.api.set_page(1, Ok(photos("p", 2)));

        let first = h.syncer.fetch_photos_next_page();
        let second = h.syncer.fetch_photos_next_page();
        assert!(first.is_some());
        assert!(second.is_none());
        assert!(h.syncer.is_loading());
        assert_eq!(h.listener.events(), 0);

        gate.add_permits(1);
        first.unwrap().await.unwrap();

        assert_eq!(h.api.fetched_pages(), vec![1]);
        assert_eq!(h.listener.events(), 1);
        assert!(!h.syncer.is_loading());
    }

    #[tokio::test]
    async fn reset_cancels_in_flight_load_and_rewinds() {
        let (api, gate) = MockFeedApi::gated();
        let h = harness_with(api, 2).await;
        h.api.set_page(1, Ok(photos("p", 2)));

        let pending = h.syncer.fetch_photos_next_page().unwrap();
        tokio::task::yield_now().await;
        h.syncer.reset();

        assert!(pending.await.unwrap_err().is_cancelled());
        assert_eq!(h.listener.events(), 0);
        assert!(!h.syncer.is_loading());
        assert_eq!(h.syncer.last_loaded_page(), 0);

        gate.add_permits(1);
        load(&h).await;
        assert_eq!(h.listener.events(), 1);
        assert_eq!(h.syncer.last_loaded_page(), 1);
    }

    #[tokio::test]
    async fn reset_keeps_cache_and_clear_cache_empties_it() {
        let h = harness(2).await;
        h.api.set_page(1, Ok(photos("p", 2)));
        load(&h).await;

        h.syncer.reset();
        assert_eq!(h.syncer.last_loaded_page(), 0);
        assert!(!h.syncer.is_initial_load_completed());
        assert_eq!(h.syncer.photo_dao().get_cached_photos_count().await, 2);

        h.syncer.clear_cache().await;
        assert_eq!(h.syncer.photo_dao().get_cached_photos_count().await, 0);
        assert!(h.syncer.photo_dao().needs_cache_refresh().await);
    }

    #[tokio::test]
    async fn clear_cache_stops_in_flight_load_before_deleting() {
        let (api, gate) = MockFeedApi::gated();
        let h = harness_with(api, 2).await;
        h.api.set_page(1, Ok(photos("p", 2)));

        let pending = h.syncer.fetch_photos_next_page().unwrap();
        tokio::task::yield_now().await;

        // 网络已返回，加载任务随时可以写缓存
        gate.add_permits(1);
        h.syncer.clear_cache().await;

        assert!(pending.await.unwrap_err().is_cancelled());
        assert_eq!(h.syncer.photo_dao().get_cached_photos_count().await, 0);
        assert_eq!(h.listener.events(), 0);
        assert_eq!(h.syncer.last_loaded_page(), 0);
        assert!(!h.syncer.is_loading());
    }

    #[tokio::test]
    async fn like_success_updates_cache_and_returns_remote_photo() {
        let h = harness(2).await;
        h.syncer
            .photo_dao()
            .save_photos(&[photo_with_like("a", false)], 0)
            .await;
        h.api.set_like("a", Ok(photo_with_like("a", true)));

        let photo = h.syncer.change_like_status("a", true).await.unwrap();

        assert!(photo.is_liked);
        let cached = h.syncer.photo_dao().fetch_all_cached_photos().await;
        assert!(cached[0].is_liked);
        assert_eq!(h.listener.liked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn like_failure_leaves_cache_untouched() {
        let h = harness(2).await;
        h.syncer
            .photo_dao()
            .save_photos(&[photo_with_like("a", false)], 0)
            .await;
        h.api.set_like(
            "a",
            Err(ApiError::HttpStatus {
                status: 500,
                body: "boom".to_string(),
            }),
        );

        let result = h.syncer.change_like_status("a", true).await;

        assert!(result.is_err());
        assert_eq!(h.api.like_calls.load(Ordering::SeqCst), 1);
        let cached = h.syncer.photo_dao().fetch_all_cached_photos().await;
        assert!(!cached[0].is_liked);
        assert!(h.listener.liked.lock().unwrap().is_empty());
    }
}
