//! 按 key 去重的单飞请求
//!
//! 相同 key 的请求在进行中时拒绝新请求；key 改变时取消旧请求，由新请求取而代之。

use crate::feed::error::{ApiError, ApiResult};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::AbortHandle;
use tracing::debug;

struct InFlight {
    key: String,
    seq: u64,
    handle: AbortHandle,
}

#[derive(Default)]
struct FlightState {
    next_seq: u64,
    current: Option<InFlight>,
}

/// 同类请求的单飞守卫
pub(crate) struct SupersedingFlight {
    name: &'static str,
    state: Arc<Mutex<FlightState>>,
}

fn lock(state: &Mutex<FlightState>) -> MutexGuard<'_, FlightState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// 请求结束时释放占位（只释放自己的那一次）
fn release(state: &Mutex<FlightState>, seq: u64) {
    let mut state = lock(state);
    if state.current.as_ref().is_some_and(|c| c.seq == seq) {
        state.current = None;
    }
}

impl SupersedingFlight {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(FlightState::default())),
        }
    }

    /// 以 `key` 执行请求
    ///
    /// - 相同 key 仍在进行中：返回 `DuplicateRequest`
    /// - 不同 key 仍在进行中：取消旧请求（旧调用方得到 `Cancelled`）
    ///
    /// 占位由请求任务自己释放，调用方中途放弃等待也不会留下占位。
    pub(crate) async fn run<T, F>(&self, key: &str, request: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let handle = {
            let mut state = lock(&self.state);
            if let Some(current) = state.current.take() {
                if current.key == key {
                    debug!("[{}] 相同请求进行中，拒绝重复请求", self.name);
                    state.current = Some(current);
                    return Err(ApiError::DuplicateRequest(self.name.to_string()));
                }
                debug!("[{}] 新请求取代进行中的旧请求", self.name);
                current.handle.abort();
            }

            state.next_seq += 1;
            let seq = state.next_seq;
            let shared = Arc::clone(&self.state);
            let handle = tokio::spawn(async move {
                let result = request.await;
                release(&shared, seq);
                result
            });
            state.current = Some(InFlight {
                key: key.to_string(),
                seq,
                handle: handle.abort_handle(),
            });
            handle
        };

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ApiError::Cancelled),
            Err(e) => Err(ApiError::Decode(format!("请求任务异常退出: {}", e))),
        }
    }
}
