//! 照片缓存数据访问层（DAO）
//!
//! 负责 `local_photos` 表的所有读写。缓存只是优化层，远程 API 才是权威数据源：
//! 所有公开方法都不向外返回错误，底层失败记录日志后退化为空列表 / false / 无操作。
//! 写操作通过实例内唯一的写锁串行化，避免平移和保存交错导致位置错乱。

use crate::feed::photo::models::{LocalPhoto, Photo, PhotoUrls};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 缓存默认有效期：10 分钟
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        created_at,
        width,
        height,
        color,
        is_liked,
        description,
        small_url,
        regular_url,
        full_url,
        position,
        last_updated
    FROM local_photos
"#;

/// 照片缓存 DAO（基于 sqlx）
#[derive(Clone)]
pub struct PhotoDao {
    db: Pool<Sqlite>,
    /// 单写者锁：同一实例上的写操作依次执行
    write_lock: Arc<Mutex<()>>,
    /// 缓存有效期
    ttl: Duration,
}

impl PhotoDao {
    /// 创建新的照片缓存 DAO（默认 10 分钟有效期）
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self::with_ttl(db, DEFAULT_CACHE_TTL)
    }

    /// 创建新的照片缓存 DAO（自定义有效期）
    pub fn with_ttl(db: Pool<Sqlite>, ttl: Duration) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
            ttl,
        }
    }

    /// 从 `starting_from_position` 开始依次保存照片，已存在的 id 原地更新
    pub async fn save_photos(&self, photos: &[Photo], starting_from_position: i64) {
        if photos.is_empty() {
            return;
        }
        match self.try_save_photos(photos, starting_from_position).await {
            Ok(()) => debug!(
                "[PhotoDAO] 保存 {} 张照片，起始位置: {}",
                photos.len(),
                starting_from_position
            ),
            Err(e) => error!("[PhotoDAO] 保存照片失败: {:?}", e),
        }
    }

    /// 所有缓存记录的 position 整体加上 `offset`
    ///
    /// 优先使用单条批量 UPDATE；批量失败时回退到逐条更新。
    pub async fn shift_cached_photos_positions(&self, offset: i64) {
        if offset == 0 {
            return;
        }
        let _guard = self.write_lock.lock().await;

        match sqlx::query("UPDATE local_photos SET position = position + ?")
            .bind(offset)
            .execute(&self.db)
            .await
        {
            Ok(result) => info!(
                "[PhotoDAO] 批量平移 {} 张照片，偏移量: {}",
                result.rows_affected(),
                offset
            ),
            Err(e) => {
                warn!("[PhotoDAO] 批量平移失败，回退到逐条更新: {:?}", e);
                match self.shift_positions_one_by_one(offset).await {
                    Ok(count) => info!(
                        "[PhotoDAO] 逐条平移完成，共 {} 张照片，偏移量: {}",
                        count, offset
                    ),
                    Err(e) => error!("[PhotoDAO] 逐条平移失败: {:?}", e),
                }
            }
        }
    }

    /// 已缓存照片整体后移 `photos.len()`，再把 `photos` 保存到 0 开始的位置
    ///
    /// 平移和写入在同一个事务中完成：任一步失败或任务被取消，缓存保持原样。
    pub async fn insert_photos_at_head(&self, photos: &[Photo]) {
        if photos.is_empty() {
            return;
        }
        match self.try_insert_photos_at_head(photos).await {
            Ok(()) => info!("[PhotoDAO] 头部插入 {} 张照片", photos.len()),
            Err(e) => error!("[PhotoDAO] 头部插入照片失败: {:?}", e),
        }
    }

    /// 按 position 升序返回所有缓存照片
    pub async fn fetch_all_cached_photos(&self) -> Vec<Photo> {
        self.fetch_all_cached_records()
            .await
            .into_iter()
            .map(|record| record.photo)
            .collect()
    }

    /// 按 position 升序返回所有缓存记录（带位置和更新时间）
    pub async fn fetch_all_cached_records(&self) -> Vec<LocalPhoto> {
        let sql = format!("{} ORDER BY position ASC, id ASC", SELECT_COLUMNS);
        match sqlx::query(&sql).fetch_all(&self.db).await {
            Ok(rows) => Self::rows_to_records(rows),
            Err(e) => {
                error!("[PhotoDAO] 查询缓存照片失败: {:?}", e);
                Vec::new()
            }
        }
    }

    /// 缓存是否需要刷新（无记录或最近一次写入已超过有效期）
    pub async fn needs_cache_refresh(&self) -> bool {
        self.needs_cache_refresh_at(Utc::now()).await
    }

    /// 以给定时间点判断缓存是否需要刷新
    pub async fn needs_cache_refresh_at(&self, now: DateTime<Utc>) -> bool {
        let latest = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(last_updated) FROM local_photos",
        )
        .fetch_one(&self.db)
        .await;

        match latest {
            Ok(Some(last_updated)) => {
                let elapsed = now.timestamp_millis() - last_updated;
                elapsed > self.ttl.as_millis() as i64
            }
            Ok(None) => true,
            Err(e) => {
                error!("[PhotoDAO] 检查缓存有效期失败: {:?}", e);
                true
            }
        }
    }

    /// 指定 id 的照片是否已缓存
    pub async fn photo_exists(&self, id: &str) -> bool {
        match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM local_photos WHERE id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await
        {
            Ok(count) => count > 0,
            Err(e) => {
                error!("[PhotoDAO] 查询照片 {} 是否存在失败: {:?}", id, e);
                false
            }
        }
    }

    /// 缓存照片数量
    pub async fn get_cached_photos_count(&self) -> usize {
        match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM local_photos")
            .fetch_one(&self.db)
            .await
        {
            Ok(count) => count.max(0) as usize,
            Err(e) => {
                error!("[PhotoDAO] 查询缓存照片数量失败: {:?}", e);
                0
            }
        }
    }

    /// 只更新点赞状态和更新时间，记录不存在时不做任何处理
    pub async fn update_photo_like_status(&self, id: &str, is_liked: bool) {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query(
            "UPDATE local_photos SET is_liked = ?, last_updated = ? WHERE id = ?",
        )
        .bind(if is_liked { 1 } else { 0 })
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .execute(&self.db)
        .await;

        match result {
            Ok(r) if r.rows_affected() == 0 => {
                debug!("[PhotoDAO] 照片 {} 不在缓存中，跳过点赞状态更新", id)
            }
            Ok(_) => debug!("[PhotoDAO] 照片 {} 点赞状态更新为 {}", id, is_liked),
            Err(e) => error!("[PhotoDAO] 更新照片 {} 点赞状态失败: {:?}", id, e),
        }
    }

    /// 清空全部缓存
    pub async fn clear_cache(&self) {
        let _guard = self.write_lock.lock().await;

        match sqlx::query("DELETE FROM local_photos").execute(&self.db).await {
            Ok(r) => info!("[PhotoDAO] 🧹 缓存已清空，删除 {} 条记录", r.rows_affected()),
            Err(e) => error!("[PhotoDAO] 清空缓存失败: {:?}", e),
        }
    }

    /// 返回 position 落在 `[start_position, start_position + count - 1]` 的照片
    ///
    /// 范围未填满时返回更少的照片（可能为空），从不访问网络。
    pub async fn get_cached_photos(&self, start_position: i64, count: usize) -> Vec<Photo> {
        if count == 0 {
            return Vec::new();
        }
        let end_position = start_position + count as i64 - 1;
        let sql = format!(
            "{} WHERE position >= ? AND position <= ? ORDER BY position ASC, id ASC",
            SELECT_COLUMNS
        );

        match sqlx::query(&sql)
            .bind(start_position)
            .bind(end_position)
            .fetch_all(&self.db)
            .await
        {
            Ok(rows) => Self::rows_to_records(rows)
                .into_iter()
                .map(|record| record.photo)
                .collect(),
            Err(e) => {
                error!(
                    "[PhotoDAO] 查询位置 {}..={} 的缓存照片失败: {:?}",
                    start_position, end_position, e
                );
                Vec::new()
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn db_for_tests(&self) -> &Pool<Sqlite> {
        &self.db
    }

    async fn try_save_photos(&self, photos: &[Photo], starting_from_position: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await.context("开启事务失败")?;
        Self::upsert_photos(&mut *tx, photos, starting_from_position).await?;
        tx.commit().await.context("提交事务失败")?;
        Ok(())
    }

    async fn try_insert_photos_at_head(&self, photos: &[Photo]) -> Result<()> {
        let offset = photos.len() as i64;
        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await.context("开启事务失败")?;

        if let Err(e) = sqlx::query("UPDATE local_photos SET position = position + ?")
            .bind(offset)
            .execute(&mut *tx)
            .await
        {
            warn!("[PhotoDAO] 批量平移失败，回退到逐条更新: {:?}", e);
            Self::shift_rows_one_by_one(&mut *tx, offset).await?;
        }
        Self::upsert_photos(&mut *tx, photos, 0).await?;

        tx.commit().await.context("提交事务失败")?;
        Ok(())
    }

    /// 逐条平移（批量 UPDATE 不可用时的回退路径），调用方需持有写锁
    async fn shift_positions_one_by_one(&self, offset: i64) -> Result<usize> {
        let mut tx = self.db.begin().await.context("开启事务失败")?;
        let count = Self::shift_rows_one_by_one(&mut *tx, offset).await?;
        tx.commit().await.context("提交事务失败")?;
        Ok(count)
    }

    async fn shift_rows_one_by_one(conn: &mut SqliteConnection, offset: i64) -> Result<usize> {
        let rows = sqlx::query("SELECT id, position FROM local_photos")
            .fetch_all(&mut *conn)
            .await
            .context("查询缓存位置失败")?;

        for row in rows.iter() {
            let id: String = row.try_get("id")?;
            let position: i64 = row.try_get("position")?;
            sqlx::query("UPDATE local_photos SET position = ? WHERE id = ?")
                .bind(position + offset)
                .bind(&id)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("更新照片 {} 位置失败", id))?;
        }
        Ok(rows.len())
    }

    async fn upsert_photos(
        conn: &mut SqliteConnection,
        photos: &[Photo],
        starting_from_position: i64,
    ) -> Result<()> {
        let sql = r#"
            INSERT INTO local_photos (
                id,
                created_at,
                width,
                height,
                color,
                is_liked,
                description,
                small_url,
                regular_url,
                full_url,
                position,
                last_updated
            ) VALUES (
                ?,?,?,?,?,?,?,?,?,?,?,?
            )
            ON CONFLICT(id) DO UPDATE SET
                created_at = excluded.created_at,
                width = excluded.width,
                height = excluded.height,
                color = excluded.color,
                is_liked = excluded.is_liked,
                description = excluded.description,
                small_url = excluded.small_url,
                regular_url = excluded.regular_url,
                full_url = excluded.full_url,
                position = excluded.position,
                last_updated = excluded.last_updated
        "#;

        let now = Utc::now().timestamp_millis();
        for (index, p) in photos.iter().enumerate() {
            sqlx::query(sql)
                .bind(&p.id)
                .bind(p.created_at.map(|d| d.timestamp_millis()))
                .bind(i64::from(p.width))
                .bind(i64::from(p.height))
                .bind(&p.color)
                .bind(if p.is_liked { 1 } else { 0 })
                .bind(&p.description)
                .bind(&p.urls.small)
                .bind(&p.urls.regular)
                .bind(&p.urls.full)
                .bind(starting_from_position + index as i64)
                .bind(now)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("插入或更新照片 {} 失败", p.id))?;
        }
        Ok(())
    }

    fn rows_to_records(rows: Vec<SqliteRow>) -> Vec<LocalPhoto> {
        rows.into_iter()
            .filter_map(|row| match Self::row_to_record(&row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("[PhotoDAO] 跳过无法解析的缓存记录: {:?}", e);
                    None
                }
            })
            .collect()
    }

    fn row_to_record(row: &SqliteRow) -> Result<LocalPhoto> {
        let id: String = row.try_get("id")?;
        let width: i64 = row.try_get("width")?;
        let height: i64 = row.try_get("height")?;
        let is_liked: i64 = row.try_get("is_liked")?;
        let created_at: Option<i64> = row.try_get("created_at")?;
        let last_updated: i64 = row.try_get("last_updated")?;

        let photo = Photo {
            created_at: created_at.and_then(DateTime::from_timestamp_millis),
            width: u32::try_from(width).with_context(|| format!("照片 {} 宽度无效", id))?,
            height: u32::try_from(height).with_context(|| format!("照片 {} 高度无效", id))?,
            color: row.try_get("color")?,
            is_liked: is_liked != 0,
            description: row.try_get("description")?,
            urls: PhotoUrls {
                small: row.try_get("small_url")?,
                regular: row.try_get("regular_url")?,
                full: row.try_get("full_url")?,
            },
            id,
        };

        Ok(LocalPhoto {
            photo,
            position: row.try_get("position")?,
            last_updated: DateTime::from_timestamp_millis(last_updated).unwrap_or_default(),
        })
    }
}
