//! PostgreSQL store.
//!
//! Enums are stored as their wire strings and parsed back on read; a value
//! the code does not know surfaces as [`StoreError::InvalidData`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    CascadeReport, CommentFilter, Counts, NewsFilter, Page, Paged, PrincipalFilter, Store,
    StoreError, StoreResult,
};
use crate::models::auth::{NewPrincipal, Principal, PrincipalWithPassword, Role, UnknownRole};
use crate::models::content::{
    AuthorSummary, Comment, NewComment, NewNews, News, NewsChanges, NewsStatus, UnknownVariant,
};
use crate::uuid::new_id;

const PRINCIPAL_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

const NEWS_COLUMNS: &str = "n.id, n.title, n.content, n.category, n.image, n.author_id, \
     u.name AS author_name, u.email AS author_email, n.views, n.status, n.created_at, n.updated_at";

const COMMENT_COLUMNS: &str = "c.id, c.content, c.author_id, u.name AS author_name, \
     u.email AS author_email, c.news_id, c.created_at, c.updated_at";

/// Insert that takes the role in `$6` when the table is still empty.
fn register_sql() -> String {
    format!(
        "INSERT INTO users (id, name, email, password_hash, role) \
         SELECT $1, $2, $3, $4, \
         CASE WHEN EXISTS (SELECT 1 FROM users) THEN $5 ELSE $6 END \
         RETURNING {PRINCIPAL_COLUMNS}"
    )
}

#[derive(FromRow)]
struct PrincipalRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrincipalRow {
    fn into_model(self) -> StoreResult<PrincipalWithPassword> {
        let role: Role = self
            .role
            .parse()
            .map_err(|e: UnknownRole| StoreError::InvalidData(e.to_string()))?;
        Ok(PrincipalWithPassword {
            principal: Principal {
                id: self.id,
                name: self.name,
                email: self.email,
                role,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        })
    }

    fn into_principal(self) -> StoreResult<Principal> {
        self.into_model().map(|p| p.principal)
    }
}

#[derive(FromRow)]
struct NewsRow {
    id: Uuid,
    title: String,
    content: String,
    category: String,
    image: Option<String>,
    author_id: Uuid,
    author_name: String,
    author_email: String,
    views: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<NewsRow> for News {
    type Error = StoreError;

    fn try_from(row: NewsRow) -> StoreResult<Self> {
        Ok(News {
            id: row.id,
            title: row.title,
            content: row.content,
            category: row
                .category
                .parse()
                .map_err(|e: UnknownVariant| StoreError::InvalidData(e.to_string()))?,
            image: row.image,
            author: AuthorSummary {
                id: row.author_id,
                name: row.author_name,
                email: row.author_email,
            },
            views: row.views,
            status: row
                .status
                .parse()
                .map_err(|e: UnknownVariant| StoreError::InvalidData(e.to_string()))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    content: String,
    author_id: Uuid,
    author_name: String,
    author_email: String,
    news_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            content: row.content,
            author: AuthorSummary {
                id: row.author_id,
                name: row.author_name,
                email: row.author_email,
            },
            news_id: row.news_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `SELECT` over news joined with its author. `source` is either `news n`
/// or the name `n` of a CTE returning news rows.
fn news_select(source: &str) -> String {
    format!("SELECT {NEWS_COLUMNS} FROM {source} JOIN users u ON u.id = n.author_id")
}

/// Run a news-returning `UPDATE` and read the row back with its author.
fn news_update(update: &str) -> String {
    format!("WITH n AS ({update} RETURNING *) {}", news_select("n"))
}

fn comment_select(source: &str) -> String {
    format!("SELECT {COMMENT_COLUMNS} FROM {source} JOIN users u ON u.id = c.author_id")
}

fn comment_update(update: &str) -> String {
    format!("WITH c AS ({update} RETURNING *) {}", comment_select("c"))
}

/// Substring pattern for `ILIKE`, with wildcards in the input escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Map constraint violations on writes to domain errors.
fn write_error(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(what.to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::MissingReference(what.to_string());
        }
    }
    StoreError::Sql(e)
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, order_by: &str, page: Page) {
    qb.push(" ORDER BY ")
        .push(order_by)
        .push(" LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset() as i64);
}

fn push_principal_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PrincipalFilter) {
    qb.push(" WHERE TRUE");
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_news_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &NewsFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND n.status = ").push_bind(status.as_str());
    }
    if let Some(category) = filter.category {
        qb.push(" AND n.category = ").push_bind(category.as_str());
    }
    if let Some(author_id) = filter.author_id {
        qb.push(" AND n.author_id = ").push_bind(author_id);
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (n.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR n.content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_comment_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CommentFilter) {
    qb.push(" WHERE TRUE");
    if let Some(news_id) = filter.news_id {
        qb.push(" AND c.news_id = ").push_bind(news_id);
    }
    if let Some(author_id) = filter.author_id {
        qb.push(" AND c.author_id = ").push_bind(author_id);
    }
}

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_principal(&self, new: NewPrincipal) -> StoreResult<Principal> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PRINCIPAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(new_id())
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, &format!("email {}", new.email)))?;
        row.into_principal()
    }

    async fn register_principal(&self, new: NewPrincipal) -> StoreResult<Principal> {
        let mut tx = self.pool.begin().await?;
        // Serializes concurrent registrations; plain reads are not blocked.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let row = sqlx::query_as::<_, PrincipalRow>(&register_sql())
            .bind(new_id())
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.role.as_str())
            .bind(Role::Admin.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| write_error(e, &format!("email {}", new.email)))?;
        tx.commit().await?;
        row.into_principal()
    }

    async fn find_principal(&self, id: Uuid) -> StoreResult<Option<Principal>> {
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(PrincipalRow::into_principal)
            .transpose()
    }

    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<PrincipalWithPassword>> {
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(PrincipalRow::into_model)
            .transpose()
    }

    async fn list_principals(
        &self,
        filter: &PrincipalFilter,
        page: Page,
    ) -> StoreResult<Paged<Principal>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_principal_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM users"
        ));
        push_principal_filter(&mut query, filter);
        push_page(&mut query, "created_at DESC, id DESC", page);
        let rows: Vec<PrincipalRow> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(Paged {
            items: rows
                .into_iter()
                .map(PrincipalRow::into_principal)
                .collect::<StoreResult<_>>()?,
            total: total as u64,
            page,
        })
    }

    async fn update_principal_role(&self, id: Uuid, role: Role) -> StoreResult<Option<Principal>> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 \
             RETURNING {PRINCIPAL_COLUMNS}"
        );
        sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(PrincipalRow::into_principal)
            .transpose()
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_principal(&self, id: Uuid) -> StoreResult<Option<CascadeReport>> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let on_their_news = sqlx::query(
            "DELETE FROM comments WHERE news_id IN (SELECT id FROM news WHERE author_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let their_own = sqlx::query("DELETE FROM comments WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let news = sqlx::query("DELETE FROM news WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(CascadeReport {
            news,
            comments: on_their_news + their_own,
        }))
    }

    async fn insert_news(&self, new: NewNews) -> StoreResult<News> {
        let sql = format!(
            "WITH n AS (INSERT INTO news (id, title, content, category, image, author_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *) {}",
            news_select("n")
        );
        let row = sqlx::query_as::<_, NewsRow>(&sql)
            .bind(new_id())
            .bind(&new.title)
            .bind(&new.content)
            .bind(new.category.as_str())
            .bind(new.image.as_deref())
            .bind(new.author_id)
            .bind(new.status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, &format!("author {}", new.author_id)))?
            .ok_or_else(|| StoreError::MissingReference(format!("author {}", new.author_id)))?;
        row.try_into()
    }

    async fn find_news(&self, id: Uuid) -> StoreResult<Option<News>> {
        let sql = format!("{} WHERE n.id = $1", news_select("news n"));
        sqlx::query_as::<_, NewsRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(News::try_from)
            .transpose()
    }

    async fn list_news(&self, filter: &NewsFilter, page: Page) -> StoreResult<Paged<News>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM news n");
        push_news_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(news_select("news n"));
        push_news_filter(&mut query, filter);
        push_page(&mut query, "n.created_at DESC, n.id DESC", page);
        let rows: Vec<NewsRow> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(Paged {
            items: rows
                .into_iter()
                .map(News::try_from)
                .collect::<StoreResult<_>>()?,
            total: total as u64,
            page,
        })
    }

    async fn update_news(&self, id: Uuid, changes: &NewsChanges) -> StoreResult<Option<News>> {
        let sql = news_update(
            "UPDATE news SET title = COALESCE($2, title), content = COALESCE($3, content), \
             category = COALESCE($4, category), \
             image = CASE WHEN $5 THEN $6 ELSE image END, \
             updated_at = now() WHERE id = $1",
        );
        sqlx::query_as::<_, NewsRow>(&sql)
            .bind(id)
            .bind(changes.title.as_deref())
            .bind(changes.content.as_deref())
            .bind(changes.category.map(|c| c.as_str()))
            .bind(changes.image.is_some())
            .bind(changes.image.clone().flatten())
            .fetch_optional(&self.pool)
            .await?
            .map(News::try_from)
            .transpose()
    }

    async fn set_news_status(&self, id: Uuid, status: NewsStatus) -> StoreResult<Option<News>> {
        let sql = news_update("UPDATE news SET status = $2, updated_at = now() WHERE id = $1");
        sqlx::query_as::<_, NewsRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(News::try_from)
            .transpose()
    }

    async fn record_news_view(&self, id: Uuid) -> StoreResult<Option<News>> {
        let sql = news_update("UPDATE news SET views = views + 1 WHERE id = $1");
        sqlx::query_as::<_, NewsRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(News::try_from)
            .transpose()
    }

    async fn delete_news(&self, id: Uuid) -> StoreResult<Option<CascadeReport>> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM news WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let comments = sqlx::query("DELETE FROM comments WHERE news_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(CascadeReport { news: 1, comments }))
    }

    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let sql = format!(
            "WITH c AS (INSERT INTO comments (id, content, author_id, news_id) \
             VALUES ($1, $2, $3, $4) RETURNING *) {}",
            comment_select("c")
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(new_id())
            .bind(&new.content)
            .bind(new.author_id)
            .bind(new.news_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, &format!("news {} or author {}", new.news_id, new.author_id)))?
            .ok_or_else(|| StoreError::MissingReference(format!("author {}", new.author_id)))?;
        Ok(row.into())
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let sql = format!("{} WHERE c.id = $1", comment_select("comments c"));
        Ok(sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Comment::from))
    }

    async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: Page,
    ) -> StoreResult<Paged<Comment>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM comments c");
        push_comment_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(comment_select("comments c"));
        push_comment_filter(&mut query, filter);
        push_page(&mut query, "c.created_at DESC, c.id DESC", page);
        let rows: Vec<CommentRow> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(Paged {
            items: rows.into_iter().map(Comment::from).collect(),
            total: total as u64,
            page,
        })
    }

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> StoreResult<Option<Comment>> {
        let sql = comment_update("UPDATE comments SET content = $2, updated_at = now() WHERE id = $1");
        Ok(sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await?
            .map(Comment::from))
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn counts(&self) -> StoreResult<Counts> {
        let (principals, news, comments) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT (SELECT COUNT(*) FROM users), (SELECT COUNT(*) FROM news), \
             (SELECT COUNT(*) FROM comments)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(Counts {
            principals: principals as u64,
            news: news as u64,
            comments: comments as u64,
        })
    }
}
