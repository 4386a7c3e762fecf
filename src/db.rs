use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, SqlitePool,
};

use crate::dto::{CountArticleByCategory, SourceByArticle};
use crate::page::{Page, Pageable};

#[derive(Debug, Clone, FromRow)]
pub struct Source {
    pub id: i64,
    pub sid: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub memo: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: i64,
    pub source_id: Option<i64>,
    pub category_id: Option<i64>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// An article joined with its source and category for display.
#[derive(Debug, Clone, FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub content: Option<String>,
    pub source_sid: Option<String>,
    pub source_name: Option<String>,
    pub source_description: Option<String>,
    pub source_url: Option<String>,
    pub source_category: Option<String>,
    pub source_language: Option<String>,
    pub source_country: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSource {
    pub sid: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewArticle {
    pub source_id: Option<i64>,
    pub category_id: Option<i64>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub content: Option<String>,
}

/// Article column a search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Description,
    Author,
}

impl SearchField {
    /// Unknown search types fall back to the title.
    pub fn from_search_type(search_type: &str) -> Self {
        match search_type.trim().to_ascii_lowercase().as_str() {
            "description" => SearchField::Description,
            "author" => SearchField::Author,
            _ => SearchField::Title,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Description => "description",
            SearchField::Author => "author",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SearchField::Title => "a.title",
            SearchField::Description => "a.description",
            SearchField::Author => "a.author",
        }
    }
}

const ARTICLE_SELECT: &str = r#"
    SELECT a.id, a.author, a.title, a.description, a.url, a.url_to_image,
           a.published_at, a.content,
           s.sid AS source_sid, s.name AS source_name,
           s.description AS source_description, s.url AS source_url,
           s.category AS source_category, s.language AS source_language,
           s.country AS source_country,
           c.name AS category_name
    FROM article a
    LEFT JOIN source s ON s.id = a.source_id
    LEFT JOIN category c ON c.id = a.category_id
"#;

const ARTICLE_SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "a.id"),
    ("title", "a.title"),
    ("author", "a.author"),
    ("publishedAt", "a.published_at"),
    ("createdAt", "a.created_at"),
];

const ARTICLE_DEFAULT_ORDER: &str = "a.published_at DESC";

const SOURCE_SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("category", "category"),
    ("language", "language"),
    ("country", "country"),
];

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.foreign_keys(true);

        // Every connection to `:memory:` opens its own database, so keep exactly one alive.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS source (
                id INTEGER PRIMARY KEY,
                sid TEXT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                url TEXT,
                category TEXT,
                language TEXT,
                country TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                memo TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS article (
                id INTEGER PRIMARY KEY,
                source_id INTEGER REFERENCES source(id),
                category_id INTEGER REFERENCES category(id),
                author TEXT,
                title TEXT,
                description TEXT,
                url TEXT NOT NULL,
                url_to_image TEXT,
                published_at TEXT,
                content TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Lookup index only: url de-duplication is checked, not enforced
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_article_url ON article(url)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_article_category ON article(category_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_article_source ON article(source_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // Categories

    pub async fn list_categories(&self) -> sqlx::Result<Vec<Category>> {
        sqlx::query_as::<_, Category>("SELECT * FROM category ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find_category(&self, id: i64) -> sqlx::Result<Option<Category>> {
        sqlx::query_as::<_, Category>("SELECT * FROM category WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_category_by_name(&self, name: &str) -> sqlx::Result<Option<Category>> {
        sqlx::query_as::<_, Category>("SELECT * FROM category WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_category(&self, name: &str, memo: Option<&str>) -> sqlx::Result<i64> {
        let result = sqlx::query("INSERT INTO category (name, memo) VALUES (?, ?)")
            .bind(name)
            .bind(memo)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Returns `false` when no category has the given id.
    pub async fn update_category(
        &self,
        id: i64,
        name: &str,
        memo: Option<&str>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE category
            SET name = ?, memo = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(memo)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fails with a foreign key violation while articles still reference the category.
    pub async fn delete_category(&self, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM category WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_categories(&self) -> sqlx::Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM category")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    // Sources

    /// Insert a source or refresh the existing row with the same name; returns its id.
    pub async fn upsert_source(&self, source: &NewSource) -> sqlx::Result<i64> {
        sqlx::query(
            r#"
            INSERT INTO source (sid, name, description, url, category, language, country)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                sid = COALESCE(excluded.sid, sid),
                description = COALESCE(excluded.description, description),
                url = COALESCE(excluded.url, url),
                category = COALESCE(excluded.category, category),
                language = COALESCE(excluded.language, language),
                country = COALESCE(excluded.country, country),
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&source.sid)
        .bind(&source.name)
        .bind(&source.description)
        .bind(&source.url)
        .bind(&source.category)
        .bind(&source.language)
        .bind(&source.country)
        .execute(&self.pool)
        .await?;

        let id: (i64,) = sqlx::query_as("SELECT id FROM source WHERE name = ?")
            .bind(&source.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id.0)
    }

    pub async fn find_source_by_name(&self, name: &str) -> sqlx::Result<Option<Source>> {
        sqlx::query_as::<_, Source>("SELECT * FROM source WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_sources_page(&self, pageable: &Pageable) -> sqlx::Result<Page<Source>> {
        let order = pageable.order_by(SOURCE_SORT_COLUMNS, "id ASC");
        let sql = format!("SELECT * FROM source ORDER BY {} LIMIT ? OFFSET ?", order);

        let sources = sqlx::query_as::<_, Source>(&sql)
            .bind(pageable.limit())
            .bind(pageable.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = self.count_sources().await?;

        Ok(Page::new(sources, pageable, total))
    }

    pub async fn count_sources(&self) -> sqlx::Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM source")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    // Articles

    pub async fn find_article_by_url(&self, url: &str) -> sqlx::Result<Option<Article>> {
        sqlx::query_as::<_, Article>("SELECT * FROM article WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_article(&self, article: &NewArticle) -> sqlx::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO article (
                source_id, category_id, author, title, description,
                url, url_to_image, published_at, content
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article.source_id)
        .bind(article.category_id)
        .bind(&article.author)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.url)
        .bind(&article.url_to_image)
        .bind(&article.published_at)
        .bind(&article.content)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn count_articles(&self) -> sqlx::Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM article")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    pub async fn get_articles_page(&self, pageable: &Pageable) -> sqlx::Result<Page<ArticleRow>> {
        let order = pageable.order_by(ARTICLE_SORT_COLUMNS, ARTICLE_DEFAULT_ORDER);
        let sql = format!(
            "{} ORDER BY {}, a.id DESC LIMIT ? OFFSET ?",
            ARTICLE_SELECT, order
        );

        let articles = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(pageable.limit())
            .bind(pageable.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = self.count_articles().await?;

        Ok(Page::new(articles, pageable, total))
    }

    pub async fn count_articles_by_category(&self) -> sqlx::Result<Vec<CountArticleByCategory>> {
        sqlx::query_as::<_, CountArticleByCategory>(
            r#"
            SELECT c.name AS category, COUNT(a.id) AS count
            FROM article a
            JOIN category c ON c.id = a.category_id
            GROUP BY c.name
            ORDER BY COUNT(a.id) DESC, c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_articles_by_source(&self, limit: i64) -> sqlx::Result<Vec<SourceByArticle>> {
        sqlx::query_as::<_, SourceByArticle>(
            r#"
            SELECT s.name AS name, s.url AS url, COUNT(a.id) AS count
            FROM article a
            JOIN source s ON s.id = a.source_id
            GROUP BY s.name, s.url
            ORDER BY COUNT(a.id) DESC, s.name
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Substring search on one article column; `%` and `_` in `query` match literally.
    pub async fn search_articles(
        &self,
        field: SearchField,
        query: &str,
        pageable: &Pageable,
    ) -> sqlx::Result<Page<ArticleRow>> {
        let pattern = like_pattern(query);
        let condition = format!("{} LIKE ? ESCAPE '\\'", field.column());
        let order = pageable.order_by(ARTICLE_SORT_COLUMNS, ARTICLE_DEFAULT_ORDER);

        let sql = format!(
            "{} WHERE {} ORDER BY {}, a.id DESC LIMIT ? OFFSET ?",
            ARTICLE_SELECT, condition, order
        );
        let articles = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(&pattern)
            .bind(pageable.limit())
            .bind(pageable.offset())
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM article a WHERE {}", condition);
        let total: (i64,) = sqlx::query_as(&count_sql)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(articles, pageable, total.0))
    }
}
