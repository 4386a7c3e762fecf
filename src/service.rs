use std::sync::Arc;

use tracing::{info, warn};

use crate::db::{Database, NewArticle, NewSource, SearchField};
use crate::dto::{
    ArticleDto, CategoryDto, CountArticleByCategory, IngestSummary, RecordCounts, SourceByArticle,
    SourceDto,
};
use crate::error::{ServiceError, ServiceResult};
use crate::news_api::NewsApiClient;
use crate::page::{Page, Pageable};

/// How many sources the article dashboard lists before folding the rest into "other".
pub const TOP_SOURCES: i64 = 10;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_foreign_key_violation())
}

fn parse_id(raw: &str) -> ServiceResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ServiceError::CategoryNotFound(raw.to_string()))
}

fn optional_text(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

/// Categories, sources and the public article listing.
#[derive(Clone)]
pub struct NewsService {
    db: Arc<Database>,
    api: Arc<NewsApiClient>,
}

impl NewsService {
    pub fn new(db: Arc<Database>, api: Arc<NewsApiClient>) -> Self {
        Self { db, api }
    }

    pub async fn get_categories(&self) -> ServiceResult<Vec<CategoryDto>> {
        let categories = self.db.list_categories().await?;
        Ok(categories.into_iter().map(CategoryDto::from).collect())
    }

    pub async fn input_category(&self, name: &str, memo: Option<&str>) -> ServiceResult<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::MissingInput("category name"));
        }

        match self.db.insert_category(name, optional_text(memo)).await {
            Ok(id) => {
                info!("Created category '{}' ({})", name, id);
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => Err(ServiceError::DuplicateCategory(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_category(&self, id: &str, name: &str, memo: Option<&str>) -> ServiceResult<()> {
        let category_id = parse_id(id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::MissingInput("category name"));
        }

        match self.db.update_category(category_id, name, optional_text(memo)).await {
            Ok(true) => {
                info!("Updated category {} to '{}'", category_id, name);
                Ok(())
            }
            Ok(false) => Err(ServiceError::CategoryNotFound(id.to_string())),
            Err(e) if is_unique_violation(&e) => Err(ServiceError::DuplicateCategory(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_category(&self, id: &str) -> ServiceResult<()> {
        let category_id = parse_id(id)?;
        let category = self
            .db
            .find_category(category_id)
            .await?
            .ok_or_else(|| ServiceError::CategoryNotFound(id.to_string()))?;

        match self.db.delete_category(category_id).await {
            Ok(_) => {
                info!("Deleted category '{}'", category.name);
                Ok(())
            }
            Err(e) if is_foreign_key_violation(&e) => {
                warn!("Refusing to delete category '{}': still referenced", category.name);
                Err(ServiceError::CategoryInUse(category.name))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_sources(&self, pageable: &Pageable) -> ServiceResult<Page<SourceDto>> {
        let page = self.db.get_sources_page(pageable).await?;
        Ok(page.map(SourceDto::from))
    }

    /// Pull the source list from the news API and upsert every entry by name.
    pub async fn input_sources(&self) -> ServiceResult<usize> {
        let sources = self.api.fetch_sources().await?;

        let mut stored = 0;
        for dto in &sources {
            let source = NewSource::from(dto);
            if source.name.is_empty() {
                warn!("Skipping source without a name: {:?}", dto.id);
                continue;
            }
            self.db.upsert_source(&source).await?;
            stored += 1;
        }

        info!("Stored {} of {} sources", stored, sources.len());
        Ok(stored)
    }

    pub async fn get_articles(&self, pageable: &Pageable) -> ServiceResult<Page<ArticleDto>> {
        let page = self.db.get_articles_page(pageable).await?;
        Ok(page.map(ArticleDto::from))
    }

    pub async fn get_record_counts(&self) -> ServiceResult<RecordCounts> {
        Ok(RecordCounts {
            sources: self.db.count_sources().await?,
            categories: self.db.count_categories().await?,
            articles: self.db.count_articles().await?,
        })
    }
}

/// Article statistics, ingestion and search.
#[derive(Clone)]
pub struct ArticleService {
    db: Arc<Database>,
    api: Arc<NewsApiClient>,
}

impl ArticleService {
    pub fn new(db: Arc<Database>, api: Arc<NewsApiClient>) -> Self {
        Self { db, api }
    }

    pub async fn get_total_article_count(&self) -> ServiceResult<i64> {
        Ok(self.db.count_articles().await?)
    }

    pub async fn count_article_by_categories(&self) -> ServiceResult<Vec<CountArticleByCategory>> {
        Ok(self.db.count_articles_by_category().await?)
    }

    pub async fn get_article_count_by_source(&self) -> ServiceResult<Vec<SourceByArticle>> {
        Ok(self.db.count_articles_by_source(TOP_SOURCES).await?)
    }

    /// Fetch the top headlines for a category and store the ones not seen before.
    ///
    /// Rows are written one at a time; an error aborts the run and keeps what
    /// was already inserted.
    pub async fn input_articles(&self, category_name: &str) -> ServiceResult<IngestSummary> {
        let category_name = category_name.trim();
        if category_name.is_empty() {
            return Err(ServiceError::MissingInput("category name"));
        }

        let category_id = match self.db.find_category_by_name(category_name).await? {
            Some(category) => category.id,
            None => {
                info!("Creating category '{}' for ingestion", category_name);
                self.db.insert_category(category_name, None).await?
            }
        };

        let articles = self.api.fetch_top_headlines(category_name).await?;
        let mut summary = IngestSummary {
            fetched: articles.len(),
            ..Default::default()
        };

        for dto in &articles {
            let source_id = match dto.source.as_ref().map(NewSource::from) {
                Some(source) if !source.name.is_empty() => Some(self.resolve_source(&source).await?),
                _ => None,
            };

            let Some(article) = NewArticle::from_dto(dto, source_id, Some(category_id)) else {
                warn!("Skipping article without url: {:?}", dto.title);
                summary.skipped += 1;
                continue;
            };

            if self.db.find_article_by_url(&article.url).await?.is_some() {
                summary.skipped += 1;
                continue;
            }

            self.db.insert_article(&article).await?;
            summary.inserted += 1;
        }

        info!(
            "Ingested category '{}': {} fetched, {} inserted, {} skipped",
            category_name, summary.fetched, summary.inserted, summary.skipped
        );
        Ok(summary)
    }

    /// Existing sources are reused as-is; unknown ones are created.
    async fn resolve_source(&self, source: &NewSource) -> ServiceResult<i64> {
        match self.db.find_source_by_name(&source.name).await? {
            Some(existing) => Ok(existing.id),
            None => Ok(self.db.upsert_source(source).await?),
        }
    }

    /// An empty or blank query yields an empty page rather than every article.
    pub async fn search_articles(
        &self,
        query: &str,
        search_type: &str,
        pageable: &Pageable,
    ) -> ServiceResult<Page<ArticleDto>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Page::empty(pageable));
        }

        let field = SearchField::from_search_type(search_type);
        let page = self.db.search_articles(field, query, pageable).await?;
        Ok(page.map(ArticleDto::from))
    }
}
