use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::dto::{
    ArticleDto, CategoryDto, CountArticleByCategory, IngestSummary, RecordCounts, SourceByArticle,
    SourceDto,
};
use crate::page::{Page, PageParams, Pageable};
use crate::service::{ArticleService, NewsService};

pub struct AppState {
    pub news: NewsService,
    pub articles: ArticleService,
    /// Page size used when the request does not ask for one
    pub page_size: u32,
}

impl AppState {
    fn pageable(&self, params: &PageParams) -> Pageable {
        params.to_pageable(self.page_size)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/news", get(news_home))
        .route("/admin", get(admin_index))
        .route("/admin/", get(admin_index))
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/category", get(categories))
        .route("/admin/inputCategory", post(input_category))
        .route("/admin/updateCategory/:id", post(update_category))
        .route("/admin/deleteCategory/:id", post(delete_category))
        .route("/admin/source", get(sources))
        .route("/admin/inputSources", get(input_sources))
        .route("/admin/article", get(article_stats))
        .route("/admin/inputArticles", post(input_articles))
        .route("/admin/search", get(search_articles))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "news.html")]
pub struct NewsTemplate {
    pub articles: Page<ArticleDto>,
    pub categories: Vec<CategoryDto>,
    pub is_search: bool,
    pub query: String,
    pub search_type: String,
    /// Extra query string carried over by the pager links
    pub page_query: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryTemplate {
    pub categories: Vec<CategoryDto>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "source.html")]
pub struct SourceTemplate {
    pub sources: Page<SourceDto>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub article_count: i64,
    pub count_by_category: Vec<CountArticleByCategory>,
    pub categories: Vec<CategoryDto>,
    pub source_by_articles: Vec<SourceByArticle>,
    pub etc_count: i64,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub counts: RecordCounts,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

// Route handlers
pub async fn index() -> Redirect {
    Redirect::to("/news")
}

pub async fn admin_index() -> Redirect {
    Redirect::to("/admin/dashboard")
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

pub async fn news_home(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let pageable = state.pageable(&params);

    let (articles, error) = match state.news.get_articles(&pageable).await {
        Ok(articles) => (articles, None),
        Err(e) => {
            warn!("Failed to load articles: {}", e);
            (Page::empty(&pageable), Some(e.to_string()))
        }
    };

    Ok(HtmlTemplate(NewsTemplate {
        articles,
        categories: Vec::new(),
        is_search: false,
        query: String::new(),
        search_type: String::new(),
        page_query: String::new(),
        error,
    }))
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let counts = state.news.get_record_counts().await?;
    Ok(HtmlTemplate(DashboardTemplate { counts }))
}

async fn render_categories(state: &AppState, error: Option<String>) -> Result<Response, AppError> {
    let categories = state.news.get_categories().await?;
    Ok(HtmlTemplate(CategoryTemplate { categories, error }).into_response())
}

pub async fn categories(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    render_categories(&state, None).await
}

#[derive(Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub category_name: String,
}

pub async fn input_category(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    if form.category_name.trim().is_empty() {
        return Ok(Redirect::to("/admin/category").into_response());
    }

    match state.news.input_category(&form.category_name, None).await {
        Ok(_) => Ok(Redirect::to("/admin/category").into_response()),
        Err(e) => {
            warn!("Failed to create category: {}", e);
            render_categories(&state, Some(e.to_string())).await
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateCategoryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub memo: String,
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<UpdateCategoryForm>,
) -> Result<Response, AppError> {
    match state
        .news
        .update_category(&id, &form.name, Some(&form.memo))
        .await
    {
        Ok(()) => Ok(Redirect::to("/admin/category").into_response()),
        Err(e) => {
            warn!("Failed to update category {}: {}", id, e);
            render_categories(&state, Some(e.to_string())).await
        }
    }
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    match state.news.delete_category(&id).await {
        Ok(()) => Ok(Redirect::to("/admin/category").into_response()),
        Err(e) => {
            warn!("Failed to delete category {}: {}", id, e);
            render_categories(&state, Some(e.to_string())).await
        }
    }
}

pub async fn sources(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let sources = state.news.get_sources(&state.pageable(&params)).await?;
    Ok(HtmlTemplate(SourceTemplate {
        sources,
        error: None,
    }))
}

pub async fn input_sources(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    match state.news.input_sources().await {
        Ok(_) => Ok(Redirect::to("/admin/source").into_response()),
        Err(e) => {
            warn!("Source ingestion failed: {}", e);
            let pageable = state.pageable(&PageParams::default());
            let sources = state.news.get_sources(&pageable).await?;
            Ok(HtmlTemplate(SourceTemplate {
                sources,
                error: Some(e.to_string()),
            })
            .into_response())
        }
    }
}

async fn render_article_stats(state: &AppState, error: Option<String>) -> Result<Response, AppError> {
    let categories = state.news.get_categories().await?;
    let article_count = state.articles.get_total_article_count().await?;
    let count_by_category = state.articles.count_article_by_categories().await?;
    let source_by_articles = state.articles.get_article_count_by_source().await?;

    let top_sum: i64 = source_by_articles.iter().map(|s| s.count).sum();
    let etc_count = article_count - top_sum;

    Ok(HtmlTemplate(ArticleTemplate {
        article_count,
        count_by_category,
        categories,
        source_by_articles,
        etc_count,
        error,
    })
    .into_response())
}

pub async fn article_stats(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    render_article_stats(&state, None).await
}

#[derive(Deserialize)]
pub struct InputArticlesForm {
    #[serde(rename = "categoryName", default)]
    pub category_name: String,
}

pub async fn input_articles(
    State(state): State<Arc<AppState>>,
    Form(form): Form<InputArticlesForm>,
) -> Result<Response, AppError> {
    match state.articles.input_articles(&form.category_name).await {
        Ok(IngestSummary { inserted, .. }) => {
            tracing::debug!("Inserted {} articles", inserted);
            Ok(Redirect::to("/admin/article").into_response())
        }
        Err(e) => {
            warn!("Article ingestion failed: {}", e);
            render_article_stats(&state, Some(e.to_string())).await
        }
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    #[serde(rename = "searchType")]
    pub search_type: Option<String>,
}

pub async fn search_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
    Query(search): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let pageable = state.pageable(&params);
    let query = search.query.unwrap_or_default();
    let search_type = search.search_type.unwrap_or_else(|| "title".to_string());

    let (articles, error) = match state
        .articles
        .search_articles(&query, &search_type, &pageable)
        .await
    {
        Ok(articles) => (articles, None),
        Err(e) => {
            warn!("Search failed: {}", e);
            (Page::empty(&pageable), Some(e.to_string()))
        }
    };
    let categories = state.news.get_categories().await?;

    let page_query = format!(
        "&{}",
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("query", &query)
            .append_pair("searchType", &search_type)
            .finish()
    );

    Ok(HtmlTemplate(NewsTemplate {
        articles,
        categories,
        is_search: true,
        query,
        search_type,
        page_query,
        error,
    }))
}
