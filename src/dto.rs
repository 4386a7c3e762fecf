//! Transfer objects shared by the news API client, the services and the templates,
//! plus the conversions to and from the database rows.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::db::{ArticleRow, Category, NewArticle, NewSource, Source};

/// A news provider as the news API describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// The news API sends `"name": null` for some providers; treat it like a missing name.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl SourceDto {
    pub fn url_display(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    pub fn description_display(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn category_display(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }

    pub fn language_display(&self) -> &str {
        self.language.as_deref().unwrap_or("")
    }

    pub fn country_display(&self) -> &str {
        self.country.as_deref().unwrap_or("")
    }
}

impl From<Source> for SourceDto {
    fn from(source: Source) -> Self {
        Self {
            id: source.sid,
            name: source.name,
            description: source.description,
            url: source.url,
            category: source.category,
            language: source.language,
            country: source.country,
        }
    }
}

impl From<&SourceDto> for NewSource {
    fn from(dto: &SourceDto) -> Self {
        Self {
            sid: dto.id.clone(),
            name: dto.name.trim().to_string(),
            description: dto.description.clone(),
            url: dto.url.clone(),
            category: dto.category.clone(),
            language: dto.language.clone(),
            country: dto.country.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDto {
    pub id: i64,
    pub name: String,
    pub memo: Option<String>,
}

impl CategoryDto {
    pub fn memo_display(&self) -> &str {
        self.memo.as_deref().unwrap_or("")
    }
}

impl From<Category> for CategoryDto {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            memo: category.memo,
        }
    }
}

/// A news item, in the news API's camelCase shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDto {
    #[serde(default)]
    pub source: Option<SourceDto>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(skip_deserializing)]
    pub category: Option<String>,
}

impl ArticleDto {
    pub fn title_display(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    pub fn author_display(&self) -> &str {
        self.author.as_deref().unwrap_or("")
    }

    pub fn description_display(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn url_display(&self) -> &str {
        self.url.as_deref().unwrap_or("#")
    }

    pub fn image_display(&self) -> &str {
        self.url_to_image.as_deref().unwrap_or("")
    }

    pub fn source_name(&self) -> &str {
        self.source.as_ref().map(|s| s.name.as_str()).unwrap_or("")
    }

    pub fn category_display(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }

    /// `YYYY-MM-DD HH:MM` for RFC 3339 timestamps, the raw value otherwise.
    pub fn published_display(&self) -> String {
        match self.published_at.as_deref() {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => String::new(),
        }
    }
}

impl From<ArticleRow> for ArticleDto {
    fn from(row: ArticleRow) -> Self {
        let source = row.source_name.map(|name| SourceDto {
            id: row.source_sid,
            name,
            description: row.source_description,
            url: row.source_url,
            category: row.source_category,
            language: row.source_language,
            country: row.source_country,
        });

        Self {
            source,
            author: row.author,
            title: row.title,
            description: row.description,
            url: Some(row.url),
            url_to_image: row.url_to_image,
            published_at: row.published_at,
            content: row.content,
            category: row.category_name,
        }
    }
}

impl NewArticle {
    /// Build an insertable article from an API item. Returns `None` without a usable URL.
    pub fn from_dto(dto: &ArticleDto, source_id: Option<i64>, category_id: Option<i64>) -> Option<Self> {
        let url = dto.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;

        Some(Self {
            source_id,
            category_id,
            author: dto.author.clone(),
            title: dto.title.clone(),
            description: dto.description.clone(),
            url: url.to_string(),
            url_to_image: dto.url_to_image.clone(),
            published_at: dto.published_at.clone(),
            content: dto.content.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CountArticleByCategory {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SourceByArticle {
    pub name: String,
    pub url: Option<String>,
    pub count: i64,
}

impl SourceByArticle {
    pub fn url_display(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordCounts {
    pub sources: i64,
    pub categories: i64,
    pub articles: i64,
}

/// Outcome of one article ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestSummary {
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_row() -> ArticleRow {
        ArticleRow {
            id: 1,
            author: Some("Reporter".to_string()),
            title: Some("Title".to_string()),
            description: None,
            url: "https://example.com/a".to_string(),
            url_to_image: None,
            published_at: Some("2024-12-09T12:30:00Z".to_string()),
            content: None,
            source_sid: Some("bbc-news".to_string()),
            source_name: Some("BBC News".to_string()),
            source_description: None,
            source_url: Some("https://bbc.co.uk".to_string()),
            source_category: Some("general".to_string()),
            source_language: Some("en".to_string()),
            source_country: Some("gb".to_string()),
            category_name: Some("world".to_string()),
        }
    }

    #[test]
    fn test_article_row_to_dto() {
        let dto = ArticleDto::from(article_row());

        assert_eq!(dto.url.as_deref(), Some("https://example.com/a"));
        assert_eq!(dto.source_name(), "BBC News");
        assert_eq!(dto.source.as_ref().unwrap().id.as_deref(), Some("bbc-news"));
        assert_eq!(dto.category_display(), "world");
    }

    #[test]
    fn test_article_row_without_source() {
        let mut row = article_row();
        row.source_name = None;

        let dto = ArticleDto::from(row);
        assert!(dto.source.is_none());
        assert_eq!(dto.source_name(), "");
    }

    #[test]
    fn test_published_display() {
        let mut dto = ArticleDto {
            published_at: Some("2024-12-09T12:30:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(dto.published_display(), "2024-12-09 12:30");

        dto.published_at = Some("yesterday".to_string());
        assert_eq!(dto.published_display(), "yesterday");

        dto.published_at = None;
        assert_eq!(dto.published_display(), "");
    }

    #[test]
    fn test_new_article_requires_url() {
        let dto = ArticleDto {
            url: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(NewArticle::from_dto(&dto, None, None).is_none());

        let dto = ArticleDto {
            url: Some(" https://example.com/x ".to_string()),
            title: Some("X".to_string()),
            ..Default::default()
        };
        let article = NewArticle::from_dto(&dto, Some(3), Some(4)).unwrap();
        assert_eq!(article.url, "https://example.com/x");
        assert_eq!(article.source_id, Some(3));
        assert_eq!(article.category_id, Some(4));
        assert_eq!(article.title.as_deref(), Some("X"));
    }

    #[test]
    fn test_deserialize_api_article() {
        let json = r#"{
            "source": {"id": null, "name": "Example Times"},
            "author": null,
            "title": "Something happened",
            "description": "Details",
            "url": "https://example.com/news/1",
            "urlToImage": "https://example.com/img.png",
            "publishedAt": "2024-12-09T10:00:00Z",
            "content": "Body"
        }"#;

        let dto: ArticleDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.source_name(), "Example Times");
        assert!(dto.source.as_ref().unwrap().id.is_none());
        assert!(dto.author.is_none());
        assert_eq!(dto.url_to_image.as_deref(), Some("https://example.com/img.png"));
        assert_eq!(dto.published_at.as_deref(), Some("2024-12-09T10:00:00Z"));
    }

    #[test]
    fn test_deserialize_null_source_name() {
        let json = r#"[
            {"source": {"id": "x", "name": null}, "title": "A", "url": "https://example.com/a"},
            {"source": {"id": null, "name": "Example Times"}, "title": "B", "url": "https://example.com/b"}
        ]"#;

        let dtos: Vec<ArticleDto> = serde_json::from_str(json).unwrap();
        assert_eq!(dtos.len(), 2);
        assert_eq!(dtos[0].source.as_ref().unwrap().name, "");
        assert_eq!(dtos[1].source_name(), "Example Times");
    }

    #[test]
    fn test_source_dto_to_new_source_trims_name() {
        let dto = SourceDto {
            id: Some("abc".to_string()),
            name: "  ABC News ".to_string(),
            ..Default::default()
        };
        let source = NewSource::from(&dto);
        assert_eq!(source.name, "ABC News");
        assert_eq!(source.sid.as_deref(), Some("abc"));
    }
}
