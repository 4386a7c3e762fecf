use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::NewsApiConfig;
use crate::dto::{ArticleDto, SourceDto};
use crate::error::NewsApiError;

/// `GET /top-headlines` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub status: String,
    #[serde(default)]
    pub total_results: i64,
    #[serde(default)]
    pub articles: Vec<ArticleDto>,
}

/// `GET /top-headlines/sources` response body.
#[derive(Debug, Deserialize)]
pub struct SourcesResponse {
    pub status: String,
    #[serde(default)]
    pub sources: Vec<SourceDto>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

pub struct NewsApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    country: String,
    page_size: u32,
}

impl NewsApiClient {
    pub fn new(config: &NewsApiConfig) -> Result<Self, NewsApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            country: config.country.clone(),
            page_size: config.page_size,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, NewsApiError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    pub async fn fetch_sources(&self) -> Result<Vec<SourceDto>, NewsApiError> {
        let url = self.endpoint("top-headlines/sources", &[])?;
        let response: SourcesResponse = self.get_json(url).await?;

        info!("News API returned {} sources", response.sources.len());
        Ok(response.sources)
    }

    pub async fn fetch_top_headlines(&self, category: &str) -> Result<Vec<ArticleDto>, NewsApiError> {
        let page_size = self.page_size.to_string();
        let url = self.endpoint(
            "top-headlines",
            &[
                ("country", self.country.as_str()),
                ("category", category),
                ("pageSize", page_size.as_str()),
            ],
        )?;
        let response: NewsResponse = self.get_json(url).await?;

        info!(
            "News API returned {} of {} articles for category '{}'",
            response.articles.len(),
            response.total_results,
            category
        );
        Ok(response.articles)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, NewsApiError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        // Error bodies look like {"status":"error","code":"...","message":"..."}
        if let Ok(error) = serde_json::from_slice::<serde_json::Value>(&body) {
            if error.get("status").and_then(|s| s.as_str()) == Some("error") {
                let error: ApiErrorBody = serde_json::from_value(error)?;
                return Err(NewsApiError::Api {
                    code: error.code,
                    message: error.message,
                });
            }
        }

        if !status.is_success() {
            return Err(NewsApiError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> NewsApiConfig {
        NewsApiConfig {
            base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
            country: "us".to_string(),
            page_size: 20,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_sources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/top-headlines/sources"))
            .and(header("X-Api-Key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status":"ok","sources":[
                    {"id":"abc-news","name":"ABC News","description":"Top stories","url":"https://abcnews.go.com","category":"general","language":"en","country":"us"},
                    {"id":"bbc-news","name":"BBC News","description":null,"url":"https://www.bbc.co.uk/news","category":"general","language":"en","country":"gb"}
                ]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = NewsApiClient::new(&test_config(&server.uri())).unwrap();
        let sources = client.fetch_sources().await.unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].id.as_deref(), Some("abc-news"));
        assert_eq!(sources[1].name, "BBC News");
        assert!(sources[1].description.is_none());
    }

    #[tokio::test]
    async fn test_fetch_top_headlines_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/top-headlines"))
            .and(query_param("country", "us"))
            .and(query_param("category", "science"))
            .and(query_param("pageSize", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status":"ok","totalResults":1,"articles":[
                    {"source":{"id":null,"name":"Space.com"},"author":"Jane","title":"Comet spotted","description":"Bright","url":"https://space.com/comet","urlToImage":null,"publishedAt":"2024-12-09T10:00:00Z","content":"..."}
                ]}"#,
            ))
            .mount(&server)
            .await;

        let client = NewsApiClient::new(&test_config(&server.uri())).unwrap();
        let articles = client.fetch_top_headlines("science").await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source_name(), "Space.com");
        assert_eq!(articles[0].url.as_deref(), Some("https://space.com/comet"));
    }

    #[tokio::test]
    async fn test_api_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
            ))
            .mount(&server)
            .await;

        let client = NewsApiClient::new(&test_config(&server.uri())).unwrap();
        let err = client.fetch_sources().await.unwrap_err();

        match err {
            NewsApiError::Api { code, message } => {
                assert_eq!(code, "apiKeyInvalid");
                assert_eq!(message, "Your API key is invalid.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_status_without_api_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = NewsApiClient::new(&test_config(&server.uri())).unwrap();
        let err = client.fetch_top_headlines("general").await.unwrap_err();

        match err {
            NewsApiError::Status { status, body } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = NewsApiClient::new(&test_config(&server.uri())).unwrap();
        let err = client.fetch_sources().await.unwrap_err();

        assert!(matches!(err, NewsApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let client = NewsApiClient::new(&test_config("not a url")).unwrap();
        let err = client.fetch_sources().await.unwrap_err();

        assert!(matches!(err, NewsApiError::Url(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Nothing listens on port 9 locally
        let client = NewsApiClient::new(&test_config("http://127.0.0.1:9")).unwrap();
        let err = client.fetch_sources().await.unwrap_err();

        assert!(matches!(err, NewsApiError::Http(_)));
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let client = NewsApiClient::new(&test_config("https://newsapi.org/v2/")).unwrap();
        let url = client.endpoint("top-headlines", &[("category", "sports")]).unwrap();
        assert_eq!(url.as_str(), "https://newsapi.org/v2/top-headlines?category=sports");
    }
}
