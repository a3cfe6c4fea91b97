// Image sources: one HTTP fetch attempt per call, raw bytes or a soft failure

use crate::error::SourceFailure;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const LOGO_API: &str = "logo_api";
pub const HTML_ICON: &str = "html_icon";
pub const ICON_SERVICE: &str = "icon_service";
pub const FAVICON: &str = "favicon";

/// Placeholder substituted with the domain in every URL template
pub const DOMAIN_PLACEHOLDER: &str = "{domain}";

/// A place a logo can be downloaded from, keyed by domain
#[async_trait]
pub trait ImageSource: Send + Sync {
    fn name(&self) -> &str;

    /// Make exactly one attempt. Anything but an HTTP 200 with a body is a
    /// soft failure.
    async fn attempt(&self, domain: &str) -> Result<Vec<u8>, SourceFailure>;
}

/// URL templates for the built-in sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceTemplates {
    pub logo_api: String,
    pub homepage: String,
    pub icon_service: String,
    pub favicon: String,
}

impl Default for SourceTemplates {
    fn default() -> Self {
        Self {
            logo_api: "https://logo.clearbit.com/{domain}".to_string(),
            homepage: "https://{domain}".to_string(),
            icon_service: "https://icons.duckduckgo.com/ip3/{domain}.ico".to_string(),
            favicon: "https://{domain}/favicon.ico".to_string(),
        }
    }
}

impl SourceTemplates {
    /// Point every source at one base URL. Used to run the chain against a
    /// local server.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            logo_api: format!("{}/logo/{{domain}}", base),
            homepage: format!("{}/site/{{domain}}/", base),
            icon_service: format!("{}/ip3/{{domain}}.ico", base),
            favicon: format!("{}/site/{{domain}}/favicon.ico", base),
        }
    }
}

/// Substitute the domain into a template and check the result parses
pub fn render_template(template: &str, domain: &str) -> Result<Url, SourceFailure> {
    let rendered = template.replace(DOMAIN_PLACEHOLDER, domain);
    Url::parse(&rendered).map_err(|e| SourceFailure::InvalidUrl(format!("{}: {}", rendered, e)))
}

/// GET a URL and return its body, treating anything but 200 as a failure
async fn download(client: &Client, url: &Url, timeout: Duration) -> Result<Vec<u8>, SourceFailure> {
    debug!("GET {}", url);
    let response = client.get(url.as_str()).timeout(timeout).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(SourceFailure::Status(status.as_u16()));
    }

    let body = response.bytes().await?;
    Ok(body.to_vec())
}

/// A source whose image URL is derived directly from the domain
pub struct TemplateSource {
    name: String,
    template: String,
    client: Client,
    timeout: Duration,
}

impl TemplateSource {
    pub fn new(name: &str, template: &str, client: Client, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_string(),
            client,
            timeout,
        }
    }
}

#[async_trait]
impl ImageSource for TemplateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, domain: &str) -> Result<Vec<u8>, SourceFailure> {
        let url = render_template(&self.template, domain)?;
        download(&self.client, &url, self.timeout).await
    }
}

/// Fetches the homepage and follows its `<link rel="icon">` reference
pub struct HtmlIconSource {
    homepage_template: String,
    client: Client,
    homepage_timeout: Duration,
    image_timeout: Duration,
}

impl HtmlIconSource {
    pub fn new(
        homepage_template: &str,
        client: Client,
        homepage_timeout: Duration,
        image_timeout: Duration,
    ) -> Self {
        Self {
            homepage_template: homepage_template.to_string(),
            client,
            homepage_timeout,
            image_timeout,
        }
    }
}

#[async_trait]
impl ImageSource for HtmlIconSource {
    fn name(&self) -> &str {
        HTML_ICON
    }

    async fn attempt(&self, domain: &str) -> Result<Vec<u8>, SourceFailure> {
        let homepage = render_template(&self.homepage_template, domain)?;
        let body = download(&self.client, &homepage, self.homepage_timeout).await?;
        let html = String::from_utf8_lossy(&body);

        let href = find_icon_href(&html).ok_or(SourceFailure::NoIconLink)?;
        let icon_url = resolve_icon_url(&homepage, &href)?;
        debug!("{} references icon {}", domain, icon_url);

        download(&self.client, &icon_url, self.image_timeout).await
    }
}

/// The `href` of the first `<link>` whose `rel` mentions "icon"
pub fn find_icon_href(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("link[rel]").unwrap();

    let link = document.select(&selector).find(|element| {
        element
            .value()
            .attr("rel")
            .map(|rel| rel.to_lowercase().contains("icon"))
            .unwrap_or(false)
    })?;

    link.value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(String::from)
}

/// Resolve an icon reference against the page it was found on.
/// Protocol-relative, root-relative and bare relative forms are all handled
/// by URL joining.
pub fn resolve_icon_url(page: &Url, href: &str) -> Result<Url, SourceFailure> {
    page.join(href)
        .map_err(|e| SourceFailure::InvalidUrl(format!("{}: {}", href, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn client() -> Client {
        Client::builder().build().unwrap()
    }

    #[test]
    fn test_render_template() {
        let url = render_template("https://logo.clearbit.com/{domain}", "example.com").unwrap();
        assert_eq!(url.as_str(), "https://logo.clearbit.com/example.com");
    }

    #[test]
    fn test_render_template_invalid() {
        let result = render_template("{domain}/favicon.ico", "example.com");
        assert!(matches!(result, Err(SourceFailure::InvalidUrl(_))));
    }

    #[test]
    fn test_find_icon_href_shortcut_icon() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/style.css">
            <link rel="Shortcut Icon" href="/static/fav.png">
        </head></html>"#;
        assert_eq!(find_icon_href(html), Some("/static/fav.png".to_string()));
    }

    #[test]
    fn test_find_icon_href_takes_first_icon() {
        let html = r#"<link rel="apple-touch-icon" href="a.png"><link rel="icon" href="b.png">"#;
        assert_eq!(find_icon_href(html), Some("a.png".to_string()));
    }

    #[test]
    fn test_find_icon_href_missing() {
        assert_eq!(find_icon_href("<html><body>hi</body></html>"), None);
        assert_eq!(find_icon_href(r#"<link rel="icon">"#), None);
    }

    #[test]
    fn test_resolve_icon_url_forms() {
        let page = Url::parse("https://example.com").unwrap();
        assert_eq!(
            resolve_icon_url(&page, "//cdn.example.net/i.png").unwrap().as_str(),
            "https://cdn.example.net/i.png"
        );
        assert_eq!(
            resolve_icon_url(&page, "/img/i.png").unwrap().as_str(),
            "https://example.com/img/i.png"
        );
        assert_eq!(
            resolve_icon_url(&page, "img/i.png").unwrap().as_str(),
            "https://example.com/img/i.png"
        );
        assert_eq!(
            resolve_icon_url(&page, "http://other.org/x.ico").unwrap().as_str(),
            "http://other.org/x.ico"
        );
    }

    #[tokio::test]
    async fn test_template_source_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logo/example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNGDATA".to_vec()))
            .mount(&server)
            .await;

        let templates = SourceTemplates::rooted_at(&server.uri());
        let source = TemplateSource::new(LOGO_API, &templates.logo_api, client(), Duration::from_secs(2));
        let bytes = source.attempt("example.com").await.unwrap();
        assert_eq!(bytes, b"PNGDATA");
    }

    #[tokio::test]
    async fn test_template_source_non_200_is_soft_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let templates = SourceTemplates::rooted_at(&server.uri());
        let source = TemplateSource::new(FAVICON, &templates.favicon, client(), Duration::from_secs(2));
        let result = source.attempt("example.com").await;
        assert_eq!(result, Err(SourceFailure::Status(404)));
    }

    #[tokio::test]
    async fn test_template_source_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let templates = SourceTemplates::rooted_at(&server.uri());
        let source = TemplateSource::new(
            ICON_SERVICE,
            &templates.icon_service,
            client(),
            Duration::from_millis(50),
        );
        let result = source.attempt("example.com").await;
        assert_eq!(result, Err(SourceFailure::Timeout));
    }

    #[tokio::test]
    async fn test_html_icon_source_follows_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/site/example.com/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(r#"<html><head><link rel="icon" href="assets/icon.png"></head></html>"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/site/example.com/assets/icon.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ICON".to_vec()))
            .mount(&server)
            .await;

        let templates = SourceTemplates::rooted_at(&server.uri());
        let source = HtmlIconSource::new(
            &templates.homepage,
            client(),
            Duration::from_secs(2),
            Duration::from_secs(2),
        );
        assert_eq!(source.attempt("example.com").await.unwrap(), b"ICON");
    }

    #[tokio::test]
    async fn test_html_icon_source_without_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/site/example.com/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let templates = SourceTemplates::rooted_at(&server.uri());
        let source = HtmlIconSource::new(
            &templates.homepage,
            client(),
            Duration::from_secs(2),
            Duration::from_secs(2),
        );
        assert_eq!(source.attempt("example.com").await, Err(SourceFailure::NoIconLink));
    }
}
