use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// 渲染输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Pdf,
    /// ASCII art
    Txt,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            "txt" | "utxt" => Ok(Self::Txt),
            _ => Err(RenderError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// 把 PlantUML 文本渲染成图片
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, source: &str, format: OutputFormat) -> Result<Vec<u8>, RenderError>;
}

/// Kroki 渲染服务
pub struct KrokiRenderer {
    client: Client,
    base_url: String,
}

impl KrokiRenderer {
    pub fn new(base_url: &str) -> Result<Self, RenderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, format: OutputFormat) -> String {
        format!("{}/plantuml/{}", self.base_url, format)
    }
}

#[async_trait]
impl Renderer for KrokiRenderer {
    async fn render(&self, source: &str, format: OutputFormat) -> Result<Vec<u8>, RenderError> {
        let url = self.endpoint(format);
        tracing::debug!("POST {} ({} bytes)", url, source.len());

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(source.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RenderError::Api(format!(
                "Kroki returned status {}: {}",
                status,
                detail.trim()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 只应答一次的本地 HTTP 服务，返回 (地址, 收到的请求)
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= end + 4 + length
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("svg".parse::<OutputFormat>().unwrap(), OutputFormat::Svg);
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("pdf".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert!(matches!(
            "gif".parse::<OutputFormat>(),
            Err(RenderError::UnsupportedFormat(f)) if f == "gif"
        ));
        assert_eq!(OutputFormat::Svg.to_string(), "svg");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let renderer = KrokiRenderer::new("https://kroki.example/").unwrap();
        assert_eq!(renderer.base_url(), "https://kroki.example");
        assert_eq!(
            renderer.endpoint(OutputFormat::Png),
            "https://kroki.example/plantuml/png"
        );
    }

    #[tokio::test]
    async fn test_kroki_posts_source() {
        let (url, server) = serve_once("200 OK", "<svg/>").await;
        let renderer = KrokiRenderer::new(&url).unwrap();

        let image = renderer
            .render("@startuml\n@enduml", OutputFormat::Svg)
            .await
            .unwrap();
        assert_eq!(image, b"<svg/>");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /plantuml/svg "));
        assert!(request.ends_with("@startuml\n@enduml"));
    }

    #[tokio::test]
    async fn test_kroki_error_status() {
        let (url, _server) = serve_once("400 Bad Request", "Syntax Error?").await;
        let renderer = KrokiRenderer::new(&url).unwrap();

        match renderer.render("garbage", OutputFormat::Png).await {
            Err(RenderError::Api(message)) => {
                assert!(message.contains("400"));
                assert!(message.contains("Syntax Error?"));
            }
            other => panic!("expected api error, got {:?}", other.map(|b| b.len())),
        }
    }
}
