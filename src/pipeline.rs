use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::ai::{self, AiService};
use crate::analysis::{self, AnalysisType};
use crate::config::{Config, ImageConfig};
use crate::error::AnalysisFailure;
use crate::normalize::normalize_response;
use crate::payload::{self, ImagePayload, SUBMISSION_MIME_TYPE};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// The normalized text produced for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub kind: AnalysisType,
    pub text: String,
}

/// Runs analysis requests against one [`AiService`].
///
/// Holds no per-request state, so a single analyzer can serve any number of
/// independent calls.
///
/// # Example
///
/// ```rust,no_run
/// use image_analyzer::analysis::AnalysisType;
/// use image_analyzer::config::Config;
/// use image_analyzer::payload::ImagePayload;
/// use image_analyzer::pipeline::{Analyzer, build_service};
///
/// # async fn example() -> anyhow::Result<()> {
/// let mut config = Config::load(None)?;
/// config.apply_env();
///
/// let analyzer = Analyzer::new(build_service(&config)?, config.image.clone());
/// let image = ImagePayload::from_data_url("data:image/png;base64,iVBORw0KGgo=")?;
///
/// match analyzer.analyze(&image, AnalysisType::Instagram).await {
///     Ok(result) => println!("{}", result.text),
///     Err(err) => eprintln!("{err}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct Analyzer {
    service: Box<dyn AiService>,
    image_config: ImageConfig,
}

impl Analyzer {
    pub fn new(service: Box<dyn AiService>, image_config: ImageConfig) -> Self {
        Self {
            service,
            image_config,
        }
    }

    /// The name of the backing service.
    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Analyze one image.
    ///
    /// Sends the instruction for `kind` together with the image, then cleans
    /// the response with [`normalize_response`]. Any failure, including an
    /// empty cleaned response, is reported as [`AnalysisFailure`] with the
    /// cause logged.
    pub async fn analyze(
        &self,
        image: &ImagePayload,
        kind: AnalysisType,
    ) -> std::result::Result<AnalysisResult, AnalysisFailure> {
        self.run(image, kind).await.map_err(|e| {
            log::error!("Analysis failed ({kind}, {}): {e:#}", self.service.name());
            AnalysisFailure::new(e)
        })
    }

    /// Load an image file and analyze it.
    ///
    /// Reading and transcoding run on tokio's blocking pool.
    pub async fn analyze_file(
        &self,
        path: &Path,
        kind: AnalysisType,
    ) -> std::result::Result<AnalysisResult, AnalysisFailure> {
        let owned = path.to_path_buf();
        let image_config = self.image_config.clone();
        let image = tokio::task::spawn_blocking(move || ImagePayload::load(&owned, &image_config))
            .await
            .context("Image loading task failed")
            .and_then(|loaded| loaded)
            .map_err(|e| {
                log::error!("Failed to load {}: {e:#}", path.display());
                AnalysisFailure::new(e)
            })?;
        self.analyze(&image, kind).await
    }

    async fn run(&self, image: &ImagePayload, kind: AnalysisType) -> Result<AnalysisResult> {
        let data = payload::strip_data_url(image.data());
        if data.is_empty() {
            anyhow::bail!("Image payload is empty");
        }

        let instruction = analysis::build_instruction(kind);
        log::debug!(
            "Submitting {kind} analysis to {} (declared {}, sent as {SUBMISSION_MIME_TYPE})",
            self.service.name(),
            image.mime_type()
        );

        let raw = self
            .service
            .generate(&instruction, data, SUBMISSION_MIME_TYPE)
            .await?;

        let text = normalize_response(&raw);
        if text.is_empty() {
            anyhow::bail!("{} returned no usable text", self.service.name());
        }

        Ok(AnalysisResult { kind, text })
    }
}

/// Build the Gemini service from configuration.
///
/// Fails when no API key is configured.
pub fn build_service(config: &Config) -> Result<Box<dyn AiService>> {
    if !config.has_api_key() {
        anyhow::bail!(
            "No Gemini API key configured. Set gemini.api_key in the config file or the {} environment variable.",
            crate::config::API_KEY_ENV
        );
    }
    Ok(Box::new(ai::GeminiService::new(&config.gemini)?))
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks).
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && is_supported_image(p))
                .collect();
            found.sort();
            images.extend(found);
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every request and answers with a canned reply.
    struct StubService {
        reply: std::result::Result<String, String>,
        requests: Mutex<Vec<(String, String, String)>>,
    }

    impl StubService {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl AiService for StubService {
        fn name(&self) -> &str {
            "Stub"
        }

        async fn generate(&self, prompt: &str, image_base64: &str, mime_type: &str) -> Result<String> {
            self.requests.lock().unwrap().push((
                prompt.to_string(),
                image_base64.to_string(),
                mime_type.to_string(),
            ));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(anyhow::anyhow!("{message}")),
            }
        }
    }

    /// Lets a test keep a handle on the stub after handing it to the analyzer.
    struct Shared(std::sync::Arc<StubService>);

    #[async_trait::async_trait]
    impl AiService for Shared {
        fn name(&self) -> &str {
            self.0.name()
        }

        async fn generate(&self, prompt: &str, image_base64: &str, mime_type: &str) -> Result<String> {
            self.0.generate(prompt, image_base64, mime_type).await
        }
    }

    fn analyzer_with(stub: StubService) -> (Analyzer, std::sync::Arc<StubService>) {
        let stub = std::sync::Arc::new(stub);
        let analyzer = Analyzer::new(Box::new(Shared(stub.clone())), ImageConfig::default());
        (analyzer, stub)
    }

    // ── Analyzer::analyze ────────────────────────────────────────────

    #[tokio::test]
    async fn analyze_normalizes_response() {
        let (analyzer, _) =
            analyzer_with(StubService::replying("Here's what I see:\nA red car.\n\nIn conclusion, it's nice."));
        let image = ImagePayload::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();

        let result = analyzer.analyze(&image, AnalysisType::Detailed).await.unwrap();
        assert_eq!(result.text, "A red car.");
        assert_eq!(result.kind, AnalysisType::Detailed);
    }

    #[tokio::test]
    async fn analyze_sends_instruction_and_unwrapped_payload() {
        let (analyzer, stub) = analyzer_with(StubService::replying("Sunset vibes #beach"));
        let image = ImagePayload::from_data_url("data:image/webp;base64,UklGRg==").unwrap();

        analyzer.analyze(&image, AnalysisType::Instagram).await.unwrap();

        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (prompt, data, mime) = &requests[0];
        assert_eq!(prompt, &analysis::build_instruction(AnalysisType::Instagram));
        assert_eq!(data, "UklGRg==");
        assert_eq!(mime, SUBMISSION_MIME_TYPE);
    }

    #[tokio::test]
    async fn analyze_wrapped_and_bare_payloads_match() {
        let (analyzer, stub) = analyzer_with(StubService::replying("ok"));
        let wrapped = ImagePayload::from_data_url("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        let bare = ImagePayload::from_bytes(&[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10], "image/jpeg");

        analyzer.analyze(&wrapped, AnalysisType::Midjourney).await.unwrap();
        analyzer.analyze(&bare, AnalysisType::Midjourney).await.unwrap();

        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests[0].1, "/9j/4AAQ");
        assert_eq!(requests[0].1, requests[1].1);
    }

    #[tokio::test]
    async fn analyze_service_error_is_failure() {
        let (analyzer, _) = analyzer_with(StubService::failing("503 Service Unavailable"));
        let image = ImagePayload::from_bytes(b"img", "image/jpeg");

        let err = analyzer
            .analyze(&image, AnalysisType::StableDiffusion)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to analyze image. Please try again.");
        assert!(err.source().is_some());
        // The service's own error is passed through without another wrapper.
        assert_eq!(err.cause().to_string(), "503 Service Unavailable");
    }

    #[tokio::test]
    async fn analyze_empty_after_cleanup_is_failure() {
        let (analyzer, _) = analyzer_with(StubService::replying("In conclusion, a picture."));
        let image = ImagePayload::from_bytes(b"img", "image/jpeg");

        let result = analyzer.analyze(&image, AnalysisType::Detailed).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn analyze_blank_response_is_failure() {
        let (analyzer, _) = analyzer_with(StubService::replying("  **  \n"));
        let image = ImagePayload::from_bytes(b"img", "image/jpeg");
        assert!(analyzer.analyze(&image, AnalysisType::Instagram).await.is_err());
    }

    #[tokio::test]
    async fn analyze_file_reads_and_submits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(2, 2)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        fs::write(&path, bytes.into_inner()).unwrap();

        let (analyzer, stub) = analyzer_with(StubService::replying("- a black square"));
        let result = analyzer.analyze_file(&path, AnalysisType::Detailed).await.unwrap();
        assert_eq!(result.text, "a black square");
        assert_eq!(stub.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn analyze_file_missing_is_failure_without_request() {
        let (analyzer, stub) = analyzer_with(StubService::replying("unused"));
        let result = analyzer
            .analyze_file(Path::new("/nonexistent/photo.jpg"), AnalysisType::Detailed)
            .await;
        assert!(result.is_err());
        assert!(stub.requests.lock().unwrap().is_empty());
    }

    // ── build_service ────────────────────────────────────────────────

    #[test]
    fn build_service_requires_key() {
        assert!(build_service(&Config::default()).is_err());
    }

    #[test]
    fn build_service_with_key() {
        let mut config = Config::default();
        config.gemini.api_key = "AIza-test".into();
        let service = build_service(&config).unwrap();
        assert_eq!(service.name(), "Gemini");
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn supported_image_extensions() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(!is_supported_image(Path::new("photo.heic")));
        assert!(!is_supported_image(Path::new("readme.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn collect_images_directory_recursive_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("b.jpg"), b"fake").unwrap();
        fs::write(dir.path().join("a.png"), b"fake").unwrap();
        fs::write(sub.join("c.webp"), b"fake").unwrap();
        fs::write(sub.join("d.txt"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 3);
        let mut sorted = images.clone();
        sorted.sort();
        assert_eq!(images, sorted);
    }

    #[test]
    fn collect_images_skips_unsupported_and_missing() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, b"hello").unwrap();

        let images = collect_images(&[txt, PathBuf::from("/nonexistent/path.jpg")]);
        assert!(images.is_empty());
    }
}
