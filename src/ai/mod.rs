mod gemini;

pub use gemini::{GeminiService, extract_text};

use anyhow::Result;

/// Trait for multimodal generative services.
///
/// A service receives one instruction and one image and answers with one
/// block of generated text. The library ships with [`GeminiService`];
/// implement this trait to plug in another backend or a test double.
///
/// # Example
///
/// ```rust,no_run
/// use image_analyzer::ai::{AiService, GeminiService};
/// use image_analyzer::config::GeminiConfig;
///
/// # async fn example() -> anyhow::Result<()> {
/// let service = GeminiService::new(&GeminiConfig {
///     api_key: "AIza...".into(),
///     ..GeminiConfig::default()
/// })?;
/// let text = service
///     .generate("Describe this image.", "base64data", "image/jpeg")
///     .await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait AiService: Send + Sync {
    /// The display name of this service (e.g., "Gemini").
    fn name(&self) -> &str;

    /// Generate text for an image.
    ///
    /// * `prompt` — The instruction text
    /// * `image_base64` — The image bytes encoded as base64, without a data-URL prefix
    /// * `mime_type` — The declared MIME type of the image
    async fn generate(&self, prompt: &str, image_base64: &str, mime_type: &str) -> Result<String>;
}
