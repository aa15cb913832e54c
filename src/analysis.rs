use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Directive appended to every instruction, whatever the analysis type.
///
/// The model does not reliably honour it, which is why every response still
/// goes through [`crate::normalize::normalize_response`].
pub const CONCISE_DIRECTIVE: &str =
    "Keep the response focused and direct. Do not use any markdown formatting or special characters.";

/// The four analysis presets.
///
/// The textual identifiers (`instagram`, `detailed`, `midjourney`,
/// `stable-diffusion`) are shared by serde, [`FromStr`], [`fmt::Display`] and
/// the CLI `--type` flag.
///
/// # Example
///
/// ```rust
/// use image_analyzer::analysis::AnalysisType;
///
/// let kind: AnalysisType = "stable-diffusion".parse().unwrap();
/// assert_eq!(kind, AnalysisType::StableDiffusion);
/// assert_eq!(kind.to_string(), "stable-diffusion");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisType {
    /// A single Instagram caption followed by hashtags.
    Instagram,
    /// A sectioned breakdown (composition, colors, lighting, ...).
    Detailed,
    /// A Midjourney prompt with `--` parameters.
    Midjourney,
    /// A Stable Diffusion prompt with `--` parameters.
    StableDiffusion,
}

impl AnalysisType {
    /// Every variant, in display order.
    pub const ALL: [AnalysisType; 4] = [
        AnalysisType::Instagram,
        AnalysisType::Detailed,
        AnalysisType::Midjourney,
        AnalysisType::StableDiffusion,
    ];

    /// The identifier used on the command line and in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Detailed => "detailed",
            Self::Midjourney => "midjourney",
            Self::StableDiffusion => "stable-diffusion",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Instagram => "Instagram Caption",
            Self::Detailed => "Detailed Analysis",
            Self::Midjourney => "Midjourney Prompt",
            Self::StableDiffusion => "Stable Diffusion Prompt",
        }
    }

    /// One-line summary of what the preset produces.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Instagram => "Generate an engaging caption with relevant hashtags",
            Self::Detailed => "Get a comprehensive breakdown of the image",
            Self::Midjourney => "Create a prompt for Midjourney image generation",
            Self::StableDiffusion => "Generate a prompt for Stable Diffusion",
        }
    }

    /// The fixed instruction template for this preset.
    pub fn template(&self) -> &'static str {
        resolve(*self)
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        AnalysisType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown analysis type '{s}' (expected one of: instagram, detailed, midjourney, stable-diffusion)"
                )
            })
    }
}

/// Resolve the instruction template for an analysis type.
///
/// Total over the enum: adding a variant without a template fails to compile.
pub fn resolve(kind: AnalysisType) -> &'static str {
    match kind {
        AnalysisType::Detailed => {
            "Analyze this image in detail. Break down your analysis into these sections: Composition, Colors, Lighting, Subject Matter, Mood, and Technical Details. For each section, provide a concise but thorough description."
        }
        AnalysisType::Instagram => {
            "Generate an engaging Instagram caption for this image. Include relevant hashtags at the end. Keep the caption authentic and engaging, and limit to 5-7 relevant hashtags."
        }
        AnalysisType::Midjourney => {
            "Create a detailed Midjourney prompt that would generate an image similar to this one. Include specific style, lighting, composition, and technical parameters. Format as: [description] --ar [aspect ratio] --v 6 --s [style] --q [quality]"
        }
        AnalysisType::StableDiffusion => {
            "Create a detailed Stable Diffusion prompt that would generate an image similar to this one. Include specific style, lighting, composition, and technical parameters. Format as: [description] --negative [negative prompt] --steps 50 --cfg 7.5"
        }
    }
}

/// Build the full instruction sent to the model: template plus [`CONCISE_DIRECTIVE`].
pub fn build_instruction(kind: AnalysisType) -> String {
    format!("{} {CONCISE_DIRECTIVE}", resolve(kind))
}
