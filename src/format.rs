//! Display formatting of analysis results.
//!
//! Each analysis type has its own layout: detailed breakdowns are split into
//! titled sections, Instagram captions into caption text and hashtags, and
//! the two prompt generators into a prompt and its `--` parameters.

use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::analysis::AnalysisType;
use crate::pipeline::AnalysisResult;

lazy_static::lazy_static! {
    static ref HASHTAG_RE: Regex = Regex::new(r"#[a-zA-Z0-9]+").unwrap();
}

/// One `Title: body` block of a detailed analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// A result broken into its type-specific parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum FormattedResult {
    Sections { sections: Vec<Section> },
    Caption { caption: String, hashtags: Vec<String> },
    Prompt { prompt: String, params: Vec<String> },
}

impl FormattedResult {
    pub fn from_result(result: &AnalysisResult) -> Self {
        format_text(&result.text, result.kind)
    }
}

/// Split normalized text into the layout for `kind`.
pub fn format_text(text: &str, kind: AnalysisType) -> FormattedResult {
    match kind {
        AnalysisType::Detailed => FormattedResult::Sections {
            sections: split_sections(text),
        },
        AnalysisType::Instagram => {
            let (caption, hashtags) = split_caption(text);
            FormattedResult::Caption { caption, hashtags }
        }
        AnalysisType::Midjourney | AnalysisType::StableDiffusion => {
            let (prompt, params) = split_prompt(text);
            FormattedResult::Prompt { prompt, params }
        }
    }
}

/// Blank-line separated blocks, each split at its first colon.
fn split_sections(text: &str) -> Vec<Section> {
    text.split("\n\n")
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| match chunk.split_once(':') {
            Some((title, body)) => Section {
                title: title.trim().to_string(),
                body: body.trim().to_string(),
            },
            None => Section {
                title: chunk.trim().to_string(),
                body: String::new(),
            },
        })
        .collect()
}

/// Caption text before the first `#`, plus every hashtag in order.
fn split_caption(text: &str) -> (String, Vec<String>) {
    let caption = text.split('#').next().unwrap_or_default().trim().to_string();
    let hashtags = HASHTAG_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    (caption, hashtags)
}

/// Prompt text before the first `--`, plus each `--param`.
fn split_prompt(text: &str) -> (String, Vec<String>) {
    let mut pieces = text.split("--");
    let prompt = pieces.next().unwrap_or_default().trim().to_string();
    let params = pieces
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("--{p}"))
        .collect();
    (prompt, params)
}

impl fmt::Display for FormattedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormattedResult::Sections { sections } => {
                for (i, section) in sections.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    writeln!(f, "{}", section.title)?;
                    for line in section.body.lines() {
                        writeln!(f, "  │ {line}")?;
                    }
                }
                Ok(())
            }
            FormattedResult::Caption { caption, hashtags } => {
                writeln!(f, "{caption}")?;
                if !hashtags.is_empty() {
                    writeln!(f)?;
                    writeln!(f, "{}", hashtags.join(" "))?;
                }
                Ok(())
            }
            FormattedResult::Prompt { prompt, params } => {
                writeln!(f, "{prompt}")?;
                if !params.is_empty() {
                    writeln!(f)?;
                    writeln!(f, "{}", params.join(" "))?;
                }
                Ok(())
            }
        }
    }
}
