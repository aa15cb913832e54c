//! # image-analyzer
//!
//! AI image analyzer — send an image to Google Gemini and get back an
//! Instagram caption, a detailed breakdown, a Midjourney prompt, or a Stable
//! Diffusion prompt, cleaned up into plain text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use image_analyzer::analysis::AnalysisType;
//! use image_analyzer::config::Config;
//! use image_analyzer::format::FormattedResult;
//! use image_analyzer::pipeline::{Analyzer, build_service};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load config (API key, model, image settings) and fall back to GEMINI_API_KEY
//!     let mut config = Config::load(Some("config.json".as_ref()))?;
//!     config.apply_env();
//!
//!     let analyzer = Analyzer::new(build_service(&config)?, config.image.clone());
//!
//!     let result = analyzer
//!         .analyze_file(Path::new("photo.jpg"), AnalysisType::Midjourney)
//!         .await?;
//!
//!     // Plain text, ready to copy
//!     println!("{}", result.text);
//!
//!     // Or split into prompt + parameters for display
//!     print!("{}", FormattedResult::from_result(&result));
//!     Ok(())
//! }
//! ```
//!
//! ## Analysis Types
//!
//! | Type | Output |
//! |------|--------|
//! | `instagram` | Caption followed by 5-7 hashtags |
//! | `detailed` | `Section: text` blocks separated by blank lines |
//! | `midjourney` | Prompt with `--ar`, `--v`, `--s`, `--q` parameters |
//! | `stable-diffusion` | Prompt with `--negative`, `--steps`, `--cfg` parameters |
//!
//! ## Modules
//!
//! - [`analysis`] — Analysis types and their instruction templates
//! - [`ai`] — Generative service trait and the Gemini implementation
//! - [`config`] — Configuration types and loading/saving
//! - [`error`] — The [`error::AnalysisFailure`] error type
//! - [`format`] — Type-specific display formatting of results
//! - [`normalize`] — Response cleanup rules
//! - [`payload`] — Image payload handling (data URLs, files, JPEG transcoding)
//! - [`pipeline`] — The analysis pipeline and image collection
//! - `progress` — Cosmetic progress ticker (`cli` feature)

pub mod ai;
pub mod analysis;
pub mod config;
pub mod error;
pub mod format;
pub mod normalize;
pub mod payload;
pub mod pipeline;
#[cfg(feature = "cli")]
pub mod progress;
