//! Document Intelligence Engine.
//!
//! Post-OCR reasoning pipeline: takes OCR output (text plus per-word boxes
//! and confidences) and produces a structured extraction with an explainable
//! confidence score. See each submodule for the corresponding pipeline stage.
//!
//! The engine never depends on the image bytes, the OCR engine, or HTTP: it
//! consumes `OcrOutput` through the [`ocr_source::OcrSource`] trait and
//! returns a pure [`orchestrator::ExtractionResult`].

pub mod config;
pub mod confidence;
pub mod confirmation;
pub mod consensus;
pub mod error;
pub mod field_extractor;
pub mod fingerprint;
pub mod layout;
pub mod memory;
pub mod ocr_source;
pub mod orchestrator;
pub mod text_cleaner;
pub mod word;

pub use config::EngineConfig;
pub use error::{DocIntelError, Result};
pub use ocr_source::{DocumentHint, OcrOutput, OcrSource};
pub use orchestrator::{ExtractionResult, Orchestrator};
pub use word::OcrWord;
