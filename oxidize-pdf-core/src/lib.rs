//! Post-OCR document field extraction with multi-detector consensus voting,
//! layout analysis, and persistent learning memory.

pub mod document_intelligence;
