//! Relevance scoring: normalization, skill matching, embeddings, and fusion

pub mod text_processor;
pub mod skill_matcher;
pub mod scoring;
pub mod embeddings;
pub mod embedding_manager;
pub mod analyzer;
