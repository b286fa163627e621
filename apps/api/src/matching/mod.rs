//! CV/JD matching: load a CV, retrieve its most relevant passages for a job
//! description, ask the generative model for a structured assessment, and repair
//! and validate what comes back.
//!
//! Entry point: [`pipeline::MatchPipeline`]. HTTP surface: [`handlers`].

pub mod embeddings;
pub mod error;
pub mod handlers;
pub mod index;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod requirements;
pub mod result;
pub mod retry;
pub mod sanitizer;
pub mod segmenter;

#[cfg(test)]
pub mod testing;
