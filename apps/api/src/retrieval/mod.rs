// Retrieval-augmented context engine.
// synthesizer → embedding → index at build time; query → embedding → search → assembly at query time.

pub mod embedding;
pub mod engine;
pub mod handlers;
pub mod index;
pub mod prompts;
pub mod synthesizer;
