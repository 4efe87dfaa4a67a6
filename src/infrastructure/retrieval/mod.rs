//! Development retrieval backend: lexical in-memory search over a loaded corpus

mod in_memory;
mod loader;

pub use in_memory::InMemoryRetriever;
pub use loader::CorpusLoader;
