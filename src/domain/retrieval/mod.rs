//! Retrieval domain - candidate passages and the retriever contract

mod passage;
mod retriever;

pub use passage::Passage;
pub use retriever::Retriever;

#[cfg(test)]
pub use retriever::MockRetriever;
