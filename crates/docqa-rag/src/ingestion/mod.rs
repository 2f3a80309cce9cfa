//! Document ingestion: parsing, chunking and the processing pipeline

mod chunker;
mod llamaparse;
#[cfg(feature = "local-parser")]
mod local_parser;
mod parser;
mod processor;

pub use chunker::TextChunker;
pub use llamaparse::LlamaParseClient;
#[cfg(feature = "local-parser")]
pub use local_parser::LocalPdfParser;
pub use parser::{parse_file, read_document, DocumentParser};
pub use processor::{DocumentProcessor, ProcessedDocument};
