pub mod ingest;
pub mod metadata;
pub mod palette;
