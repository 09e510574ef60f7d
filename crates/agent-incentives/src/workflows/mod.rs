pub mod incentives;
pub mod ingest;
