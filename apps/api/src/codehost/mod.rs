//! Code-host enrichment: identity resolution from resume text and
//! rate-limited public-profile repository retrieval.

pub mod fetcher;
pub mod resolver;

pub use fetcher::RepoFetcher;
