pub mod cypher_builder;
pub mod parallel_fetcher;

pub use cypher_builder::{build_cypher, LabelKeyMap};
pub use parallel_fetcher::{fetch_all, BranchOutcome, FetchResult, GraphRequest, MarketRequest, SearchRequest};
