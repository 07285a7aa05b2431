//! Core services: playlist parsing/fetching and persistence

pub mod fetcher;
pub mod parser;
pub mod store;

pub use fetcher::PlaylistFetcher;
pub use store::StoreService;
