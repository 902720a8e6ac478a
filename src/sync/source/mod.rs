pub mod api;
pub mod feed;
pub mod mock;

pub use api::OfflineSource;
pub use feed::TransactionFeed;
pub use mock::MockSource;
