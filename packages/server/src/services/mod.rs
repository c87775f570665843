pub mod publication;
pub mod scraping;
pub mod search;

pub use publication::PublicationService;
pub use scraping::{NullScrapingService, OpenAiScrapingService};
pub use search::FileSearchService;
