pub mod git_state;
pub mod test_dependencies;
pub mod traits;

pub use git_state::GitStateTracker;
pub use traits::{
    BaseEntityDatabase, BasePublicationService, BaseScrapingService, BaseSearchService,
    BaseStateTracker,
};
