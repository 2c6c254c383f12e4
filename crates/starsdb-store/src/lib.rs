pub mod collection;
pub mod error;
pub mod integrity;
pub mod persistence;
pub mod role_registry;
pub mod store;

pub use collection::{EntityCollection, MergeOutcome};
pub use error::StoreError;
pub use integrity::{check, IntegrityIssue};
pub use persistence::{load_list, save_list};
pub use role_registry::RoleRegistry;
pub use store::{EntityStore, SaveReport, StoreCounts, StorePaths};
