pub mod merge;
pub mod person;
pub mod role;
pub mod show;

pub use merge::{merge_list, merge_option, merge_sentinel, Mergeable};
pub use person::Person;
pub use role::{Role, RoleKey, RoleType};
pub use show::{ContentRating, Money, Show, ShowHeader, ShowType, TextWithId};
