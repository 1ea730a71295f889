pub mod error;
pub mod history;
pub mod store;

pub use error::StoreError;
pub use history::{HistorySource, PAGE_SIZE, SyntheticHistory};
pub use store::{ChatStore, NewMessage, Outcome};
