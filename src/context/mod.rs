pub mod store;

pub use store::{ContextStore, ContextStream};
