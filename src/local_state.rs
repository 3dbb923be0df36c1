pub mod store;

pub use store::{PersistedState, StateStore};
