pub mod service;
pub mod state;
pub mod store;

pub use service::SessionService;
pub use state::{Observation, SessionState};
pub use store::SessionStore;
