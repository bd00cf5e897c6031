mod model;
mod store;

pub use model::{Role, Session};
pub use store::SessionStore;
