pub mod memory;
pub mod model;
pub mod pg;
pub mod repo;
pub mod services;

pub use model::{PublicUser, Roles, User};
pub use repo::UserStore;
