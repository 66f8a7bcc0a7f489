pub mod config;
pub mod error;
pub mod frontmatter;
pub mod gate;
pub mod io;
pub mod lifecycle;
pub mod lock;
pub mod outcome;
pub mod paths;
pub mod reconcile;
pub mod release;
pub mod renumber;
pub mod sprint;
pub mod store;
pub mod ticket;
pub mod types;
pub mod workspace;

pub use error::{Result, SprintError};
