pub mod compare;
pub mod policy;
pub mod runtime;
pub mod session;

pub use session::{context::SessionContext, Session};
