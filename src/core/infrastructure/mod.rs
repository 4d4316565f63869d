//! Cross-cutting pieces shared by the query layer: the result cache and the
//! session that gates every request.

pub mod cache;
pub mod session;

pub use cache::{CacheStats, QueryCache};
pub use session::{Identity, Session};
