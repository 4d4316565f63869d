//! Generic data access: typed cache keys, filters as data, query state and
//! the client that ties them to a backend.

pub mod client;
pub mod filter;
pub mod key;
pub mod state;

pub use client::{Mutation, MutationRequest, Query, QueryClient};
pub use filter::{Filter, Match, NullsOrder, Order};
pub use key::{Collection, Invalidation, QueryKey, Report, Scope, Timeframe};
pub use state::QueryState;
