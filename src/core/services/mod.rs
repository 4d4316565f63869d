//! Backend contract and the hosted (PostgREST) implementation.

pub mod backend;
pub mod rest;

pub use backend::{Backend, Row, SelectRequest};
pub use rest::RestBackend;
