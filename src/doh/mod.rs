//! Translation between DNS messages and the JSON DoH API.
//!
//! `query` turns a validated question into the API's query string, `answer`
//! turns the API's JSON body back into a DNS reply.

pub mod answer;
pub mod query;

pub use answer::{DohAnswer, DohResponse, decode, reply, reply_code};
pub use query::{DohQuery, encode};
