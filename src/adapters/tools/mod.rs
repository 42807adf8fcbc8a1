//! Server-side tool adapters.

mod web_search;

pub use web_search::WebSearchAdapter;
