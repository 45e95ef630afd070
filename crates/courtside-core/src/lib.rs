// Live-match core: match records, store adapters, selection and score
// synthesis. Presentation lives in the `courtside` crate.

pub mod demo;
pub mod error;
pub mod model;
pub mod recency;
pub mod selector;
pub mod store;
pub mod synth;
