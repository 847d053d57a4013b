// Survey results and respondent feedback, persisted as JSON documents in the result store.

pub mod feedback;
pub mod handlers;
pub mod models;
pub mod store;
