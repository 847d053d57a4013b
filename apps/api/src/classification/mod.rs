// Classification: RAG over the SIC / SOC vector stores, answered by the selected LLM.
// All LLM calls go through llm_client; all searches go through vector_store.

pub mod classifier;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod rephrase;
