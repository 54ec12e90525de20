// Job posting extraction: normalize fetched content, prompt the model,
// parse its reply into a JobPostingRecord.
// All model calls go through llm_client; all fetching through scraping.

pub mod extractor;
pub mod handlers;
pub mod normalize;
pub mod parser;
pub mod prompts;
pub mod record;
pub mod schema;
