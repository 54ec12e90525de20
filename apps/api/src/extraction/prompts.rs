// Prompt text for job posting extraction.
// Templates take `{schema}` and `{content}`; content is substituted last so
// braces inside page text are never treated as placeholders.

use serde::{Deserialize, Serialize};

use crate::extraction::normalize::RawContent;

/// System prompt for extraction; enforces JSON-only output.
pub const EXTRACTION_SYSTEM: &str = "You are a precise job posting analyst. \
    Extract structured information from job postings. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Short prompt for cost-sensitive deployments.
pub const STANDARD_PROMPT_TEMPLATE: &str = r#"Extract key information from the following job posting content.
Return a JSON object with these EXACT field names:
- "position": The job position or title
- "company": The company name
- "description": A brief one-sentence summary
- "keywords": An array of 5-10 key skills, technologies, or requirements
- "url": The posting URL if it appears in the content, otherwise an empty string

Make sure to follow the exact format specified below:

{schema}

JOB POSTING CONTENT:
{content}"#;

/// Detailed prompt: richer keyword heuristics plus deadline/start date resolution.
pub const DETAILED_PROMPT_TEMPLATE: &str = r#"Extract key information from the following job posting content.
Return a JSON object with these EXACT field names:
- "position": The exact job title as written in the posting
- "company": The name of the hiring company (not the job board or recruiter platform)
- "description": A single sentence summarising the role and its main responsibility
- "keywords": 5-12 of the most important requirements. Look for:
    * required skills and technologies
    * technical requirements (tools, frameworks, platforms)
    * years-of-experience phrases (e.g. "5+ years backend development")
    * education requirements (degrees, fields of study)
    * language requirements (spoken languages)
    * industry knowledge
    * leadership or management requirements
- "url": The posting URL if it appears in the content, otherwise an empty string
- "deadline": The application deadline
- "start_date": The expected start date

DATE RULES for "deadline" and "start_date":
- Write a concrete date as YYYY-MM-DD.
- If the posting asks for applications or a start "as soon as possible", "immediately" or on a rolling basis, use "ASAP".
- Resolve relative phrases (e.g. "next month", "end of the year") to a concrete YYYY-MM-DD date when possible; otherwise omit the field.
- Never return any other free text for these fields.

{schema}

JOB POSTING CONTENT:
{content}"#;

/// Wording variant of the extraction prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    Standard,
    #[default]
    Detailed,
}

impl PromptVariant {
    fn template(self) -> &'static str {
        match self {
            PromptVariant::Standard => STANDARD_PROMPT_TEMPLATE,
            PromptVariant::Detailed => DETAILED_PROMPT_TEMPLATE,
        }
    }
}

/// Composes the extraction prompt. Content arrives already budget-bounded;
/// nothing here truncates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    variant: PromptVariant,
}

impl PromptBuilder {
    pub fn new(variant: PromptVariant) -> Self {
        Self { variant }
    }

    pub fn build(&self, content: &RawContent, schema_description: &str) -> String {
        self.variant
            .template()
            .replace("{schema}", schema_description)
            .replace("{content}", content.as_str())
    }
}
