//! Prompt templates for every research stage
//!
//! - Brief writer: user messages → one detailed research question
//! - Supervisor: plans and delegates with `ConductResearch`
//! - Researcher: bounded search loop with `think_tool` reflection
//! - Compression: cleans a researcher transcript into a note
//! - Final report: brief + notes → cited report
//! - Webpage summarizer: condenses raw search pages

use chrono::Utc;

/// Today's date as it appears in prompts, e.g. "Mon Oct 19, 2026"
pub fn today() -> String {
    Utc::now().format("%a %b %-d, %Y").to_string()
}

/// Prompt templates for the research pipeline
pub struct ResearchPrompts;

impl ResearchPrompts {
    const BRIEF: &'static str = r#"You will be given a set of messages exchanged so far between yourself and the user.
Your job is to translate these messages into a more detailed and concrete research question that will be used to guide the research.

The messages are:
<Messages>
{messages}
</Messages>

Today's date is {date}.

Guidelines:
1. Maximize specificity and detail: include all known user preferences and list the key attributes or dimensions to consider.
2. Fill in unstated but necessary dimensions as open-ended; do not invent constraints the user did not give.
3. Avoid unwarranted assumptions; state explicitly when a dimension has no preference.
4. Phrase the request from the perspective of the user, in the first person.
5. If specific sources should be prioritized, say so.

Respond with a single JSON object and nothing else:
{"research_brief": "<the research question>"}"#;

    const SUPERVISOR: &'static str = r#"You are a research supervisor. Your job is to conduct research by calling the "ConductResearch" tool. For context, today's date is {date}.

<Task>
Call "ConductResearch" to delegate research on the overall question passed in by the user.
When you are completely satisfied with the findings returned from the tool calls, call "ResearchComplete".
</Task>

<Available Tools>
1. **ConductResearch**: Delegate research on one topic to a dedicated researcher
2. **ResearchComplete**: Indicate that research is complete
3. **think_tool**: Reflect and plan. Use it before calling ConductResearch to plan, and after each ConductResearch to assess progress.
</Available Tools>

<Hard Limits>
- Bias towards a single researcher unless the request clearly benefits from parallelism
- Use at most {max_concurrent_research_units} parallel ConductResearch calls per turn
- Stop after {max_researcher_iterations} rounds of delegation even if the research is not perfect
- Stop when you can answer the question confidently
</Hard Limits>

<Scaling Rules>
- Simple fact-finding, lists and rankings: one researcher
- Comparisons: one researcher per element of the comparison
- Each ConductResearch call spawns an independent researcher that only sees the topic you give it: make each topic standalone and detailed, with no acronyms or abbreviations
</Scaling Rules>"#;

    const RESEARCHER: &'static str = r#"You are a research assistant conducting research on the user's input topic. For context, today's date is {date}.

<Task>
Use tools to gather information about the user's input topic, in a loop, until you can answer the question.
</Task>

<Available Tools>
1. **tavily_search**: Web search. Pass several related queries at once.
2. **think_tool**: Reflection and strategic planning during research.
3. **ResearchComplete**: Call when you have enough information.
**CRITICAL: Use think_tool after each search to reflect on results and plan next steps. Do not call think_tool in parallel with any other tool.**
</Available Tools>

<Instructions>
1. Read the question carefully
2. Start with broader searches
3. After each search, pause and assess: do I have enough to answer? What is still missing?
4. Execute narrower searches as you gather information
5. Stop when you can answer confidently
</Instructions>

<Hard Limits>
- Simple queries: 2-3 search tool calls maximum
- Complex queries: up to 5 search tool calls maximum
- Stop after 5 search tool calls if you cannot find the right sources
- Stop immediately when you can answer comprehensively, have 3+ relevant sources, or your last 2 searches returned similar information
</Hard Limits>"#;

    const COMPRESSION_SYSTEM: &'static str = r#"You are a research assistant that has conducted research on a topic by calling several tools and web searches. Your job is now to clean up the findings, but preserve all of the relevant statements and information that the researcher has gathered. For context, today's date is {date}.

<Task>
Clean up information gathered from tool calls and web searches in the existing messages.
All relevant information should be repeated and rewritten verbatim, in a cleaner format.
Do not lose any details or sources: a later step merges this report with others.
</Task>

<Output Format>
**List of Queries and Tool Calls Made**
**Fully Comprehensive Findings**
**List of All Relevant Sources (with citations in the report)**
</Output Format>

<Citation Rules>
- Assign each unique URL a single citation number in your text
- End with ### Sources listing each source with its number
- Number sources sequentially without gaps (1,2,3,4...)
- Format: [1] Source Title: URL
</Citation Rules>

Critical: any information even remotely relevant to the research topic must be preserved verbatim."#;

    const COMPRESSION_HUMAN: &'static str = "All above messages are about research conducted by an AI Researcher. \
Please clean up these findings.\n\nDO NOT summarize the information. I want the raw information returned, just in a cleaner format. \
Make sure all relevant information is preserved - you can rewrite findings verbatim.";

    const FINAL_REPORT: &'static str = r#"Based on all the research conducted, create a comprehensive, well-structured answer to the overall research brief:
<Research Brief>
{research_brief}
</Research Brief>

For more context, here are all of the messages so far:
<Messages>
{messages}
</Messages>

Today's date is {date}.

Here are the findings from the research that you conducted:
<Findings>
{findings}
</Findings>

Please create a detailed answer to the overall research brief that:
1. Is well-organized with proper headings (# for title, ## for sections, ### for subsections)
2. Includes specific facts and insights from the research
3. References relevant sources using [Title](URL) format
4. Provides a balanced, thorough analysis
5. Includes a "Sources" section at the end with all referenced links

Write in the same language as the user's messages.

<Citation Rules>
- Assign each unique URL a single citation number in your text
- End with ### Sources listing each source with its number
- Number sources sequentially without gaps (1,2,3,4...)
- Format: [1] Source Title: URL
</Citation Rules>"#;

    const SUMMARIZE_WEBPAGE: &'static str = r#"You are tasked with summarizing the raw content of a webpage retrieved from a web search. Your goal is to create a summary that preserves the most important information from the original web page. Today's date is {date}.

<webpage_content>
{webpage_content}
</webpage_content>

Guidelines:
1. Identify and preserve the main topic or purpose of the webpage.
2. Retain key facts, statistics, and data points central to the content's message.
3. Keep important quotes from credible sources or experts.
4. Maintain the chronological order of events for time-sensitive or historical content.
5. Preserve lists or step-by-step instructions if present.

Aim for about 25-30 percent of the original length.

Respond with a single JSON object and nothing else:
{"summary": "<summary>", "key_excerpts": "<up to 5 important quotes or excerpts>"}"#;

    pub fn brief(messages: &str) -> String {
        PromptBuilder::new(Self::BRIEF)
            .with("messages", messages)
            .with("date", today())
            .build()
    }

    pub fn supervisor(max_concurrent_research_units: usize, max_researcher_iterations: usize) -> String {
        PromptBuilder::new(Self::SUPERVISOR)
            .with("date", today())
            .with("max_concurrent_research_units", max_concurrent_research_units.to_string())
            .with("max_researcher_iterations", max_researcher_iterations.to_string())
            .build()
    }

    pub fn researcher() -> String {
        PromptBuilder::new(Self::RESEARCHER).with("date", today()).build()
    }

    pub fn compression_system() -> String {
        PromptBuilder::new(Self::COMPRESSION_SYSTEM)
            .with("date", today())
            .build()
    }

    /// Closing instruction appended after the researcher transcript
    pub fn compression_human() -> &'static str {
        Self::COMPRESSION_HUMAN
    }

    pub fn final_report(research_brief: &str, messages: &str, findings: &str) -> String {
        PromptBuilder::new(Self::FINAL_REPORT)
            .with("research_brief", research_brief)
            .with("messages", messages)
            .with("findings", findings)
            .with("date", today())
            .build()
    }

    pub fn summarize_webpage(webpage_content: &str) -> String {
        PromptBuilder::new(Self::SUMMARIZE_WEBPAGE)
            .with("date", today())
            .with("webpage_content", webpage_content)
            .build()
    }
}

/// Prompt builder for `{name}` placeholder substitution
pub struct PromptBuilder {
    template: String,
}

impl PromptBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute every `{name}` placeholder with `value`
    pub fn with(mut self, name: &str, value: impl AsRef<str>) -> Self {
        let placeholder = format!("{{{}}}", name);
        self.template = self.template.replace(&placeholder, value.as_ref());
        self
    }

    pub fn build(self) -> String {
        self.template
    }
}
