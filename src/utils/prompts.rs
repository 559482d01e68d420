//! Prompt templates for the summarize and evaluate requests.

/// System message sent with every chat request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

pub const SUMMARY_TEMPLATE: &str = "
You are an expert in science communication. Your task is to read a research abstract and generate a clear, layman-friendly summary. Follow these guidelines:
- Clarity: Explain the abstract in simple, everyday language.
- Accuracy: Do not add any new information or interpretations.
- Structure: Cover four key points: Purpose, Methods, Results, and Conclusion.
- Length: Keep the summary under 150 words.
Here is the research:
{research}
Now, generate a lay summary.
";

pub const EVALUATION_TEMPLATE: &str = "
You have the following abstract and the lay summary. Now evaluate the lay summary using chain-of-thought:

### Step 2: Self-Evaluation (Chain-of-Thought Reasoning)
1. Contradiction Check: Does the lay summary contradict any information in the abstract? If yes, explain how.
2. Unsupported Claims Check: Does the summary include any information that is not explicitly stated in the abstract? If yes, list the unsupported claims.
3. Overall Accuracy Check: Does the summary fully and correctly capture the abstract\u{2019}s main points without omission or misinterpretation?

### Final Output
Return a final Boolean decision:
- True if the summary is accurate.
- False if it contains contradictions or unsupported claims.

**Abstract**:
{abstract}

**Lay Summary**:
{summary}

Provide your chain-of-thought reasoning and then a final True/False decision.
";

/// Builds the lay-summary request for the full document text.
pub fn summary_prompt(research: &str) -> String {
    fill_template(SUMMARY_TEMPLATE, &[("research", research)])
}

/// Builds the self-evaluation request for a document and its generated summary.
pub fn evaluation_prompt(abstract_text: &str, summary: &str) -> String {
    fill_template(
        EVALUATION_TEMPLATE,
        &[("abstract", abstract_text), ("summary", summary)],
    )
}

/// Replaces `{name}` placeholders in a single left-to-right pass over the template.
/// Substituted values are never rescanned, so braces inside them survive verbatim.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, value)| value.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let matched = values.iter().find_map(|(name, value)| {
            after
                .strip_prefix(name)
                .and_then(|tail| tail.strip_prefix('}'))
                .map(|tail| (*value, tail))
        });

        match matched {
            Some((value, tail)) => {
                out.push_str(value);
                rest = tail;
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
