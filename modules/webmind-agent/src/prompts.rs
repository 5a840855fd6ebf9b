//! Prompt construction for the sufficiency check and the failure summary.

/// Build the sufficiency-check prompt for one scraped page. `scraped_text`
/// must already be truncated to the active model's context cap.
pub fn sufficiency_prompt(query: &str, url: &str, scraped_text: &str) -> String {
    format!(
        r#"Original User Query: "{query}"

Text Scraped from: {url}
--- START SCRAPED TEXT ---
{scraped_text}
--- END SCRAPED TEXT ---

Instruction: Based *only* on the 'SCRAPED TEXT' above, determine if you can answer the 'Original User Query'.

- If the scraped text directly answers the query, respond with "Final Answer:" followed by your answer.
- If the scraped text is insufficient or irrelevant, respond *only* with: "Insufficient context"

Important:
- Use only information from the scraped text, not prior knowledge.
- Do not infer information not explicitly stated in the text.
- If the query asks for specific details missing from the text, it is insufficient.

Example 1:
Query: "What is the capital of France?"
Text: "France is a country in Europe known for its cuisine and landmarks like the Eiffel Tower."
Response: "Insufficient context"

Example 2:
Query: "When was the iPhone 15 Pro Max released?"
Text: "The iPhone 7 was released in 2016 with no headphone jack."
Response: "Insufficient context"
"#
    )
}

/// Build the prompt asking the model to briefly explain why no tried URL
/// yielded a sufficient answer.
pub fn failure_summary_prompt(query: &str, tried_urls: &[String]) -> String {
    let tried_urls_list = tried_urls
        .iter()
        .map(|u| format!("- {u}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Original User Query: "{query}"

I attempted to answer by scraping these URLs, but none provided sufficient context:
{tried_urls_list}

Provide a brief (1-2 sentence) explanation for why finding a direct answer might have been difficult.

Possible reasons:
- Query too broad or vague (lacks specificity)
- Query too specific or niche (requires rare/detailed data)
- Query about a very recent event (information not widely available)
- URLs scraped seem unrelated to the query
- Other reasons (specify)

Please identify which reason(s) likely apply.
"#
    )
}
