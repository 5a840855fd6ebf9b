/// One hit from a web search provider. Only `url` feeds the answer loop;
/// title and snippet are kept for display.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}
