// All LLM prompt constants for the Diary module.

/// System prompt for single-word sentiment classification.
pub const SENTIMENT_SYSTEM: &str = "\
    You are a sentiment analyzer. \
    Respond with only one word: 'positive', 'negative', or 'neutral'.";

/// Sentiment prompt template. Replace `{text}` before sending.
pub const SENTIMENT_PROMPT_TEMPLATE: &str = "Analyze the sentiment of this health diary entry: {text}";

/// System prompt for diary suggestions.
pub const SUGGESTIONS_SYSTEM: &str = "\
    You are a health assistant. \
    Provide 2-3 gentle, actionable suggestions based on health diary entries. \
    Be supportive and professional. \
    Format as a simple list with one suggestion per line.";

/// Suggestions prompt template. Replace `{entries}` with `type: text` lines before sending.
pub const SUGGESTIONS_PROMPT_TEMPLATE: &str = "\
Based on these diary entries, provide suggestions:
{entries}";
