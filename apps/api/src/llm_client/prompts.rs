// Shared prompt fragments and prompt-building utilities.
// Each pipeline that needs LLM calls defines its own prompts.rs alongside it.

/// Appended to every clinical prompt.
pub const CLINICAL_ACCURACY_INSTRUCTION: &str = "\
    Be precise, professional, and maintain medical accuracy. \
    Do NOT invent findings that are not present in the provided text. \
    If information is missing, indicate that clearly.";

/// Appended to prompts whose answer is parsed line by line.
pub const PLAIN_TEXT_INSTRUCTION: &str = "\
    Respond in plain text only. \
    Do NOT use markdown tables or code fences. \
    Do NOT include explanations or apologies.";

/// Substitutes each `{key}` placeholder in `template` with its value.
///
/// Substitution is a single pass over the template: placeholders inside substituted values
/// are left as written. Unknown placeholders are kept verbatim.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_every_placeholder() {
        let out = fill(
            "Entries:\n{entries}\nGender: {gender} / {gender}",
            &[("entries", "mood: fine"), ("gender", "female")],
        );
        assert_eq!(out, "Entries:\nmood: fine\nGender: female / female");
    }

    #[test]
    fn test_fill_leaves_unknown_placeholders() {
        assert_eq!(fill("{a} {b}", &[("a", "x")]), "x {b}");
    }

    #[test]
    fn test_fill_does_not_expand_placeholders_in_values() {
        let out = fill(
            "D:{dictation}|C:{context}",
            &[("dictation", "said {context} verbatim"), ("context", "Patient gender: male")],
        );
        assert_eq!(out, "D:said {context} verbatim|C:Patient gender: male");
    }

    #[test]
    fn test_fill_keeps_stray_braces() {
        assert_eq!(fill("{ {a} }{", &[("a", "x")]), "{ x }{");
    }
}
