// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt sent with every oracle call.
pub const CAREER_COACH_SYSTEM: &str = "\
    You are an experienced technical recruiter, interviewer and career coach. \
    When asked for structured output, reply with exactly one JSON object inside a ```json code fence. \
    Do NOT wrap the JSON in any other markup. \
    Do NOT include apologies or meta commentary.";

/// Instruction appended to prompts whose answer must be a single JSON record.
pub const JSON_RECORD_INSTRUCTION: &str = "\
    Respond with a single JSON object in a ```json code fence. \
    Every field in the schema is required; never use null.";

/// Fills `{key}` placeholders in a prompt template in a single pass. Substituted values are
/// never rescanned, so user text containing `{key}` stays as written.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
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
    fn test_render_replaces_every_occurrence() {
        let out = render("{a} and {a} then {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and x then y");
    }

    #[test]
    fn test_render_does_not_expand_placeholders_inside_values() {
        let out = render(
            "Resume: {resume_text}\nJD: {job_description}",
            &[
                ("resume_text", "I wrote {job_description} templates"),
                ("job_description", "Backend role"),
            ],
        );
        assert_eq!(out, "Resume: I wrote {job_description} templates\nJD: Backend role");
    }

    #[test]
    fn test_render_keeps_literal_json_braces() {
        let out = render(r#"Schema: {"question": "{q}"}"#, &[("q", "text")]);
        assert_eq!(out, r#"Schema: {"question": "text"}"#);
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let out = render("{known} {unknown}", &[("known", "k")]);
        assert_eq!(out, "k {unknown}");
    }
}
