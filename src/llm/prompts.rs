use crate::config::ResponseFormat;

const PERSONA: &str = r#"You are "Code Companion", an expert programmer and software architect.

Help the user by writing high-quality, efficient and secure code for their request.
Explain clearly how the code works and list any dependencies needed to run it.

Rules:
1. Prefer secure, efficient code that follows modern best practices.
2. If the request is ambiguous, ask for clarification.
3. Refuse to write code that is malicious, unethical or could cause harm, and say why.
4. Keep the explanation simple enough for a junior developer."#;

const JSON_FORMAT: &str = r#"Always answer with a single JSON object and nothing else:

{"code": "<the code as a string>", "explanation": "<how it works>", "dependencies": "<what must be installed, or \"None\">"}"#;

const TOOL_HINT: &str = "Before answering with Python code you may call the \
validate_python_code function to check that it parses. If it reports a syntax \
error, fix the code before you answer.";

/// Build the system instruction sent with every request.
///
/// A non-empty `override_prompt` replaces the built-in persona; the format
/// and tool sections are still appended so the response stays parseable.
pub fn system_prompt(override_prompt: &str, format: ResponseFormat, tools_enabled: bool) -> String {
    let mut prompt = if override_prompt.trim().is_empty() {
        PERSONA.to_string()
    } else {
        override_prompt.trim().to_string()
    };

    if format == ResponseFormat::Json {
        prompt.push_str("\n\n");
        prompt.push_str(JSON_FORMAT);
    }

    if tools_enabled {
        prompt.push_str("\n\n");
        prompt.push_str(TOOL_HINT);
    }

    prompt
}
