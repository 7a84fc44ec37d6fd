//! HTML fragments returned by `/generate`.

use crate::agent::{ModelResponse, StructuredResult};
use crate::error::{CompanionError, ErrorCategory};

pub fn response(response: &ModelResponse) -> String {
    match response {
        ModelResponse::FreeText(text) => free_text(text),
        ModelResponse::Structured(result) => structured(result),
    }
}

pub fn free_text(text: &str) -> String {
    format!("<h1>AI Response:</h1><div>{}</div>", line_breaks(text))
}

pub fn structured(result: &StructuredResult) -> String {
    let code = field(&result.code, "Code");
    let explanation = field(&result.explanation, "Explanation");
    let dependencies = field(&result.dependencies, "Dependencies");

    format!(
        "<h1>AI Response:</h1>\n\
         <h2>Code</h2>\n<pre><code>{}</code></pre>\n\
         <h2>Explanation</h2>\n<div>{}</div>\n\
         <h2>Dependencies</h2>\n<div>{}</div>",
        escape_angle_brackets(&code),
        line_breaks(&explanation),
        dependencies,
    )
}

/// Fragment for a failed request.  Network and parse failures keep their
/// own headings; everything else is reported as unexpected.
pub fn error(err: &CompanionError) -> String {
    let details = escape_angle_brackets(&err.to_string());
    match err.category() {
        ErrorCategory::Network => format!(
            "<h1>A Network Error Occurred</h1><p>Could not connect to the API. Details: {details}</p>"
        ),
        ErrorCategory::Parse => format!(
            "<h1>Error</h1><p>Could not parse the response from the API. Details: {details}</p>"
        ),
        ErrorCategory::Unexpected => {
            format!("<h1>An Unexpected Error Occurred</h1><p>Details: {details}</p>")
        }
    }
}

pub fn missing_prompt() -> String {
    "<h1>Error</h1><p>Please enter a prompt.</p>".to_string()
}

/// Fragment for a request body that is not a readable form.
pub fn invalid_form(details: &str) -> String {
    format!(
        "<h1>Error</h1><p>Could not read the submitted form. Details: {}</p>",
        escape_angle_brackets(details)
    )
}

fn field(value: &Option<String>, label: &str) -> String {
    value
        .clone()
        .unwrap_or_else(|| format!("Error: {label} not found."))
}

fn line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "<br>")
}

fn escape_angle_brackets(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}
