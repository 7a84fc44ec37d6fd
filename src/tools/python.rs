use rustpython_parser::{Mode, parse};
use serde_json::{Map, Value};

use super::{Tool, ToolResult};

pub const VALID_SYNTAX_MESSAGE: &str = "Code syntax is valid.";

// -- validate_python_code ------------------------------------------------

/// Checks that a snippet of Python parses.  The code is only parsed into a
/// syntax tree, never executed.
pub struct ValidatePythonCodeTool;

impl Tool for ValidatePythonCodeTool {
    fn name(&self) -> &str {
        "validate_python_code"
    }

    fn description(&self) -> &str {
        "Check whether a snippet of Python code is syntactically valid. \
         Returns a status of success or error with the parser's message."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "required": ["code_string"],
            "properties": {
                "code_string": {
                    "type": "string",
                    "description": "The Python code to check, optionally wrapped in ``` fences"
                }
            }
        })
    }

    fn execute(&self, args: &Map<String, Value>) -> ToolResult {
        let code = args
            .get("code_string")
            .and_then(Value::as_str)
            .unwrap_or_default();
        check_syntax(strip_fences(code, "python"))
    }
}

/// Parse `source` as a Python module.
pub fn check_syntax(source: &str) -> ToolResult {
    match parse(source, Mode::Module, "<snippet>") {
        Ok(_) => ToolResult::success(VALID_SYNTAX_MESSAGE),
        Err(e) => ToolResult::error(format!("Syntax error: {e}")),
    }
}

/// Remove a surrounding Markdown code fence, with or without `language` as
/// the info string.  Text without an opening fence is returned unchanged.
pub fn strip_fences<'a>(text: &'a str, language: &str) -> &'a str {
    let Some(after_open) = text.trim().strip_prefix("```") else {
        return text;
    };

    let body = match after_open.strip_prefix(language) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with('`') => rest,
        _ => after_open,
    };
    let body = body.strip_suffix("```").unwrap_or(body);

    body.trim_start_matches(['\r', '\n']).trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolStatus;
    use serde_json::json;

    fn run(code: &str) -> ToolResult {
        let args = json!({ "code_string": code });
        ValidatePythonCodeTool.execute(args.as_object().unwrap())
    }

    #[test]
    fn valid_unfenced_code() {
        assert_eq!(run("print(1)"), ToolResult::success(VALID_SYNTAX_MESSAGE));
    }

    #[test]
    fn valid_code_in_python_fence() {
        let code = "```python\ndef add(a, b):\n    return a + b\n```";
        assert_eq!(run(code), ToolResult::success(VALID_SYNTAX_MESSAGE));
    }

    #[test]
    fn valid_code_in_bare_fence() {
        assert!(run("```\nimport os\nprint(os.getcwd())\n```").is_success());
    }

    #[test]
    fn syntax_error_reports_message() {
        let result = run("def f(:");
        assert_eq!(result.status, ToolStatus::Error);
        assert!(result.message.starts_with("Syntax error: "));
        assert!(result.message.len() > "Syntax error: ".len());
    }

    #[test]
    fn syntax_error_inside_fence() {
        assert!(!run("```python\nfor x in range(3)\n    print(x)\n```").is_success());
    }

    #[test]
    fn indentation_survives_fence_stripping() {
        let code = "```python\nif True:\n    x = 1\n    y = 2\n```";
        assert!(run(code).is_success());
    }

    #[test]
    fn short_and_degenerate_inputs_do_not_panic() {
        for code in ["", "`", "``", "```", "````", "```python", "``````", "```python```"] {
            let _ = run(code);
        }
        assert!(run("```").is_success());
    }

    #[test]
    fn missing_argument_defaults_to_empty_code() {
        let result = ValidatePythonCodeTool.execute(&Map::new());
        assert!(result.is_success());
    }

    #[test]
    fn strip_fences_variants() {
        assert_eq!(strip_fences("```python\nx = 1\n```", "python"), "x = 1");
        assert_eq!(strip_fences("```\nx = 1\n```", "python"), "x = 1");
        assert_eq!(strip_fences("  ```json\n{}\n```  ", "json"), "{}");
        assert_eq!(strip_fences("x = 1", "python"), "x = 1");
        assert_eq!(strip_fences("```python", "python"), "");
        assert_eq!(strip_fences("```pythonic = 1```", "python"), "pythonic = 1");
    }
}
