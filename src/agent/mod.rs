pub mod structured;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, GenerationConfig, ResponseFormat};
use crate::error::{CompanionError, Result};
use crate::llm::{
    Content, FunctionCall, GenerateContentRequest, GenerationOptions, GenerativeBackend, Role,
    ToolDeclarations, prompts,
};
use crate::tools::{ToolRegistry, ToolResult};

pub use structured::{ModelResponse, StructuredResult};

/// Runs one prompt through the model.
///
/// Each call starts from an empty conversation.  If the model's first part
/// asks for a tool, that tool runs once and its result goes back in a second
/// request; otherwise the first response is the answer.  At most two backend
/// calls are made and nothing is retried.
pub struct ConversationDriver {
    backend: Arc<dyn GenerativeBackend>,
    tools: ToolRegistry,
    system_prompt: String,
    generation: GenerationOptions,
    response_format: ResponseFormat,
}

impl ConversationDriver {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        tools: ToolRegistry,
        system_prompt: String,
        generation: &GenerationConfig,
    ) -> Self {
        Self {
            backend,
            tools,
            system_prompt,
            generation: GenerationOptions::from(generation),
            response_format: generation.response_format,
        }
    }

    /// Build a driver with the built-in tools (when enabled) and the system
    /// prompt matching the configured response format.
    pub fn from_config(config: &Config, backend: Arc<dyn GenerativeBackend>) -> Self {
        let tools = if config.tools.enabled {
            ToolRegistry::builtin()
        } else {
            ToolRegistry::new()
        };
        let system_prompt = prompts::system_prompt(
            &config.system_prompt,
            config.generation.response_format,
            !tools.is_empty(),
        );

        info!(
            backend = backend.name(),
            tools = tools.len(),
            response_format = ?config.generation.response_format,
            "conversation driver ready"
        );

        Self::new(backend, tools, system_prompt, &config.generation)
    }

    fn request(&self, contents: Vec<Content>) -> GenerateContentRequest {
        let declarations = self.tools.declarations();
        GenerateContentRequest {
            system_instruction: Some(Content::instruction(self.system_prompt.clone())),
            contents,
            tools: if declarations.is_empty() {
                Vec::new()
            } else {
                vec![ToolDeclarations {
                    function_declarations: declarations,
                }]
            },
            generation_config: Some(self.generation.clone()),
        }
    }

    pub async fn run(&self, user_prompt: &str) -> Result<ModelResponse> {
        let mut contents = vec![Content::user_text(user_prompt)];

        let first = self
            .backend
            .generate_content(&self.request(contents.clone()))
            .await?;
        let first_part = first.first_part()?;

        let Some(call) = first_part.function_call.clone() else {
            let text = first_part.text.clone().ok_or_else(|| {
                CompanionError::ResponseShape("first part has neither text nor a function call".into())
            })?;
            debug!(len = text.len(), "answered without tools");
            return Ok(match self.response_format {
                ResponseFormat::Text => ModelResponse::FreeText(text),
                ResponseFormat::Json => structured::parse_structured(&text),
            });
        };

        let result = self.invoke_tool(&call);

        let mut model_turn = first.first_content()?.clone();
        model_turn.role.get_or_insert(Role::Model);
        contents.push(model_turn);
        contents.push(Content::function_response(call.name.clone(), result.to_value()));

        let second = self
            .backend
            .generate_content(&self.request(contents))
            .await?;
        let final_part = second.first_part()?;

        if let Some(extra_call) = &final_part.function_call {
            warn!(tool = %extra_call.name, "model asked for a second tool call; not executed");
        }

        let text = final_part.text.clone().ok_or_else(|| {
            CompanionError::ResponseShape("final response after tool call has no text".into())
        })?;
        Ok(ModelResponse::FreeText(text))
    }

    /// Run the requested tool.  Lookup and argument failures are turned into
    /// an error result so the model can react to them.
    fn invoke_tool(&self, call: &FunctionCall) -> ToolResult {
        info!(tool = %call.name, "model requested tool");
        match self.tools.execute(&call.name, &call.args) {
            Ok(result) => {
                debug!(tool = %call.name, success = result.is_success(), "tool finished");
                result
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call rejected");
                ToolResult::error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{ScriptedBackend, function_call_response, response, text_response};
    use serde_json::json;

    fn driver(backend: Arc<ScriptedBackend>, format: ResponseFormat) -> ConversationDriver {
        let mut config = Config::default();
        config.generation.response_format = format;
        ConversationDriver::from_config(&config, backend)
    }

    #[tokio::test]
    async fn plain_answer_uses_one_call() {
        let backend = Arc::new(ScriptedBackend::new(vec![text_response("Hello\nworld")]));
        let out = driver(backend.clone(), ResponseFormat::Text)
            .run("say hi")
            .await
            .unwrap();

        assert_eq!(out, ModelResponse::FreeText("Hello\nworld".into()));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn first_request_payload() {
        let backend = Arc::new(ScriptedBackend::new(vec![text_response("ok")]));
        driver(backend.clone(), ResponseFormat::Text)
            .run("write fizzbuzz")
            .await
            .unwrap();

        let body = backend.request(0);
        assert!(
            body["systemInstruction"]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("Code Companion")
        );
        assert_eq!(
            body["contents"],
            json!([{"role": "user", "parts": [{"text": "write fizzbuzz"}]}])
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "validate_python_code"
        );
        assert!(body["generationConfig"]["temperature"].is_number());
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[tokio::test]
    async fn tool_call_uses_two_calls_and_returns_result() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            function_call_response("validate_python_code", json!({"code_string": "print(1)"})),
            text_response("The code is valid."),
        ]));
        let out = driver(backend.clone(), ResponseFormat::Text)
            .run("check print(1)")
            .await
            .unwrap();

        assert_eq!(out, ModelResponse::FreeText("The code is valid.".into()));
        assert_eq!(backend.calls(), 2);

        let contents = backend.request(1)["contents"].clone();
        assert_eq!(contents.as_array().unwrap().len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(
            contents[1]["parts"][0]["functionCall"]["args"]["code_string"],
            "print(1)"
        );
        assert_eq!(contents[2]["role"], "function");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"],
            json!({
                "name": "validate_python_code",
                "response": {"status": "success", "message": "Code syntax is valid."}
            })
        );
    }

    #[tokio::test]
    async fn model_turn_is_echoed_unmodified() {
        let model_turn = json!({
            "role": "model",
            "parts": [{
                "functionCall": {"name": "validate_python_code", "args": {"code_string": "x = 1"}},
                "thoughtSignature": "opaque"
            }]
        });
        let backend = Arc::new(ScriptedBackend::new(vec![
            response(json!({"candidates": [{"content": model_turn.clone()}]})),
            text_response("done"),
        ]));
        driver(backend.clone(), ResponseFormat::Text)
            .run("check")
            .await
            .unwrap();

        assert_eq!(backend.request(1)["contents"][1], model_turn);
    }

    #[tokio::test]
    async fn syntax_error_is_fed_back_not_raised() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            function_call_response("validate_python_code", json!({"code_string": "def f(:"})),
            text_response("Fixed it."),
        ]));
        let out = driver(backend.clone(), ResponseFormat::Text).run("check").await;

        assert!(out.is_ok());
        let body = backend.request(1);
        let response = &body["contents"][2]["parts"][0]["functionResponse"]["response"];
        assert_eq!(response["status"], "error");
        assert!(!response["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_argument_defaults_to_empty_code() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            function_call_response("validate_python_code", json!({})),
            text_response("ok"),
        ]));
        driver(backend.clone(), ResponseFormat::Text)
            .run("check")
            .await
            .unwrap();

        let body = backend.request(1);
        let response = &body["contents"][2]["parts"][0]["functionResponse"]["response"];
        assert_eq!(response["status"], "success");
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_model() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            function_call_response("run_shell", json!({"cmd": "ls"})),
            text_response("Sorry."),
        ]));
        let out = driver(backend.clone(), ResponseFormat::Text)
            .run("list files")
            .await
            .unwrap();

        assert_eq!(out, ModelResponse::FreeText("Sorry.".into()));
        let body = backend.request(1);
        let turn = &body["contents"][2]["parts"][0]["functionResponse"];
        assert_eq!(turn["name"], "run_shell");
        assert_eq!(turn["response"]["status"], "error");
        assert!(turn["response"]["message"].as_str().unwrap().contains("run_shell"));
    }

    #[tokio::test]
    async fn wrongly_typed_argument_is_reported_to_model() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            function_call_response("validate_python_code", json!({"code_string": 7})),
            text_response("ok"),
        ]));
        driver(backend.clone(), ResponseFormat::Text)
            .run("check")
            .await
            .unwrap();

        let body = backend.request(1);
        let response = &body["contents"][2]["parts"][0]["functionResponse"]["response"];
        assert_eq!(response["status"], "error");
    }

    #[tokio::test]
    async fn second_tool_call_is_never_executed() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            function_call_response("validate_python_code", json!({"code_string": "x"})),
            function_call_response("validate_python_code", json!({"code_string": "y"})),
            text_response("unreachable"),
        ]));
        let err = driver(backend.clone(), ResponseFormat::Text)
            .run("check")
            .await
            .unwrap_err();

        assert!(matches!(err, CompanionError::ResponseShape(_)));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn first_call_failure_propagates() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(CompanionError::Network(
            "connection refused".into(),
        ))]));
        let err = driver(backend.clone(), ResponseFormat::Text)
            .run("hi")
            .await
            .unwrap_err();

        assert!(matches!(err, CompanionError::Network(ref m) if m == "connection refused"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn second_call_failure_propagates() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            function_call_response("validate_python_code", json!({"code_string": "x = 1"})),
            Err(CompanionError::Network("503 Service Unavailable".into())),
        ]));
        let err = driver(backend.clone(), ResponseFormat::Text)
            .run("hi")
            .await
            .unwrap_err();

        assert!(matches!(err, CompanionError::Network(_)));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn empty_candidates_is_shape_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![response(json!({"candidates": []}))]));
        let err = driver(backend, ResponseFormat::Text).run("hi").await.unwrap_err();
        assert!(matches!(err, CompanionError::ResponseShape(_)));
    }

    #[tokio::test]
    async fn json_format_parses_structured_answer() {
        let backend = Arc::new(ScriptedBackend::new(vec![text_response(
            r#"{"code": "print(1)", "explanation": "prints one", "dependencies": "None"}"#,
        )]));
        let out = driver(backend.clone(), ResponseFormat::Json)
            .run("print one")
            .await
            .unwrap();

        assert_eq!(
            out,
            ModelResponse::Structured(StructuredResult {
                code: Some("print(1)".into()),
                explanation: Some("prints one".into()),
                dependencies: Some("None".into()),
            })
        );
        assert_eq!(
            backend.request(0)["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn json_format_with_empty_object() {
        let backend = Arc::new(ScriptedBackend::new(vec![text_response("{}")]));
        let out = driver(backend, ResponseFormat::Json).run("x").await.unwrap();
        assert_eq!(out, ModelResponse::Structured(StructuredResult::default()));
    }

    #[tokio::test]
    async fn tools_disabled_sends_no_declarations() {
        let backend = Arc::new(ScriptedBackend::new(vec![text_response("ok")]));
        let mut config = Config::default();
        config.tools.enabled = false;
        ConversationDriver::from_config(&config, backend.clone())
            .run("hi")
            .await
            .unwrap();

        let body = backend.request(0);
        assert!(body.get("tools").is_none());
        assert!(
            !body["systemInstruction"]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("validate_python_code")
        );
    }
}
