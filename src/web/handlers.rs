use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::Html;
use serde::Deserialize;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::render;
use super::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub user_prompt: Option<String>,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn generate(
    State(state): State<AppState>,
    form: Result<Form<GenerateForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let request_id = Uuid::new_v4();

    async move {
        let form = match form {
            Ok(Form(form)) => form,
            Err(rejection) => {
                warn!(status = %rejection.status(), "generate body rejected: {rejection}");
                return (
                    rejection.status(),
                    Html(render::invalid_form(&rejection.body_text())),
                );
            }
        };

        let Some(prompt) = form.user_prompt.filter(|p| !p.trim().is_empty()) else {
            warn!("generate called without a prompt");
            return (StatusCode::BAD_REQUEST, Html(render::missing_prompt()));
        };

        info!(prompt_len = prompt.len(), "generate request");

        match state.driver.run(&prompt).await {
            Ok(response) => (StatusCode::OK, Html(render::response(&response))),
            Err(e) => {
                error!(category = ?e.category(), "generate: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, Html(render::error(&e)))
            }
        }
    }
    .instrument(info_span!("generate", %request_id))
    .await
}
