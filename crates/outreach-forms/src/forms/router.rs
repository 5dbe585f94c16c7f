use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use tracing::debug;

use super::domain::{ClientContext, RawSubmission};
use super::handler::{FormKind, SubmissionHandler, SubmissionResult};
use crate::store::AppendLog;

/// Router exposing the two public form endpoints.
pub fn form_router<S>(handler: Arc<SubmissionHandler<S>>) -> Router
where
    S: AppendLog + 'static,
{
    Router::new()
        .route("/api/v1/forms/donation", post(donation_handler::<S>))
        .route("/api/v1/forms/application", post(application_handler::<S>))
        .with_state(handler)
}

/// Client context from the proxy headers.
pub fn client_context(headers: &HeaderMap) -> ClientContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    ClientContext {
        forwarded_for: header("x-forwarded-for"),
        real_ip: header("x-real-ip"),
    }
}

pub(crate) async fn donation_handler<S>(
    State(handler): State<Arc<SubmissionHandler<S>>>,
    headers: HeaderMap,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Response
where
    S: AppendLog + 'static,
{
    submit(&handler, FormKind::Donation, &headers, form).await
}

pub(crate) async fn application_handler<S>(
    State(handler): State<Arc<SubmissionHandler<S>>>,
    headers: HeaderMap,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Response
where
    S: AppendLog + 'static,
{
    submit(&handler, FormKind::Application, &headers, form).await
}

async fn submit<S>(
    handler: &SubmissionHandler<S>,
    kind: FormKind,
    headers: &HeaderMap,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Response
where
    S: AppendLog + 'static,
{
    let fields = match form {
        Ok(Form(fields)) => fields,
        Err(rejection) => {
            debug!(form = kind.label(), reason = %rejection.body_text(), "unreadable form body");
            let result = SubmissionResult::failed(kind);
            return (rejection.status(), Json(result)).into_response();
        }
    };

    let context = client_context(headers);
    let result = handler
        .handle(kind, RawSubmission::from(fields), &context)
        .await;
    (status_for(&result), Json(result)).into_response()
}

fn status_for(result: &SubmissionResult) -> StatusCode {
    if result.success {
        StatusCode::CREATED
    } else if result.is_form_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}
