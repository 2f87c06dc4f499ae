use crate::{
    core::{self, Decision, Dispatcher, GroupKind, Operation, Requester},
    metrics::AdmissionMetrics,
};
use futures::future;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use kube::core::{admission, DynamicObject, Status};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info, info_span, trace, warn, Instrument};

/// Serves the validating webhook, deferring each decision to a [`Dispatcher`].
#[derive(Clone)]
pub struct Admission {
    dispatcher: Arc<Dispatcher>,
    timeout: Duration,
    metrics: AdmissionMetrics,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(#[from] hyper::Error),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

type Review = admission::AdmissionReview<DynamicObject>;
type AdmissionRequest = admission::AdmissionRequest<DynamicObject>;
type AdmissionResponse = admission::AdmissionResponse;

type Body = http_body_util::Full<bytes::Bytes>;

// === impl Admission ===

impl tower::Service<Request<hyper::body::Incoming>> for Admission {
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<hyper::body::Incoming>) -> Self::Future {
        trace!(?req);
        if req.method() != http::Method::POST || req.uri().path() != "/" {
            return Box::pin(future::ok(
                Response::builder()
                    .status(http::StatusCode::NOT_FOUND)
                    .body(Body::default())
                    .expect("not found response must be valid"),
            ));
        }

        let admission = self.clone();
        Box::pin(async move {
            let bytes = req.into_body().collect().await?.to_bytes();
            json_response(admission.review(&bytes).await)
        })
    }
}

impl Admission {
    pub fn new(dispatcher: Arc<Dispatcher>, timeout: Duration, metrics: AdmissionMetrics) -> Self {
        Self {
            dispatcher,
            timeout,
            metrics,
        }
    }

    /// Decides an encoded `AdmissionReview`, returning the review to send back.
    async fn review(&self, body: &[u8]) -> Review {
        let review: Review = match serde_json::from_slice(body) {
            Ok(review) => review,
            Err(error) => {
                warn!(%error, "Failed to parse request body");
                return AdmissionResponse::invalid(error).into_review();
            }
        };
        trace!(?review);

        let rsp = match review.try_into() {
            Ok(req) => {
                debug!(?req);
                self.admit(req).await
            }
            Err(error) => {
                warn!(%error, "Invalid admission request");
                AdmissionResponse::invalid(error)
            }
        };
        debug!(?rsp);
        rsp.into_review()
    }

    async fn admit(&self, req: AdmissionRequest) -> AdmissionResponse {
        let rsp = AdmissionResponse::from(&req);
        let request = match to_request(&req) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "Failed to read admission object");
                return AdmissionResponse::invalid(error);
            }
        };

        let span = info_span!(
            "admit",
            uid = %request.uid,
            kind = %request.kind,
            ns = request.namespace.as_deref().unwrap_or_default(),
            name = %request.name,
            user = %request.requester.name(),
        );
        let decision = tokio::time::timeout(self.timeout, self.dispatcher.dispatch(&request))
            .instrument(span.clone())
            .await
            .unwrap_or_else(|_| Decision::Errored(core::Error::Timeout(self.timeout)));
        self.metrics
            .observe(&request.kind, request.operation, &decision);

        span.in_scope(|| match &decision {
            Decision::Denied(message) => info!(%message, "Denied"),
            Decision::Errored(error) => warn!(%error, "Failed to decide admission request"),
            decision => debug!(decision = decision.as_str(), "Admitted"),
        });
        respond(rsp, decision)
    }
}

/// Reads the dispatcher's view of a Kubernetes admission request.
fn to_request(req: &AdmissionRequest) -> Result<core::Request, serde_json::Error> {
    let object = req.object.as_ref().map(serde_json::to_value).transpose()?;

    // Objects created with `generateName` are not yet named.
    let name = if req.name.is_empty() {
        req.object
            .as_ref()
            .and_then(|obj| obj.metadata.generate_name.clone())
            .unwrap_or_default()
    } else {
        req.name.clone()
    };

    Ok(core::Request {
        uid: req.uid.clone(),
        kind: GroupKind::new(req.kind.group.clone(), req.kind.kind.clone()),
        namespace: req.namespace.clone(),
        name,
        operation: match req.operation {
            admission::Operation::Create => Operation::Create,
            admission::Operation::Update => Operation::Update,
            admission::Operation::Delete => Operation::Delete,
            admission::Operation::Connect => Operation::Connect,
        },
        object,
        requester: Requester::from_user_info(
            req.user_info.username.clone().unwrap_or_default(),
            req.user_info.groups.clone().unwrap_or_default(),
        ),
    })
}

/// Denials and errors are both disallowed, but they are reported with distinct
/// status codes so that callers can tell them apart.
fn respond(rsp: AdmissionResponse, decision: Decision) -> AdmissionResponse {
    match decision {
        Decision::NoOpinion | Decision::Allowed => rsp,
        Decision::Denied(message) => failure(rsp, &message, "Forbidden", 403),
        Decision::Errored(error) => failure(rsp, &error.to_string(), "InternalError", 500),
    }
}

fn failure(mut rsp: AdmissionResponse, message: &str, reason: &str, code: u16) -> AdmissionResponse {
    rsp.allowed = false;
    rsp.result = Status::failure(message, reason).with_code(code);
    rsp
}

fn json_response(rsp: Review) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(&rsp)?;
    Ok(Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("admission review response must be valid"))
}
