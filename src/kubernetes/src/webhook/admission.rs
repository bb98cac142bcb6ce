//! Per kind, per verb admission decisions.
//!
//! Every served kind implements [`AdmissionPolicy`]. The generic [`validate`] and [`mutate`]
//! functions decode the request, route on the verb and hand over to the kind's policy; the
//! HTTP handlers at the bottom wrap them into `AdmissionReview` responses.

use actix_web::{http::header::CONTENT_TYPE, web, HttpRequest, HttpResponse};
use async_trait::async_trait;
use kube::{
    core::{
        admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation},
        DynamicObject,
    },
    Resource,
};
use lbcfd_trace::error::TraceableError;
use serde::{de::DeserializeOwned, Serialize};

use super::{error::Error, patch::PatchSet, validation::ErrorList};
use crate::context::Context;

/// Admission behaviour of one kind.
#[async_trait]
pub trait AdmissionPolicy:
    Resource<DynamicType = ()> + DeserializeOwned + Serialize + Clone + Send + Sync + 'static
{
    /// Structural checks; never looks anything up.
    fn structural(&self) -> ErrorList;

    /// Canonicalisation applied by the mutating route.
    fn canonicalize(&self, _create: bool) -> PatchSet {
        PatchSet::new()
    }

    async fn validate_create(&self, ctx: &Context, dry_run: bool) -> Result<(), Error>;

    async fn validate_update(&self, old: &Self, ctx: &Context, dry_run: bool)
        -> Result<(), Error>;

    /// `old` is `None` when the object is already gone.
    async fn validate_delete(_ctx: &Context, _old: Option<&Self>) -> Result<(), Error> {
        Ok(())
    }
}

pub fn kind_of<K: AdmissionPolicy>() -> String {
    K::kind(&()).to_string()
}

pub fn decode<K: AdmissionPolicy>(obj: &DynamicObject) -> Result<K, Error> {
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|e| Error::Decode {
            kind: kind_of::<K>(),
            message: e.to_string(),
        })
}

fn decode_required<K: AdmissionPolicy>(
    obj: Option<&DynamicObject>,
    field: &str,
) -> Result<K, Error> {
    match obj {
        Some(obj) => decode(obj),
        None => Err(Error::Decode {
            kind: kind_of::<K>(),
            message: format!("{field} is required"),
        }),
    }
}

fn check_kind<K: AdmissionPolicy>(req: &AdmissionRequest<DynamicObject>) -> Result<(), Error> {
    let expected = kind_of::<K>();
    if req.kind.kind != expected {
        return Err(Error::KindMismatch {
            expected,
            actual: req.kind.kind.clone(),
        });
    }
    Ok(())
}

/// Full admission decision including driver calls.
///
/// Verbs other than create, update and delete are allowed.
pub async fn validate<K: AdmissionPolicy>(
    ctx: &Context,
    req: &AdmissionRequest<DynamicObject>,
) -> Result<(), Error> {
    check_kind::<K>(req)?;
    match req.operation {
        Operation::Create => {
            let obj: K = decode_required(req.object.as_ref(), "object")?;
            obj.validate_create(ctx, req.dry_run).await
        }
        Operation::Update => {
            let new: K = decode_required(req.object.as_ref(), "object")?;
            let old: K = decode_required(req.old_object.as_ref(), "oldObject")?;
            new.validate_update(&old, ctx, req.dry_run).await
        }
        Operation::Delete => {
            let old: Option<K> = req.old_object.as_ref().map(decode).transpose()?;
            K::validate_delete(ctx, old.as_ref()).await
        }
        _ => Ok(()),
    }
}

/// Canonicalisation patch for the request, checked against the structural rules in its
/// patched form.
pub fn mutate<K: AdmissionPolicy>(req: &AdmissionRequest<DynamicObject>) -> Result<PatchSet, Error> {
    check_kind::<K>(req)?;
    let create = match req.operation {
        Operation::Create => true,
        Operation::Update => false,
        _ => return Ok(PatchSet::new()),
    };
    let obj: K = decode_required(req.object.as_ref(), "object")?;
    let patch = obj.canonicalize(create);
    let canonical: K = apply(&obj, &patch)?;
    canonical
        .structural()
        .into_result()
        .map_err(Error::Validation)?;
    Ok(patch)
}

/// Applies `patch` to a copy of `obj`.
pub fn apply<K: AdmissionPolicy>(obj: &K, patch: &PatchSet) -> Result<K, Error> {
    let decode_err = |e: serde_json::Error| Error::Decode {
        kind: kind_of::<K>(),
        message: e.to_string(),
    };
    let mut doc = serde_json::to_value(obj).map_err(decode_err)?;
    json_patch::patch(&mut doc, &patch.clone().into_patch()).map_err(Error::Patch)?;
    serde_json::from_value(doc).map_err(decode_err)
}

fn operation_label(op: &Operation) -> String {
    format!("{op:?}").to_uppercase()
}

fn check_content_type(req: &HttpRequest) -> Option<HttpResponse> {
    let content_type = req.headers().get(CONTENT_TYPE)?;
    let is_json = content_type
        .to_str()
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);
    if is_json {
        None
    } else {
        let msg = format!("invalid content-type: {:?}", content_type);
        Some(HttpResponse::BadRequest().json(msg))
    }
}

fn into_request(
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> Result<AdmissionRequest<DynamicObject>, HttpResponse> {
    let review = body.into_inner();
    TryInto::<AdmissionRequest<DynamicObject>>::try_into(review).map_err(|e| {
        tracing::error!("invalid request: {}", e);
        HttpResponse::InternalServerError()
            .json(&AdmissionResponse::invalid(e.to_string()).into_review())
    })
}

async fn record(
    ctx: &Context,
    kind: &str,
    req: &AdmissionRequest<DynamicObject>,
    denial: Option<&Error>,
) {
    let allowed = denial.is_none();
    ctx.metrics
        .admission(kind, &operation_label(&req.operation), allowed);
    if let Some(e) = denial {
        ctx.metrics.denial(kind, &e.metric_label());
    }
    ctx.diagnostics.write().await.record(allowed);
}

#[tracing::instrument(skip_all, fields(kind = %kind_of::<K>()))]
pub async fn handle_validation<K: AdmissionPolicy>(
    ctx: &Context,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> HttpResponse {
    tracing::debug!(method=?req.method(), uri=?req.uri(), "call validating webhook");

    if let Some(resp) = check_content_type(&req) {
        return resp;
    }
    let admission_req = match into_request(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let kind = kind_of::<K>();
    let _timer = ctx.metrics.measure(&kind);
    let result = validate::<K>(ctx, &admission_req).await;
    record(ctx, &kind, &admission_req, result.as_ref().err()).await;

    let resp = AdmissionResponse::from(&admission_req);
    let resp = match result {
        Ok(()) => {
            tracing::info!(
                op=?admission_req.operation,
                name=admission_req.name,
                namespace=?admission_req.namespace,
                "Accepted by validating webhook",
            );
            resp
        }
        Err(e) => {
            tracing::warn!(
                op=?admission_req.operation,
                name=admission_req.name,
                namespace=?admission_req.namespace,
                error=%e,
                "Denied by validating webhook",
            );
            resp.deny(e.to_string())
        }
    };
    HttpResponse::Ok().json(resp.into_review())
}

#[tracing::instrument(skip_all, fields(kind = %kind_of::<K>()))]
pub async fn handle_mutation<K: AdmissionPolicy>(
    ctx: &Context,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> HttpResponse {
    tracing::debug!(method=?req.method(), uri=?req.uri(), "call mutating webhook");

    if let Some(resp) = check_content_type(&req) {
        return resp;
    }
    let admission_req = match into_request(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let kind = kind_of::<K>();
    let _timer = ctx.metrics.measure(&kind);
    let resp = AdmissionResponse::from(&admission_req);
    let result = mutate::<K>(&admission_req).and_then(|patch| {
        if patch.is_empty() {
            Ok(resp.clone())
        } else {
            resp.clone()
                .with_patch(patch.into_patch())
                .map_err(Error::SerializePatch)
        }
    });

    record(ctx, &kind, &admission_req, result.as_ref().err()).await;

    let resp = match result {
        Ok(patched) => {
            tracing::info!(
                op=?admission_req.operation,
                name=admission_req.name,
                namespace=?admission_req.namespace,
                "Accepted by mutating webhook",
            );
            patched
        }
        Err(e) => {
            tracing::warn!(
                op=?admission_req.operation,
                name=admission_req.name,
                namespace=?admission_req.namespace,
                error=%e,
                "Denied by mutating webhook",
            );
            resp.deny(e.to_string())
        }
    };
    HttpResponse::Ok().json(resp.into_review())
}
