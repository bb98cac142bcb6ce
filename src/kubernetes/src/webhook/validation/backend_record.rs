use super::{ErrorList, FieldError, FieldPath};
use crate::crd::backend_record::BackendRecord;

pub fn validate_update(old: &BackendRecord, new: &BackendRecord) -> ErrorList {
    let mut errs = ErrorList::new();
    let spec = FieldPath::new("spec");
    if old.spec.lb_name != new.spec.lb_name {
        errs.push(FieldError::forbidden(spec.child("lbName"), "field is immutable"));
    }
    if old.spec.lb_driver != new.spec.lb_driver {
        errs.push(FieldError::forbidden(
            spec.child("lbDriver"),
            "field is immutable",
        ));
    }
    errs
}
