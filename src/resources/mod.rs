//! Resource builders: one constructor per resource kind.
//!
//! Each constructor takes the template, an identifier and a typed property
//! struct, lays the properties out the way the provisioning platform expects,
//! and inserts the node. Reference integrity is enforced on insertion, so a
//! constructor fails if anything it points at has not been declared yet.

pub mod alarm;
pub mod autoscaling;
pub mod iam;
pub mod load_balancer;
pub mod network;
pub mod security;

use crate::core::error::StackResult;
use crate::core::naming::{APP_ENV_TAG_KEY, APP_ENV_TAG_PARAM, APP_TAG_KEY, APP_TAG_PARAM};
use crate::core::template::Template;
use crate::core::types::Tag;

/// The application and environment tags every taggable resource carries.
pub fn app_tags(t: &Template) -> StackResult<Vec<Tag>> {
    Ok(vec![
        Tag::new(APP_TAG_KEY, t.parameters().resolve(APP_TAG_PARAM)?.to_ref()),
        Tag::new(APP_ENV_TAG_KEY, t.parameters().resolve(APP_ENV_TAG_PARAM)?.to_ref()),
    ])
}
