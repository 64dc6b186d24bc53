//! Naming conventions: application tiers and tag-derived parameter names.
//!
//! Template parameters must be strictly alphanumeric, so a tag name such as
//! `repo-url` becomes a per-tier parameter such as `spaRepoUrl`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag key carrying the application name on every taggable resource.
pub const APP_TAG_KEY: &str = "lh-app";

/// Tag key carrying the application environment on every taggable resource.
pub const APP_ENV_TAG_KEY: &str = "lh-app-env";

/// Parameter supplying the [`APP_TAG_KEY`] value.
pub const APP_TAG_PARAM: &str = "lhAppTag";

/// Parameter supplying the [`APP_ENV_TAG_KEY`] value.
pub const APP_ENV_TAG_PARAM: &str = "lhAppEnvTag";

/// One of the three parallel application roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Spa,
    Api,
    Admin,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Spa, Tier::Api, Tier::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spa => "spa",
            Self::Api => "api",
            Self::Admin => "admin",
        }
    }

    /// Prefix `suffix` with the tier namespace, e.g. `spa` + `ASG` = `spaASG`.
    pub fn scoped(&self, suffix: &str) -> String {
        format!("{}{}", self.as_str(), suffix)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a `(tier, tag)` pair to its parameter identifier.
///
/// Each word of `tag` is title-cased (a word starts at any letter not preceded
/// by a letter), then dashes and spaces are removed and the tier is prefixed.
/// `("spa", "repo-url")` becomes `spaRepoUrl`.
pub fn tag_param_name(tier: Tier, tag: &str) -> String {
    let mut name = String::with_capacity(tier.as_str().len() + tag.len());
    name.push_str(tier.as_str());
    name.push_str(&title_case_compact(tag));
    name
}

fn title_case_compact(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut prev_is_letter = false;
    for c in tag.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            prev_is_letter = false;
            if c != '-' && c != ' ' {
                out.push(c);
            }
        }
    }
    out
}
