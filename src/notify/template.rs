//! Per-state message templates with `${VAR}` placeholder substitution.
//!
//! The decision engine only ever selects template *keys* (state, kind,
//! changed-or-not); everything about wording lives here and in the config
//! overrides. Rendering is plain placeholder replacement — no template
//! language.

#![allow(missing_docs)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::errors::{QnError, Result};
use crate::quota::state::{QuotaKind, QuotaState};

// ──────────────────── rendering ────────────────────

/// Accumulated `${KEY}` → value substitutions for one render.
#[derive(Debug, Clone, Default)]
pub struct RenderVars {
    vars: Vec<(&'static str, String)>,
}

impl RenderVars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable.
    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.vars.retain(|(k, _)| *k != key);
        self.vars.push((key, value.into()));
        self
    }

    /// Substitute every `${KEY}` occurrence. Unknown placeholders are left
    /// in place so template typos stay visible.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        let mut out = template.to_string();
        for (key, value) in &self.vars {
            out = out.replace(&format!("${{{key}}}"), value);
        }
        out
    }
}

// ──────────────────── template sets ────────────────────

/// The full template set for one severity state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTemplates {
    /// Subject line of the outgoing mail.
    pub subject: String,
    /// Opening paragraph.
    pub header: String,
    /// Closing paragraph.
    pub footer: String,
    /// Per-area detail line, block quotas.
    pub block_detail: String,
    /// Per-area detail line, inode quotas.
    pub inode_detail: String,
    /// Summary fragment when the block area's state changed this run.
    pub block_summary_new: String,
    /// Summary fragment when the block area was already at this state.
    pub block_summary_old: String,
    pub inode_summary_new: String,
    pub inode_summary_old: String,
}

impl StateTemplates {
    /// The detail template for a quota kind.
    #[must_use]
    pub fn detail(&self, kind: QuotaKind) -> &str {
        match kind {
            QuotaKind::Block => &self.block_detail,
            QuotaKind::Inode => &self.inode_detail,
        }
    }

    /// The summary template for a quota kind, keyed on whether the area's
    /// state changed this run. Empty string means no summary fragment.
    #[must_use]
    pub fn summary(&self, kind: QuotaKind, changed: bool) -> &str {
        match (kind, changed) {
            (QuotaKind::Block, true) => &self.block_summary_new,
            (QuotaKind::Block, false) => &self.block_summary_old,
            (QuotaKind::Inode, true) => &self.inode_summary_new,
            (QuotaKind::Inode, false) => &self.inode_summary_old,
        }
    }
}

/// Config-side override: unset fields keep the built-in wording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateTemplateOverride {
    pub subject: Option<String>,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub block_detail: Option<String>,
    pub inode_detail: Option<String>,
    pub block_summary_new: Option<String>,
    pub block_summary_old: Option<String>,
    pub inode_summary_new: Option<String>,
    pub inode_summary_old: Option<String>,
}

impl StateTemplateOverride {
    fn apply(&self, base: &mut StateTemplates) {
        let fields = [
            (&self.subject, &mut base.subject),
            (&self.header, &mut base.header),
            (&self.footer, &mut base.footer),
            (&self.block_detail, &mut base.block_detail),
            (&self.inode_detail, &mut base.inode_detail),
            (&self.block_summary_new, &mut base.block_summary_new),
            (&self.block_summary_old, &mut base.block_summary_old),
            (&self.inode_summary_new, &mut base.inode_summary_new),
            (&self.inode_summary_old, &mut base.inode_summary_old),
        ];
        for (over, target) in fields {
            if let Some(value) = over {
                target.clone_from(value);
            }
        }
    }
}

// ──────────────────── catalog ────────────────────

/// Every reportable state's templates, built-ins merged with config
/// overrides.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    states: HashMap<QuotaState, StateTemplates>,
}

impl TemplateCatalog {
    /// The built-in wording.
    #[must_use]
    pub fn built_in() -> Self {
        let mut states = HashMap::new();
        states.insert(
            QuotaState::UnderQuota,
            StateTemplates {
                subject: "Disk usage back under quota for ${USERNAME}".to_string(),
                header: "Good news: your disk usage is back under quota everywhere."
                    .to_string(),
                footer: "No action is needed. This mail confirms the earlier warning is \
                         resolved."
                    .to_string(),
                block_detail: "  ${FILESYSTEM}: ${USED} of ${SOFT_LIMIT} blocks used"
                    .to_string(),
                inode_detail: "  ${FILESYSTEM}: ${USED} of ${SOFT_LIMIT} files used"
                    .to_string(),
                block_summary_new: "Your disk usage on ${FILESYSTEM} is back under its limit."
                    .to_string(),
                block_summary_old: String::new(),
                inode_summary_new: "Your file count on ${FILESYSTEM} is back under its limit."
                    .to_string(),
                inode_summary_old: String::new(),
            },
        );
        states.insert(
            QuotaState::SoftLimit,
            StateTemplates {
                subject: "Disk quota warning for ${USERNAME}".to_string(),
                header: "This is a warning about your disk usage.".to_string(),
                footer: "Please reduce your usage before the grace period runs out; after \
                         that, writes will fail."
                    .to_string(),
                block_detail: "  ${FILESYSTEM}: ${USED} of ${SOFT_LIMIT} blocks used \
                               (hard limit ${HARD_LIMIT}, grace until ${GRACE_EXPIRES})"
                    .to_string(),
                inode_detail: "  ${FILESYSTEM}: ${USED} of ${SOFT_LIMIT} files used \
                               (hard limit ${HARD_LIMIT}, grace until ${GRACE_EXPIRES})"
                    .to_string(),
                block_summary_new: "Your disk usage on ${FILESYSTEM} has gone over its limit."
                    .to_string(),
                block_summary_old: "Your disk usage on ${FILESYSTEM} is still over its limit."
                    .to_string(),
                inode_summary_new: "Your file count on ${FILESYSTEM} has gone over its limit."
                    .to_string(),
                inode_summary_old: "Your file count on ${FILESYSTEM} is still over its limit."
                    .to_string(),
            },
        );
        states.insert(
            QuotaState::HardLimit,
            StateTemplates {
                subject: "Disk quota exceeded for ${USERNAME}".to_string(),
                header: "Your disk usage has hit its hard limit.".to_string(),
                footer: "New writes are failing now. Remove files to restore service."
                    .to_string(),
                block_detail: "  ${FILESYSTEM}: ${USED} blocks used, hard limit ${HARD_LIMIT}"
                    .to_string(),
                inode_detail: "  ${FILESYSTEM}: ${USED} files used, hard limit ${HARD_LIMIT}"
                    .to_string(),
                block_summary_new: "Your disk usage on ${FILESYSTEM} has reached its hard \
                                    limit."
                    .to_string(),
                block_summary_old: "Your disk usage on ${FILESYSTEM} is still at its hard \
                                    limit."
                    .to_string(),
                inode_summary_new: "Your file count on ${FILESYSTEM} has reached its hard \
                                    limit."
                    .to_string(),
                inode_summary_old: "Your file count on ${FILESYSTEM} is still at its hard \
                                    limit."
                    .to_string(),
            },
        );
        states.insert(
            QuotaState::GraceExpired,
            StateTemplates {
                subject: "Disk quota grace period expired for ${USERNAME}".to_string(),
                header: "The grace period on your disk quota has run out.".to_string(),
                footer: "New writes are failing now. Remove files to restore service."
                    .to_string(),
                block_detail: "  ${FILESYSTEM}: ${USED} of ${SOFT_LIMIT} blocks used, grace \
                               expired"
                    .to_string(),
                inode_detail: "  ${FILESYSTEM}: ${USED} of ${SOFT_LIMIT} files used, grace \
                               expired"
                    .to_string(),
                block_summary_new: "The grace period for your disk usage on ${FILESYSTEM} \
                                    has expired."
                    .to_string(),
                block_summary_old: "Your disk usage on ${FILESYSTEM} is still over its \
                                    expired limit."
                    .to_string(),
                inode_summary_new: "The grace period for your file count on ${FILESYSTEM} \
                                    has expired."
                    .to_string(),
                inode_summary_old: "Your file count on ${FILESYSTEM} is still over its \
                                    expired limit."
                    .to_string(),
            },
        );
        Self { states }
    }

    /// Built-ins merged with config overrides. Override keys were already
    /// validated as state names by config loading.
    #[must_use]
    pub fn from_overrides(overrides: &HashMap<String, StateTemplateOverride>) -> Self {
        let mut catalog = Self::built_in();
        for (name, over) in overrides {
            if let Some(state) = QuotaState::from_name(name)
                && let Some(base) = catalog.states.get_mut(&state)
            {
                over.apply(base);
            }
        }
        catalog
    }

    /// Template set for a reportable state. `no_quota` has no templates by
    /// construction — it is never reported.
    pub fn for_state(&self, state: QuotaState) -> Result<&StateTemplates> {
        self.states.get(&state).ok_or_else(|| QnError::Runtime {
            details: format!("no templates for state {state}"),
        })
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_placeholders() {
        let vars = RenderVars::new()
            .with("USERNAME", "alice")
            .with("FILESYSTEM", "/home");
        let out = vars.render("Hi ${USERNAME}, see ${FILESYSTEM}. Bye ${USERNAME}.");
        assert_eq!(out, "Hi alice, see /home. Bye alice.");
    }

    #[test]
    fn render_leaves_unknown_placeholders_visible() {
        let vars = RenderVars::new().with("USERNAME", "alice");
        let out = vars.render("${USERNAME} ${TYPO}");
        assert_eq!(out, "alice ${TYPO}");
    }

    #[test]
    fn with_replaces_existing_key() {
        let vars = RenderVars::new().with("K", "one").with("K", "two");
        assert_eq!(vars.render("${K}"), "two");
    }

    #[test]
    fn built_in_catalog_covers_reportable_states() {
        let catalog = TemplateCatalog::built_in();
        for state in [
            QuotaState::UnderQuota,
            QuotaState::SoftLimit,
            QuotaState::HardLimit,
            QuotaState::GraceExpired,
        ] {
            let tpl = catalog.for_state(state).unwrap();
            assert!(!tpl.subject.is_empty());
            assert!(!tpl.block_detail.is_empty());
        }
        assert!(catalog.for_state(QuotaState::NoQuota).is_err());
    }

    #[test]
    fn overrides_merge_onto_built_ins() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "soft_limit".to_string(),
            StateTemplateOverride {
                subject: Some("Custom subject ${USERNAME}".to_string()),
                ..Default::default()
            },
        );
        let catalog = TemplateCatalog::from_overrides(&overrides);
        let tpl = catalog.for_state(QuotaState::SoftLimit).unwrap();
        assert_eq!(tpl.subject, "Custom subject ${USERNAME}");
        // Untouched fields keep built-in wording.
        assert_eq!(
            tpl.header,
            TemplateCatalog::built_in()
                .for_state(QuotaState::SoftLimit)
                .unwrap()
                .header
        );
    }

    #[test]
    fn summary_selection_by_kind_and_change() {
        let catalog = TemplateCatalog::built_in();
        let tpl = catalog.for_state(QuotaState::SoftLimit).unwrap();
        assert!(tpl.summary(QuotaKind::Block, true).contains("has gone over"));
        assert!(tpl.summary(QuotaKind::Block, false).contains("still over"));
        assert_ne!(
            tpl.summary(QuotaKind::Block, true),
            tpl.summary(QuotaKind::Inode, true)
        );
    }

    #[test]
    fn under_quota_repeat_summary_is_empty() {
        // An unchanged under_quota area contributes no summary fragment.
        let catalog = TemplateCatalog::built_in();
        let tpl = catalog.for_state(QuotaState::UnderQuota).unwrap();
        assert!(tpl.summary(QuotaKind::Block, false).is_empty());
    }
}
