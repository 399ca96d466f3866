//! Message composition: turns a notification plan into subject and body
//! text using the template catalog.

use chrono::SecondsFormat;

use crate::core::errors::Result;
use crate::engine::{AreaStatus, NotificationPlan};
use crate::notify::template::{RenderVars, TemplateCatalog};
use crate::quota::state::QuotaKind;

/// A rendered notification, ready for the delivery boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Rendered subject line.
    pub subject: String,
    /// Rendered message body.
    pub body: String,
}

/// Compose the single mail covering a plan's reported areas.
///
/// The worst reported state selects subject, header, and footer; each area
/// contributes a detail line and (possibly) a summary fragment from its own
/// state's template set, keyed on whether that area changed this run.
pub fn compose(
    username: &str,
    uid: u32,
    plan: &NotificationPlan,
    catalog: &TemplateCatalog,
) -> Result<OutgoingMessage> {
    let account_vars = RenderVars::new()
        .with("USERNAME", username)
        .with("UID", uid.to_string());

    let worst = catalog.for_state(plan.worst_state)?;
    let subject = account_vars.render(&worst.subject);

    let mut summary = String::new();
    let mut details = Vec::with_capacity(plan.areas.len());
    for area in &plan.areas {
        let templates = catalog.for_state(area.current)?;
        let vars = area_vars(account_vars.clone(), area);

        let summary_template = templates.summary(area.kind, area.changed());
        if !summary_template.is_empty() {
            let fragment = vars.render(summary_template);
            if summary.is_empty() {
                summary = fragment;
            } else {
                summary.push_str("  Also, ");
                summary.push_str(&lowercase_first(&fragment));
            }
        }

        details.push(vars.render(templates.detail(area.kind)));
    }

    let mut body = String::new();
    for section in [
        account_vars.render(&worst.header),
        summary,
        details.join("\n"),
        account_vars.render(&worst.footer),
    ] {
        if section.is_empty() {
            continue;
        }
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(&section);
    }
    body.push('\n');

    Ok(OutgoingMessage { subject, body })
}

fn area_vars(base: RenderVars, area: &AreaStatus) -> RenderVars {
    let grace = area.snapshot.grace_expires.map_or_else(
        || "none".to_string(),
        |ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    let mut vars = base
        .with("FILESYSTEM", area.filesystem.clone())
        .with("KIND", area.kind.as_str())
        .with("STATE", area.current.as_str())
        .with("USED", area.snapshot.used.to_string())
        .with("SOFT_LIMIT", area.snapshot.soft_limit.to_string())
        .with("HARD_LIMIT", area.snapshot.hard_limit.to_string())
        .with("GRACE_EXPIRES", grace);
    if area.kind == QuotaKind::Block {
        vars = vars
            .with("USED_BYTES", area.snapshot.bytes_used().to_string())
            .with(
                "SOFT_LIMIT_BYTES",
                area.snapshot.byte_soft_limit().to_string(),
            )
            .with(
                "HARD_LIMIT_BYTES",
                area.snapshot.byte_hard_limit().to_string(),
            );
    }
    vars
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::engine::{ConsideredArea, NotificationPlan};
    use crate::quota::snapshot::QuotaSnapshot;
    use crate::quota::state::QuotaState;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn soft_area(filesystem: &str, kind: QuotaKind, changed: bool) -> AreaStatus {
        AreaStatus {
            filesystem: filesystem.to_string(),
            kind,
            snapshot: QuotaSnapshot {
                used: 80,
                soft_limit: 50,
                hard_limit: 100,
                grace_expires: Some(at(1_000)),
            },
            current: QuotaState::SoftLimit,
            previous: if changed {
                QuotaState::UnderQuota
            } else {
                QuotaState::SoftLimit
            },
            last_notify_date: None,
        }
    }

    fn plan(areas: Vec<AreaStatus>) -> NotificationPlan {
        let considered = areas
            .iter()
            .map(|a| ConsideredArea {
                filesystem: a.filesystem.clone(),
                kind: a.kind,
                current: a.current,
            })
            .collect();
        NotificationPlan {
            worst_state: areas[0].current,
            areas,
            considered,
        }
    }

    #[test]
    fn single_area_message_renders_all_sections() {
        let msg = compose(
            "alice",
            1000,
            &plan(vec![soft_area("/home", QuotaKind::Block, true)]),
            &TemplateCatalog::built_in(),
        )
        .unwrap();
        assert!(msg.subject.contains("alice"));
        assert!(msg.body.contains("has gone over its limit"));
        assert!(msg.body.contains("/home"));
        assert!(msg.body.contains("80 of 50 blocks"));
        assert!(msg.body.contains("grace period"));
    }

    #[test]
    fn repeat_notification_reads_differently() {
        let catalog = TemplateCatalog::built_in();
        let fresh = compose(
            "alice",
            1000,
            &plan(vec![soft_area("/home", QuotaKind::Block, true)]),
            &catalog,
        )
        .unwrap();
        let repeat = compose(
            "alice",
            1000,
            &plan(vec![soft_area("/home", QuotaKind::Block, false)]),
            &catalog,
        )
        .unwrap();
        assert!(fresh.body.contains("has gone over"));
        assert!(repeat.body.contains("still over"));
    }

    #[test]
    fn additional_summaries_join_with_also() {
        let msg = compose(
            "alice",
            1000,
            &plan(vec![
                soft_area("/home", QuotaKind::Block, true),
                soft_area("/srv", QuotaKind::Inode, true),
            ]),
            &TemplateCatalog::built_in(),
        )
        .unwrap();
        assert!(
            msg.body.contains("  Also, your file count on /srv"),
            "body was: {}",
            msg.body
        );
    }

    #[test]
    fn detail_lines_follow_plan_order() {
        let msg = compose(
            "alice",
            1000,
            &plan(vec![
                soft_area("/home", QuotaKind::Block, true),
                soft_area("/srv", QuotaKind::Block, true),
            ]),
            &TemplateCatalog::built_in(),
        )
        .unwrap();
        let home = msg.body.find("/home: 80").unwrap();
        let srv = msg.body.find("/srv: 80").unwrap();
        assert!(home < srv);
    }

    #[test]
    fn lowercase_first_handles_empty_and_unicode() {
        assert_eq!(lowercase_first(""), "");
        assert_eq!(lowercase_first("Your quota"), "your quota");
        assert_eq!(lowercase_first("Éire"), "éire");
    }
}
