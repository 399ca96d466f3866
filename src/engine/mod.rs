//! Notification decision engine.
//!
//! Compares each quota area's freshly evaluated state against the state the
//! owner was last told about and produces at most one notification per
//! account per run. Pure over its inputs: the clock is passed in, storage
//! and template contents live elsewhere — the engine only picks template
//! *keys*.

use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};

use crate::cache::record::NotificationRecord;
use crate::quota::snapshot::QuotaSnapshot;
use crate::quota::state::{QuotaKind, QuotaState};

// ──────────────────── account view ────────────────────

/// All of one account's quota records, across filesystems and kinds, as
/// seen in a single run. One notify-or-not decision is made per view, not
/// per row, so a single mail can summarize every quota area.
#[derive(Debug, Clone)]
pub struct AccountView {
    /// Account uid.
    pub uid: u32,
    /// Resolved account name, used for recipients and logs.
    pub username: String,
    /// Records carrying this run's fresh snapshots. Areas whose probe
    /// failed this run are simply absent.
    pub records: Vec<NotificationRecord>,
}

impl AccountView {
    /// Apply a notification outcome: every considered area gets the state
    /// it was evaluated at and the send timestamp.
    pub fn mark_notified(&mut self, considered: &[ConsideredArea], now: DateTime<Utc>) {
        for area in considered {
            if let Some(record) = self
                .records
                .iter_mut()
                .find(|r| r.filesystem == area.filesystem && r.kind == area.kind)
            {
                record.mark_notified(area.current, now);
            }
        }
    }
}

// ──────────────────── classified areas ────────────────────

/// One quota area after classification against the run clock.
#[derive(Debug, Clone)]
pub struct AreaStatus {
    /// Filesystem this area belongs to.
    pub filesystem: String,
    /// Block or inode quota.
    pub kind: QuotaKind,
    /// This run's observed usage and limits.
    pub snapshot: QuotaSnapshot,
    /// Freshly evaluated state.
    pub current: QuotaState,
    /// State in effect at the last notification (default `under_quota`).
    pub previous: QuotaState,
    /// When the owner was last mailed about this area.
    pub last_notify_date: Option<DateTime<Utc>>,
}

impl AreaStatus {
    /// Classify one record; `None` when no quota is configured for the
    /// area (excluded from all comparisons and notifications).
    #[must_use]
    pub fn classify(record: &NotificationRecord, now: DateTime<Utc>) -> Option<Self> {
        let current = record.snapshot.state_at(now);
        if current == QuotaState::NoQuota {
            return None;
        }
        Some(Self {
            filesystem: record.filesystem.clone(),
            kind: record.kind,
            snapshot: record.snapshot,
            current,
            previous: record.effective_notify_state(),
            last_notify_date: record.last_notify_date,
        })
    }

    /// Whether this area's state differs from what was last reported.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.current != self.previous
    }
}

/// Key of an area that took part in a decision, with the state it was
/// evaluated at. Used to advance notify fields after a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsideredArea {
    /// Filesystem of the considered area.
    pub filesystem: String,
    /// Block or inode quota.
    pub kind: QuotaKind,
    /// State the area was evaluated at this run.
    pub current: QuotaState,
}

// ──────────────────── decision ────────────────────

/// Why no notification goes out this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// Every area reports `no_quota`; nothing to evaluate.
    NoActiveQuotas,
    /// No area crossed a notify boundary.
    NoBoundaryCrossed,
    /// A recovery happened but the hysteresis window has not elapsed.
    HysteresisActive,
}

/// The outcome of evaluating one account.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Send one mail covering the plan's reported areas.
    Notify(NotificationPlan),
    /// Send nothing; snapshots still get persisted.
    Hold(HoldReason),
}

/// What the outgoing mail must cover.
#[derive(Debug, Clone)]
pub struct NotificationPlan {
    /// Worst state among reported areas; selects the template set.
    pub worst_state: QuotaState,
    /// Areas to report, ordered worst-first with a deterministic
    /// (filesystem, kind) tie-break.
    pub areas: Vec<AreaStatus>,
    /// Every area that took part in the decision — reported or not — to
    /// be marked notified once the send succeeds.
    pub considered: Vec<ConsideredArea>,
}

// ──────────────────── engine ────────────────────

/// The notify-or-not decision engine for one run.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    hysteresis: Duration,
}

impl DecisionEngine {
    /// Build an engine with the configured recovery hysteresis window.
    #[must_use]
    pub fn new(hysteresis_minutes: u64) -> Self {
        let hysteresis = i64::try_from(hysteresis_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .unwrap_or(Duration::MAX);
        Self { hysteresis }
    }

    /// Classify every area of the view against a single `now`, sorted
    /// worst-first with (filesystem, kind) tie-break.
    #[must_use]
    pub fn classify(view: &AccountView, now: DateTime<Utc>) -> Vec<AreaStatus> {
        let mut areas: Vec<AreaStatus> = view
            .records
            .iter()
            .filter_map(|record| AreaStatus::classify(record, now))
            .collect();
        areas.sort_by(|a, b| {
            (Reverse(a.current.rank()), &a.filesystem, a.kind.code())
                .cmp(&(Reverse(b.current.rank()), &b.filesystem, b.kind.code()))
        });
        areas
    }

    /// Evaluate one account: classify, select reportable areas, decide.
    #[must_use]
    pub fn evaluate(&self, view: &AccountView, now: DateTime<Utc>) -> Decision {
        let areas = Self::classify(view, now);
        self.decide(areas, now)
    }

    /// Decide over pre-classified (sorted) areas.
    #[must_use]
    pub fn decide(&self, areas: Vec<AreaStatus>, now: DateTime<Utc>) -> Decision {
        if areas.is_empty() {
            return Decision::Hold(HoldReason::NoActiveQuotas);
        }

        let considered: Vec<ConsideredArea> = areas
            .iter()
            .map(|a| ConsideredArea {
                filesystem: a.filesystem.clone(),
                kind: a.kind,
                current: a.current,
            })
            .collect();

        // If the account is over quota anywhere, the mail only covers the
        // over-quota areas; otherwise (pure recovery) it covers them all.
        let over: Vec<AreaStatus> = areas
            .iter()
            .filter(|a| a.current != QuotaState::UnderQuota)
            .cloned()
            .collect();
        let reported = if over.is_empty() { areas } else { over };

        match Self::should_notify(&reported, now, self.hysteresis) {
            Verdict::Notify => {
                // Sorted worst-first, so the first area carries the worst state.
                let worst_state = reported[0].current;
                Decision::Notify(NotificationPlan {
                    worst_state,
                    areas: reported,
                    considered,
                })
            }
            Verdict::Hold(reason) => Decision::Hold(reason),
        }
    }

    fn should_notify(reported: &[AreaStatus], now: DateTime<Utc>, hysteresis: Duration) -> Verdict {
        // Worsening rule: any area past its last-notified severity warrants
        // a mail, except an area already reported at hard_limit whose grace
        // later runs out — the owner learns nothing actionable from that.
        for area in reported {
            if area.current > area.previous
                && !(area.previous == QuotaState::HardLimit
                    && area.current == QuotaState::GraceExpired)
            {
                return Verdict::Notify;
            }
        }

        // Recovery rule: everything back under quota, and at least one
        // area was over at the last notification. Confirm only after the
        // hysteresis window so a quota edge crossed back and forth does
        // not mail on every run.
        if reported.iter().all(|a| a.current == QuotaState::UnderQuota)
            && reported
                .iter()
                .any(|a| a.previous != QuotaState::UnderQuota)
        {
            let last_notification = reported
                .iter()
                .filter(|a| a.previous != QuotaState::UnderQuota)
                .filter_map(|a| a.last_notify_date)
                .max();
            // A previously-over area always carries a notify date; if the
            // store violates that, confirm rather than stay silent forever.
            return match last_notification {
                Some(last) if now.signed_duration_since(last) <= hysteresis => {
                    Verdict::Hold(HoldReason::HysteresisActive)
                }
                _ => Verdict::Notify,
            };
        }

        Verdict::Hold(HoldReason::NoBoundaryCrossed)
    }
}

enum Verdict {
    Notify,
    Hold(HoldReason),
}

// ──────────────────── tests ────────────────────
