//! Batch runner: iterates accounts × filesystems, feeds fresh probe
//! readings through the decision engine, delivers mail, and commits cache
//! updates.
//!
//! Ordering per account is read → decide → send → write, with all of one
//! account's rows committed in a single transaction, so an interrupted run
//! never records a notification that was not sent (or the reverse). A
//! probe failure skips that area for the run; a cache failure aborts the
//! run.

#![cfg(feature = "sqlite")]
#![allow(missing_docs)]

use std::fmt;

use chrono::{DateTime, Utc};

use crate::cache::store::QuotaCache;
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::engine::{AccountView, Decision, DecisionEngine, NotificationPlan};
use crate::logger::RunLog;
use crate::notify::mailer::Notifier;
use crate::notify::message::compose;
use crate::notify::template::TemplateCatalog;
use crate::probe::accounts::{AccountResolver, all_uids};
use crate::probe::mounts::quota_filesystems;
use crate::probe::QuotaProbe;
use crate::quota::state::QuotaKind;

// ──────────────────── run summary ────────────────────

/// Counters for one invocation. Per-area skips and delivery failures are
/// warnings; only cache or systemic failures make the run itself fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub accounts: usize,
    pub areas_probed: usize,
    pub areas_skipped: usize,
    pub notifications_sent: usize,
    pub notify_failures: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accounts, {} areas probed, {} skipped, {} notifications sent, {} delivery failures",
            self.accounts,
            self.areas_probed,
            self.areas_skipped,
            self.notifications_sent,
            self.notify_failures
        )
    }
}

// ──────────────────── runner ────────────────────

/// Orchestrates one batch run over externally provided collaborators.
pub struct Runner<'a, P, N, R>
where
    P: QuotaProbe,
    N: Notifier,
    R: AccountResolver,
{
    config: &'a Config,
    engine: DecisionEngine,
    catalog: TemplateCatalog,
    cache: &'a mut QuotaCache,
    probe: &'a P,
    notifier: &'a N,
    accounts: &'a R,
    log: &'a RunLog,
    dry_run: bool,
}

impl<'a, P, N, R> Runner<'a, P, N, R>
where
    P: QuotaProbe,
    N: Notifier,
    R: AccountResolver,
{
    /// Wire up a runner over the given collaborators.
    pub fn new(
        config: &'a Config,
        cache: &'a mut QuotaCache,
        probe: &'a P,
        notifier: &'a N,
        accounts: &'a R,
        log: &'a RunLog,
    ) -> Self {
        Self {
            config,
            engine: DecisionEngine::new(config.engine.hysteresis_minutes),
            catalog: TemplateCatalog::from_overrides(&config.templates),
            cache,
            probe,
            notifier,
            accounts,
            log,
            dry_run: false,
        }
    }

    /// Evaluate and log decisions without sending mail or writing the
    /// cache.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn filesystems(&self) -> Result<Vec<String>> {
        if self.config.probe.filesystems.is_empty() {
            quota_filesystems(&self.config.probe.mount_table)
        } else {
            Ok(self.config.probe.filesystems.clone())
        }
    }

    /// Refresh snapshots and decide notifications for every account with
    /// cached records.
    pub fn notify_run(&mut self) -> Result<RunSummary> {
        let filesystems = self.filesystems()?;
        let uids = self.cache.all_accounts()?;
        let mut summary = RunSummary::default();

        for uid in uids {
            // One clock capture per account so every area sees the same
            // instant.
            let now = Utc::now();
            let mut view = self.collect_account(uid, &filesystems, now, &mut summary)?;

            match self.engine.evaluate(&view, now) {
                Decision::Notify(plan) => {
                    self.deliver(&mut view, &plan, now, &mut summary)?;
                }
                Decision::Hold(_) => {}
            }

            if !self.dry_run {
                self.cache.put_all(&view.records)?;
            }
            summary.accounts += 1;
        }

        self.log
            .info("notify_run_complete", None, None, &summary.to_string());
        Ok(summary)
    }

    /// Probe every passwd account on every quota filesystem and upsert
    /// the observed snapshots. Notification fields are never touched.
    pub fn update_run(&mut self) -> Result<RunSummary> {
        let filesystems = self.filesystems()?;
        let uids = all_uids(&self.config.probe.passwd_file)?;
        let mut summary = RunSummary::default();

        for uid in uids {
            let now = Utc::now();
            let view = self.collect_account(uid, &filesystems, now, &mut summary)?;
            if !self.dry_run {
                self.cache.put_all(&view.records)?;
            }
            summary.accounts += 1;
        }

        self.log
            .info("update_run_complete", None, None, &summary.to_string());
        Ok(summary)
    }

    fn collect_account(
        &self,
        uid: u32,
        filesystems: &[String],
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Result<AccountView> {
        let mut view = AccountView {
            uid,
            username: self.accounts.username(uid),
            records: Vec::with_capacity(filesystems.len() * QuotaKind::ALL.len()),
        };

        for filesystem in filesystems {
            match self.probe.probe(uid, filesystem) {
                Ok(reading) => {
                    for kind in QuotaKind::ALL {
                        let mut record =
                            self.cache.record_or_default(filesystem, uid, kind, now)?;
                        record.refresh_snapshot(reading.snapshot(kind, now), now);
                        view.records.push(record);
                        summary.areas_probed += 1;
                    }
                }
                // Probe and parse failures skip the area: the prior cached
                // record stands and this run's decision omits it.
                Err(error) if error.is_recoverable() => {
                    summary.areas_skipped += QuotaKind::ALL.len();
                    self.log
                        .warn("probe_skip", Some(uid), Some(filesystem), &error.to_string());
                }
                Err(error) => return Err(error),
            }
        }

        Ok(view)
    }

    fn deliver(
        &self,
        view: &mut AccountView,
        plan: &NotificationPlan,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let message = compose(&view.username, view.uid, plan, &self.catalog)?;
        let recipient = if self.config.mail.debug {
            self.config.mail.debug_recipient.clone()
        } else {
            view.username.clone()
        };

        if self.dry_run {
            self.log.info(
                "would_notify",
                Some(view.uid),
                None,
                &format!("{recipient}: {}", message.subject),
            );
            return Ok(());
        }

        match self.notifier.send(&recipient, &message.subject, &message.body) {
            Ok(()) => {
                view.mark_notified(&plan.considered, now);
                summary.notifications_sent += 1;
                self.log.info(
                    "notify_sent",
                    Some(view.uid),
                    None,
                    &describe_plan(&view.username, plan),
                );
            }
            // Delivery failed: notify fields stay unadvanced so the next
            // run retries the same notification.
            Err(error) => {
                summary.notify_failures += 1;
                self.log
                    .warn("notify_failed", Some(view.uid), None, &error.to_string());
            }
        }
        Ok(())
    }
}

fn describe_plan(username: &str, plan: &NotificationPlan) -> String {
    let areas: Vec<String> = plan
        .areas
        .iter()
        .map(|a| {
            format!(
                "{} {} {} {}/{}",
                a.filesystem, a.kind, a.current, a.snapshot.used, a.snapshot.soft_limit
            )
        })
        .collect();
    format!("sent mail to {username}: {}", areas.join(", "))
}

// ──────────────────── tests ────────────────────
