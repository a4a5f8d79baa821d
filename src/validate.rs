use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::error::Result;
use crate::models::Radio;
use crate::repo::Repo;

/// Quiet period between the last keystroke and the store lookup.
pub const QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Per-field validation state. `Invalid` covers both a taken value and a
/// failed lookup: when the store cannot be asked, the form stays blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Idle,
    Checking,
    Valid,
    Invalid,
}

/// Seam between the checker and whatever answers "is this value taken".
#[async_trait]
pub trait UniqueLookup: Send + Sync + 'static {
    async fn taken(&self, value: &str) -> Result<bool>;
}

struct IdLookup(Repo<Radio>);

#[async_trait]
impl UniqueLookup for IdLookup {
    async fn taken(&self, value: &str) -> Result<bool> {
        self.0.id_taken(value).await
    }
}

struct SerialLookup(Repo<Radio>);

#[async_trait]
impl UniqueLookup for SerialLookup {
    async fn taken(&self, value: &str) -> Result<bool> {
        self.0.serial_taken(value).await
    }
}

/// Digits only, truncated to the 4-character id length.
pub fn normalize_radio_id(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).take(4).collect()
}

/// Serial numbers are stored and compared uppercase.
pub fn normalize_serial(input: &str) -> String {
    input.to_uppercase()
}

fn id_ready(value: &str) -> bool {
    value.len() == 4
}

fn serial_ready(value: &str) -> bool {
    !value.is_empty()
}

/// Debounced uniqueness check for one form field.
///
/// Every keystroke bumps a generation counter and schedules a lookup after
/// the quiet period; a task that wakes up (or completes) under a stale
/// generation discards its result, so only the check for the field's current
/// value can ever update the state. Checks apply to new-record creation
/// only; when editing an existing record no checker is constructed and the
/// submission gate bypasses validation.
pub struct UniquenessCheck {
    lookup: Arc<dyn UniqueLookup>,
    quiet: Duration,
    generation: Arc<AtomicU64>,
    tx: watch::Sender<Validation>,
    rx: watch::Receiver<Validation>,
    normalize: fn(&str) -> String,
    ready: fn(&str) -> bool,
}

impl UniquenessCheck {
    fn with_rules(
        lookup: Arc<dyn UniqueLookup>,
        normalize: fn(&str) -> String,
        ready: fn(&str) -> bool,
    ) -> Self {
        let (tx, rx) = watch::channel(Validation::Idle);
        Self {
            lookup,
            quiet: QUIET_PERIOD,
            generation: Arc::new(AtomicU64::new(0)),
            tx,
            rx,
            normalize,
            ready,
        }
    }

    /// Checker for the user-chosen 4-digit radio id.
    pub fn radio_id(repo: &Repo<Radio>) -> Self {
        Self::with_rules(Arc::new(IdLookup(repo.clone())), normalize_radio_id, id_ready)
    }

    /// Checker for the radio serial number.
    pub fn serial(repo: &Repo<Radio>) -> Self {
        Self::with_rules(
            Arc::new(SerialLookup(repo.clone())),
            normalize_serial,
            serial_ready,
        )
    }

    /// Custom lookup variant, also used by tests to substitute a fake store.
    pub fn for_lookup(lookup: Arc<dyn UniqueLookup>, normalize: fn(&str) -> String) -> Self {
        Self::with_rules(lookup, normalize, serial_ready)
    }

    pub fn with_quiet(mut self, quiet: Duration) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn state(&self) -> Validation {
        *self.rx.borrow()
    }

    /// Change notifications for the owning form.
    pub fn subscribe(&self) -> watch::Receiver<Validation> {
        self.rx.clone()
    }

    /// Feeds one keystroke. Returns the normalized value the field should
    /// display. A value the gate rejects (wrong id length, empty serial)
    /// resets to `Idle` and cancels any pending check.
    pub fn keystroke(&self, raw: &str) -> String {
        let value = (self.normalize)(raw);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !(self.ready)(&value) {
            let _ = self.tx.send(Validation::Idle);
            return value;
        }

        let lookup = self.lookup.clone();
        let counter = self.generation.clone();
        let tx = self.tx.clone();
        let quiet = self.quiet;
        let checked = value.clone();
        tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            // A newer keystroke rescheduled the check; this one is void.
            if counter.load(Ordering::SeqCst) != generation {
                return;
            }
            let _ = tx.send(Validation::Checking);
            let outcome = match lookup.taken(&checked).await {
                Ok(true) => Validation::Invalid,
                Ok(false) => Validation::Valid,
                Err(err) => {
                    debug!(%err, value = %checked, "uniqueness lookup failed; failing closed");
                    Validation::Invalid
                }
            };
            // The in-flight request is not cancelled by later keystrokes,
            // but its result may no longer be applied.
            if counter.load(Ordering::SeqCst) == generation {
                let _ = tx.send(outcome);
            }
        });
        value
    }

    /// Back to `Idle`, voiding any pending or in-flight check. Called when
    /// the input is cleared or the owning form is torn down.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(Validation::Idle);
    }
}

/// The form's submit gate: updates bypass validation entirely; new records
/// need both fields vouched for.
pub fn submission_allowed(editing_existing: bool, id: Validation, serial: Validation) -> bool {
    editing_existing || (id == Validation::Valid && serial == Validation::Valid)
}
