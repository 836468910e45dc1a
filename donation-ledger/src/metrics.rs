//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the runtime.
//!
//! # Metrics
//!
//! - `donation_transactions_total{instruction, outcome}` - Processed transactions
//! - `donation_lamports_donated_total` - Lamports contributed to banks
//! - `donation_lamports_withdrawn_total` - Lamports withdrawn from banks
//! - `donation_accounts` - Accounts in the store

use crate::event::LedgerEvent;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
///
/// Each runtime owns its own registry so several runtimes can coexist in
/// one process.
#[derive(Clone)]
pub struct Metrics {
    /// Transactions by first instruction name and outcome
    pub transactions: IntCounterVec,

    /// Lamports contributed
    pub lamports_donated: IntCounter,

    /// Lamports withdrawn
    pub lamports_withdrawn: IntCounter,

    /// Accounts in the store
    pub accounts: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("lamports_donated", &self.lamports_donated.get())
            .field("lamports_withdrawn", &self.lamports_withdrawn.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions = IntCounterVec::new(
            Opts::new("donation_transactions_total", "Processed transactions"),
            &["instruction", "outcome"],
        )?;
        registry.register(Box::new(transactions.clone()))?;

        let lamports_donated = IntCounter::new(
            "donation_lamports_donated_total",
            "Lamports contributed to banks",
        )?;
        registry.register(Box::new(lamports_donated.clone()))?;

        let lamports_withdrawn = IntCounter::new(
            "donation_lamports_withdrawn_total",
            "Lamports withdrawn from banks",
        )?;
        registry.register(Box::new(lamports_withdrawn.clone()))?;

        let accounts = IntGauge::new("donation_accounts", "Accounts in the store")?;
        registry.register(Box::new(accounts.clone()))?;

        Ok(Self {
            transactions,
            lamports_donated,
            lamports_withdrawn,
            accounts,
            registry,
        })
    }

    /// Record a processed transaction
    pub fn record_transaction(&self, instruction: &str, ok: bool) {
        let outcome = if ok { "committed" } else { "rejected" };
        self.transactions
            .with_label_values(&[instruction, outcome])
            .inc();
    }

    /// Fold committed events into the lamport counters
    pub fn record_events(&self, events: &[LedgerEvent]) {
        for event in events {
            match event {
                LedgerEvent::Donation(e) => self.lamports_donated.inc_by(e.amount),
                LedgerEvent::Withdraw(e) => self.lamports_withdrawn.inc_by(e.amount),
            }
        }
    }

    /// Update account count
    pub fn set_accounts(&self, count: usize) {
        self.accounts.set(count as i64);
    }

    /// Render in Prometheus text format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DonationEvent, WithdrawEvent};
    use crate::types::Pubkey;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.lamports_donated.get(), 0);
        assert_eq!(metrics.lamports_withdrawn.get(), 0);

        // Independent registries do not collide
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_record_transaction() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transaction("make_donation", true);
        metrics.record_transaction("make_donation", false);
        metrics.record_transaction("make_donation", true);

        assert_eq!(
            metrics
                .transactions
                .with_label_values(&["make_donation", "committed"])
                .get(),
            2
        );
        assert!(metrics.render().contains("donation_transactions_total"));
    }

    #[test]
    fn test_record_events() {
        let metrics = Metrics::new().unwrap();
        let bank = Pubkey::new_rand();
        metrics.record_events(&[
            LedgerEvent::Donation(DonationEvent {
                bank,
                donor: Pubkey::new_rand(),
                amount: 10_000,
            }),
            LedgerEvent::Withdraw(WithdrawEvent {
                bank,
                destination: Pubkey::new_rand(),
                amount: 7_000,
            }),
        ]);
        assert_eq!(metrics.lamports_donated.get(), 10_000);
        assert_eq!(metrics.lamports_withdrawn.get(), 7_000);
    }
}
