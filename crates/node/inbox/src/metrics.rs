//! Inbox metrics. Recording is a no-op unless the `metrics` feature is enabled.

use crate::InboxError;
use std::time::Instant;

/// Describes and zeroes all metrics the inbox may produce.
///
/// Call once at startup, after installing a recorder, so that observers such as Prometheus
/// see every series before the first event.
pub fn describe_inbox_metrics() {
    #[cfg(feature = "metrics")]
    Metrics::init();
}

#[derive(Debug, Clone)]
pub(crate) struct Metrics;

#[cfg(feature = "metrics")]
impl Metrics {
    pub(crate) const MESSAGES_APPENDED_TOTAL: &'static str = "inbox_messages_appended_total";
    pub(crate) const BLOCKS_SEALED_TOTAL: &'static str = "inbox_blocks_sealed_total";
    pub(crate) const LEDGER_LENGTH: &'static str = "inbox_ledger_length";
    pub(crate) const HEAD_BLOCK_NUMBER: &'static str = "inbox_head_block_number";
    pub(crate) const REORG_TOTAL: &'static str = "inbox_reorg_total";
    pub(crate) const REORG_DEPTH: &'static str = "inbox_reorg_depth";
    pub(crate) const ADD_MESSAGES_ERROR_TOTAL: &'static str = "inbox_add_messages_error_total";
    pub(crate) const EXECUTION_FAILURE_TOTAL: &'static str = "inbox_execution_failure_total";
    pub(crate) const ADD_MESSAGES_DURATION_SECONDS: &'static str =
        "inbox_add_messages_duration_seconds";

    fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::MESSAGES_APPENDED_TOTAL,
            metrics::Unit::Count,
            "Total number of messages appended to the inbox ledger",
        );
        metrics::describe_counter!(
            Self::BLOCKS_SEALED_TOTAL,
            metrics::Unit::Count,
            "Total number of blocks sealed, including blocks re-sealed during reorgs",
        );
        metrics::describe_gauge!(
            Self::LEDGER_LENGTH,
            metrics::Unit::Count,
            "Number of committed messages in the inbox ledger",
        );
        metrics::describe_gauge!(
            Self::HEAD_BLOCK_NUMBER,
            metrics::Unit::Count,
            "Number of the latest sealed block",
        );
        metrics::describe_counter!(
            Self::REORG_TOTAL,
            metrics::Unit::Count,
            "Total number of committed inbox reorgs",
        );
        metrics::describe_histogram!(
            Self::REORG_DEPTH,
            metrics::Unit::Count,
            "Number of ledger messages discarded by a reorg",
        );
        metrics::describe_counter!(
            Self::ADD_MESSAGES_ERROR_TOTAL,
            metrics::Unit::Count,
            "Total number of rejected add-messages calls",
        );
        metrics::describe_counter!(
            Self::EXECUTION_FAILURE_TOTAL,
            metrics::Unit::Count,
            "Total number of batches rolled back because the engine failed to apply a message",
        );
        metrics::describe_histogram!(
            Self::ADD_MESSAGES_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Latency of add-messages calls",
        );
    }

    fn zero() {
        metrics::counter!(Self::MESSAGES_APPENDED_TOTAL).increment(0);
        metrics::counter!(Self::BLOCKS_SEALED_TOTAL).increment(0);
        metrics::gauge!(Self::LEDGER_LENGTH).set(0.0);
        metrics::gauge!(Self::HEAD_BLOCK_NUMBER).set(0.0);
        metrics::counter!(Self::REORG_TOTAL).increment(0);
        metrics::counter!(Self::ADD_MESSAGES_ERROR_TOTAL).increment(0);
        metrics::counter!(Self::EXECUTION_FAILURE_TOTAL).increment(0);
    }
}

impl Metrics {
    /// Records a committed change of the ledger and block list.
    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    pub(crate) fn record_commit(appended: u64, sealed: usize, length: u64, head: u64) {
        #[cfg(feature = "metrics")]
        {
            metrics::counter!(Self::MESSAGES_APPENDED_TOTAL).increment(appended);
            metrics::counter!(Self::BLOCKS_SEALED_TOTAL).increment(sealed as u64);
            metrics::gauge!(Self::LEDGER_LENGTH).set(length as f64);
            metrics::gauge!(Self::HEAD_BLOCK_NUMBER).set(head as f64);
        }
    }

    /// Records a committed reorg that discarded `depth` messages.
    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    pub(crate) fn record_reorg(depth: u64) {
        #[cfg(feature = "metrics")]
        {
            metrics::counter!(Self::REORG_TOTAL).increment(1);
            metrics::histogram!(Self::REORG_DEPTH).record(depth as f64);
        }
    }

    /// Records the outcome of an add-messages call that started at `started`.
    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    pub(crate) fn record_add_messages<E>(started: Instant, result: &Result<(), InboxError<E>>)
    where
        E: core::error::Error + 'static,
    {
        #[cfg(feature = "metrics")]
        {
            metrics::histogram!(Self::ADD_MESSAGES_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
            match result {
                Ok(()) => {}
                Err(InboxError::Execution { .. }) => {
                    metrics::counter!(Self::ADD_MESSAGES_ERROR_TOTAL).increment(1);
                    metrics::counter!(Self::EXECUTION_FAILURE_TOTAL).increment(1);
                }
                Err(_) => metrics::counter!(Self::ADD_MESSAGES_ERROR_TOTAL).increment(1),
            }
        }
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use crate::{
        InboxState,
        test_utils::{ALICE, BOB, GENESIS_BALANCE, engine, ending, transfer},
    };
    use inbox_storage::MemoryDb;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_inbox_operations_record_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_inbox_metrics();
            let inbox = InboxState::open(MemoryDb::new(), engine()).unwrap();
            inbox
                .add_messages(
                    0,
                    false,
                    vec![
                        transfer(ALICE, BOB, 1),
                        ending(transfer(ALICE, BOB, 1)),
                        transfer(ALICE, BOB, 1),
                    ],
                )
                .unwrap();
            assert!(matches!(
                inbox.add_messages(3, false, vec![transfer(BOB, ALICE, GENESIS_BALANCE)]),
                Err(InboxError::Execution { index: 3, .. })
            ));
            assert!(matches!(
                inbox.add_messages(0, false, vec![transfer(ALICE, BOB, 1)]),
                Err(InboxError::SequenceMismatch { expected: 3, got: 0 })
            ));
            inbox.reorg_to(1).unwrap();
        });

        let rendered = handle.render();
        for line in [
            format!("{} 3", Metrics::MESSAGES_APPENDED_TOTAL),
            format!("{} 1", Metrics::BLOCKS_SEALED_TOTAL),
            format!("{} 1", Metrics::LEDGER_LENGTH),
            format!("{} 0", Metrics::HEAD_BLOCK_NUMBER),
            format!("{} 1", Metrics::REORG_TOTAL),
            format!("{}_sum 2", Metrics::REORG_DEPTH),
            format!("{} 2", Metrics::ADD_MESSAGES_ERROR_TOTAL),
            format!("{} 1", Metrics::EXECUTION_FAILURE_TOTAL),
            format!("{}_count 3", Metrics::ADD_MESSAGES_DURATION_SECONDS),
        ] {
            assert!(rendered.lines().any(|l| l == line), "missing `{line}` in:\n{rendered}");
        }
    }
}
