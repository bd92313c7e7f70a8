// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Epoch receipts: accepted vs rejected rewrite candidates.
//!
//! An *epoch* is one commit attempt: the candidates matched against a single
//! graph version, drained in canonical order, and admitted while their
//! footprints stay independent. The receipt records each candidate's outcome
//! and, for rejections, which admitted candidates blocked it. A rejected
//! candidate is not lost; it is re-matched against the next graph version.

use blake3::Hasher;

use crate::constants::digest_len0_u64;
use crate::ident::{Hash, NodeId};
use crate::tx::TxId;

/// The per-candidate outcomes of a single epoch.
#[derive(Debug, Clone)]
pub struct EpochReceipt {
    tx: TxId,
    entries: Vec<EpochReceiptEntry>,
    blocked_by: Vec<Vec<u32>>,
    digest: Hash,
}

impl EpochReceipt {
    pub(crate) fn new(tx: TxId, entries: Vec<EpochReceiptEntry>, blocked_by: Vec<Vec<u32>>) -> Self {
        debug_assert_eq!(entries.len(), blocked_by.len());
        let digest = compute_epoch_receipt_digest(&entries);
        Self {
            tx,
            entries,
            blocked_by,
            digest,
        }
    }

    /// Transaction identifier of the epoch.
    #[must_use]
    pub fn tx(&self) -> TxId {
        self.tx
    }

    /// Entries in canonical candidate order.
    #[must_use]
    pub fn entries(&self) -> &[EpochReceiptEntry] {
        &self.entries
    }

    /// Indices of the admitted candidates that blocked entry `idx`.
    ///
    /// Empty for applied entries and for out-of-range indices. Indices are
    /// ascending and strictly less than `idx`.
    #[must_use]
    pub fn blocked_by(&self, idx: usize) -> &[u32] {
        self.blocked_by.get(idx).map_or(&[], Vec::as_slice)
    }

    /// Number of applied candidates.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.disposition == EpochReceiptDisposition::Applied)
            .count()
    }

    /// Number of rejected candidates.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.entries.len() - self.applied()
    }

    /// Canonical digest of the entries.
    ///
    /// Depends only on the format version, the entry count and the ordered
    /// entry content; neither `tx` nor blocker attribution is included.
    #[must_use]
    pub fn digest(&self) -> Hash {
        self.digest
    }
}

/// One candidate rewrite and its epoch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochReceiptEntry {
    /// Canonical rule family id.
    pub rule_id: Hash,
    /// Registered rule name.
    pub rule_name: &'static str,
    /// Scope node the candidate matched at.
    pub scope: NodeId,
    /// Outcome.
    pub disposition: EpochReceiptDisposition,
}

/// Outcome of an epoch candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochReceiptDisposition {
    /// Candidate rewrite was admitted and applied.
    Applied,
    /// Candidate rewrite was rejected.
    Rejected(EpochRejection),
}

/// Why an epoch candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochRejection {
    /// Footprint conflicts with an already-admitted footprint.
    FootprintConflict,
}

fn compute_epoch_receipt_digest(entries: &[EpochReceiptEntry]) -> Hash {
    if entries.is_empty() {
        return digest_len0_u64();
    }
    let mut hasher = Hasher::new();
    // Receipt format version tag.
    hasher.update(&1u16.to_le_bytes());
    hasher.update(&(entries.len() as u64).to_le_bytes());
    for entry in entries {
        hasher.update(&entry.rule_id);
        hasher.update(&entry.scope.to_le_bytes());
        let code = match entry.disposition {
            EpochReceiptDisposition::Applied => 1u8,
            EpochReceiptDisposition::Rejected(EpochRejection::FootprintConflict) => 2u8,
        };
        hasher.update(&[code]);
    }
    hasher.finalize().into()
}
