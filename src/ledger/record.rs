use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Block explorer used to link transaction hashes.
pub const EXPLORER_TX_URL: &str = "https://holesky.beaconcha.in/tx/";

/// A single payment as stored in the ledger.
///
/// Field order is part of the snapshot format: `{recipient, amount, date, hash}`.
/// `amount` stays a decimal string (ETH) so it is never round-tripped through a float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub recipient: String,
    pub amount: String,
    pub date: String,
    pub hash: String,
}

impl TransactionRecord {
    pub fn new(
        recipient: impl Into<String>,
        amount: impl Into<String>,
        date: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            amount: amount.into(),
            date: date.into(),
            hash: hash.into(),
        }
    }

    /// Case-insensitive substring match on the recipient.
    pub fn recipient_matches(&self, term: &str) -> bool {
        self.recipient
            .to_lowercase()
            .contains(&term.to_lowercase())
    }

    pub fn explorer_url(&self) -> String {
        format!("{}{}", EXPLORER_TX_URL, self.hash)
    }

    /// Long hashes are shown as `first15...last15`.
    pub fn short_hash(&self) -> String {
        let chars: Vec<char> = self.hash.chars().collect();
        if chars.len() > 40 {
            let head: String = chars[..15].iter().collect();
            let tail: String = chars[chars.len() - 15..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            self.hash.clone()
        }
    }

    /// Recipient as shown in the sync view (truncated past 20 chars).
    pub fn short_recipient(&self) -> String {
        if self.recipient.chars().count() > 20 {
            let head: String = self.recipient.chars().take(20).collect();
            format!("{}...", head)
        } else {
            self.recipient.clone()
        }
    }
}

/// Candidates whose hash is not present in `known`, in input order.
///
/// Pure set difference keyed by hash. Duplicates inside `candidates` are kept;
/// the ledger collapses them on merge.
pub fn filter_unseen<'a, I>(known: &[TransactionRecord], candidates: I) -> Vec<TransactionRecord>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let seen: HashSet<&str> = known.iter().map(|r| r.hash.as_str()).collect();

    candidates
        .into_iter()
        .filter(|c| !seen.contains(c.hash.as_str()))
        .cloned()
        .collect()
}
