//! Stage hash comparison.

use chainproof_core::Fingerprint;
use serde::{Deserialize, Serialize};

/// Divergence between stored and recomputed stage hashes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageAnomaly {
    /// First position where the sequences differ
    pub index: usize,
    /// Stored hash at `index`, absent if the stored sequence is shorter
    pub stored: Option<Fingerprint>,
    /// Recomputed hash at `index`, absent if the recomputed sequence is shorter
    pub recomputed: Option<Fingerprint>,
    /// Number of stored stage hashes
    pub stored_len: usize,
    /// Number of recomputed stage hashes
    pub recomputed_len: usize,
}

impl StageAnomaly {
    /// Whether the two sequences have different lengths
    #[must_use]
    pub fn length_differs(&self) -> bool {
        self.stored_len != self.recomputed_len
    }
}

impl std::fmt::Display for StageAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |fp: &Option<Fingerprint>| {
            fp.as_ref()
                .map_or_else(|| "<none>".to_string(), |fp| fp.to_string())
        };
        write!(
            f,
            "stage {} differs: stored {}, recomputed {}",
            self.index,
            show(&self.stored),
            show(&self.recomputed)
        )?;
        if self.length_differs() {
            write!(
                f,
                " ({} stored stages, {} recomputed)",
                self.stored_len, self.recomputed_len
            )?;
        }
        Ok(())
    }
}

/// Find the first divergence between two stage hash sequences
///
/// Returns `None` when the sequences are identical.
#[must_use]
pub fn stage_diff(stored: &[Fingerprint], recomputed: &[Fingerprint]) -> Option<StageAnomaly> {
    let index = stored
        .iter()
        .zip(recomputed)
        .position(|(a, b)| a != b)
        .or_else(|| (stored.len() != recomputed.len()).then_some(stored.len().min(recomputed.len())))?;

    Some(StageAnomaly {
        index,
        stored: stored.get(index).cloned(),
        recomputed: recomputed.get(index).cloned(),
        stored_len: stored.len(),
        recomputed_len: recomputed.len(),
    })
}
