use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// QARTOD flag values
// ---------------------------------------------------------------------------

/// QARTOD quality flag. Variants are declared in ascending severity, so
/// `Ord` (and therefore `max`) picks the worst assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum QartodFlag {
    Pass,
    NotEvaluated,
    Suspect,
    Fail,
    Missing,
}

impl QartodFlag {
    /// Numeric value written to data files.
    pub fn code(self) -> u8 {
        match self {
            QartodFlag::Pass => 1,
            QartodFlag::NotEvaluated => 2,
            QartodFlag::Suspect => 3,
            QartodFlag::Fail => 4,
            QartodFlag::Missing => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(QartodFlag::Pass),
            2 => Some(QartodFlag::NotEvaluated),
            3 => Some(QartodFlag::Suspect),
            4 => Some(QartodFlag::Fail),
            9 => Some(QartodFlag::Missing),
            _ => None,
        }
    }

    /// `flag_meanings` attribute text.
    pub fn meaning(self) -> &'static str {
        match self {
            QartodFlag::Pass => "pass",
            QartodFlag::NotEvaluated => "not_evaluated",
            QartodFlag::Suspect => "suspect_or_of_high_interest",
            QartodFlag::Fail => "fail",
            QartodFlag::Missing => "missing_data",
        }
    }
}

impl fmt::Display for QartodFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.meaning())
    }
}

impl From<QartodFlag> for u8 {
    fn from(flag: QartodFlag) -> u8 {
        flag.code()
    }
}

impl TryFrom<u8> for QartodFlag {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        QartodFlag::from_code(code).ok_or_else(|| format!("{code} is not a QARTOD flag value"))
    }
}

// ---------------------------------------------------------------------------
// Worst-case-wins accumulation
// ---------------------------------------------------------------------------

/// Per-sample running maximum over every rule applied so far.
///
/// Flags only move up in severity; the result does not depend on the
/// order in which rules are raised.
#[derive(Debug, Clone)]
pub struct FlagAccumulator {
    flags: Vec<QartodFlag>,
}

impl FlagAccumulator {
    /// `n` samples, all passing.
    pub fn new(n: usize) -> Self {
        FlagAccumulator {
            flags: vec![QartodFlag::Pass; n],
        }
    }

    /// Raise every sample whose mask entry is true to at least `severity`.
    pub fn raise(&mut self, severity: QartodFlag, mask: &[bool]) {
        debug_assert_eq!(mask.len(), self.flags.len());
        for (flag, &hit) in self.flags.iter_mut().zip(mask) {
            if hit {
                *flag = (*flag).max(severity);
            }
        }
    }

    pub fn flags(&self) -> &[QartodFlag] {
        &self.flags
    }

    pub fn finish(self) -> Vec<QartodFlag> {
        self.flags
    }
}

/// Number of samples carrying each flag value.
pub fn flag_counts(flags: &[QartodFlag]) -> BTreeMap<QartodFlag, usize> {
    let mut counts = BTreeMap::new();
    for &f in flags {
        *counts.entry(f).or_insert(0) += 1;
    }
    counts
}

/// One-line summary such as `1 (pass): 120, 3 (suspect_or_of_high_interest): 4`.
pub fn summarize(flags: &[QartodFlag]) -> String {
    flag_counts(flags)
        .iter()
        .map(|(flag, n)| format!("{flag}: {n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_suspect_never_downgrades_fail() {
        let mut acc = FlagAccumulator::new(3);
        acc.raise(QartodFlag::Fail, &[true, false, false]);
        acc.raise(QartodFlag::Suspect, &[true, true, false]);
        assert_eq!(
            acc.finish(),
            vec![QartodFlag::Fail, QartodFlag::Suspect, QartodFlag::Pass]
        );
    }

    #[test]
    fn codes_round_trip_through_serde() {
        let json = serde_json::to_string(&vec![QartodFlag::Pass, QartodFlag::Fail]).unwrap();
        assert_eq!(json, "[1,4]");
        let back: Vec<QartodFlag> = serde_json::from_str("[3,9]").unwrap();
        assert_eq!(back, vec![QartodFlag::Suspect, QartodFlag::Missing]);
        assert!(serde_json::from_str::<QartodFlag>("5").is_err());
    }

    #[test]
    fn summary_lists_counts_in_severity_order() {
        let flags = [QartodFlag::Fail, QartodFlag::Pass, QartodFlag::Pass];
        assert_eq!(summarize(&flags), "1 (pass): 2, 4 (fail): 1");
    }
}
