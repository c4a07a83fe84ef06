// SPDX-License-Identifier: GPL-3.0-only

//! Lens selection on multi-camera devices
//!
//! Phones expose several sensors as separate device indices. The main lens is
//! index 0 and the front camera index 1; the wide lens has no fixed index, so
//! 2, 3 and 4 are tried in turn. Every lens falls back to the main lens.

use crate::backends::camera::types::ProbeCandidate;

const MAIN_INDEX: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lens {
    #[default]
    Main,
    Wide,
    Front,
}

impl Lens {
    /// Device indices to try for this lens, in order
    pub fn preferred_indices(&self) -> &'static [u32] {
        match self {
            Lens::Main => &[MAIN_INDEX],
            Lens::Wide => &[2, 3, 4],
            Lens::Front => &[1],
        }
    }

    /// The lens after this one when cycling
    pub fn next(&self) -> Lens {
        match self {
            Lens::Main => Lens::Wide,
            Lens::Wide => Lens::Front,
            Lens::Front => Lens::Main,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Lens::Main => "Main",
            Lens::Wide => "Wide angle",
            Lens::Front => "Front",
        }
    }

    /// Candidates from `table` for this lens, in preferred-index order
    ///
    /// Within one index the table's backend order is kept.
    pub fn candidates(&self, table: &[ProbeCandidate]) -> Vec<ProbeCandidate> {
        select_indices(table, self.preferred_indices())
    }

    /// Candidates used when none of this lens's indices work
    pub fn fallback_candidates(&self, table: &[ProbeCandidate]) -> Vec<ProbeCandidate> {
        match self {
            Lens::Main => Vec::new(),
            _ => select_indices(table, &[MAIN_INDEX]),
        }
    }
}

impl std::fmt::Display for Lens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn select_indices(table: &[ProbeCandidate], indices: &[u32]) -> Vec<ProbeCandidate> {
    indices
        .iter()
        .flat_map(|index| table.iter().filter(move |c| c.index == *index).copied())
        .collect()
}
