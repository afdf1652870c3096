//! Dimension weights.
//!
//! Weights are basis points so the sum can be checked exactly, once by the
//! compiler and once more when an engine is built from a weight table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One scoring dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Skill,
    Availability,
    Network,
    Interest,
    Resource,
    TrackRecord,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Self::Skill,
        Self::Availability,
        Self::Network,
        Self::Interest,
        Self::Resource,
        Self::TrackRecord,
    ];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skill => "skill",
            Self::Availability => "availability",
            Self::Network => "network",
            Self::Interest => "interest",
            Self::Resource => "resource",
            Self::TrackRecord => "track_record",
        };
        f.write_str(name)
    }
}

/// Sum every weight must add up to (1.0).
pub const TOTAL_BASIS_POINTS: u32 = 10_000;

pub type WeightTable = [(Dimension, u32); 6];

/// The matching weights.
pub const WEIGHTS: WeightTable = [
    (Dimension::Skill, 3_000),
    (Dimension::Availability, 2_000),
    (Dimension::Network, 1_500),
    (Dimension::Interest, 1_500),
    (Dimension::Resource, 1_000),
    (Dimension::TrackRecord, 1_000),
];

/// Summed in `u64`; six `u32` entries cannot overflow it.
const fn basis_point_sum(table: &WeightTable) -> u64 {
    let mut sum = 0;
    let mut i = 0;
    while i < table.len() {
        sum += table[i].1 as u64;
        i += 1;
    }
    sum
}

const _: () = assert!(basis_point_sum(&WEIGHTS) == TOTAL_BASIS_POINTS as u64, "matching weights must sum to 1.0");

/// Check a weight table covers each dimension exactly once and sums to 1.0.
pub fn validate(table: &WeightTable) -> Result<()> {
    let sum = basis_point_sum(table);
    if sum != u64::from(TOTAL_BASIS_POINTS) {
        return Err(Error::InvalidWeights(sum as f64 / f64::from(TOTAL_BASIS_POINTS)));
    }
    for dimension in Dimension::ALL {
        if table.iter().filter(|(d, _)| *d == dimension).count() != 1 {
            return Err(Error::Config(format!("weight table must list {dimension} exactly once")));
        }
    }
    Ok(())
}

pub fn weight_of(table: &WeightTable, dimension: Dimension) -> f64 {
    table
        .iter()
        .find(|(d, _)| *d == dimension)
        .map_or(0.0, |(_, bp)| f64::from(*bp) / f64::from(TOTAL_BASIS_POINTS))
}
