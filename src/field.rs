// This module holds the team/seed model for the 64-team field.
// A field is four regions of 16 seeded teams; a missing seed is a hole, not an error.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Seeds run 1..=16 within a region.
pub const SEEDS_PER_REGION: u8 = 16;

/// A seeded tournament team. Teams are immutable values: two teams are equal
/// iff both seed and name match, regardless of where the structs came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    pub seed: u8,
    pub name: String,
}

impl Team {
    pub fn new(seed: u8, name: impl Into<String>) -> Team {
        Team {
            seed,
            name: name.into(),
        }
    }

    /// Well-formedness check applied at every load boundary: seed in range,
    /// non-empty name.
    pub fn is_valid(&self) -> bool {
        (1..=SEEDS_PER_REGION).contains(&self.seed) && !self.name.is_empty()
    }
}

/// One quadrant of the 64-team field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    South,
    West,
    East,
    Midwest,
}

impl Region {
    /// Fixed iteration order used everywhere a "for each region" walk happens.
    pub const ALL: [Region; 4] = [Region::South, Region::West, Region::East, Region::Midwest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::South => "SOUTH",
            Region::West => "WEST",
            Region::East => "EAST",
            Region::Midwest => "MIDWEST",
        }
    }

    /// Case-insensitive parse of a region name ("South", "SOUTH", "south").
    pub fn parse(s: &str) -> Option<Region> {
        match s.to_ascii_uppercase().as_str() {
            "SOUTH" => Some(Region::South),
            "WEST" => Some(Region::West),
            "EAST" => Some(Region::East),
            "MIDWEST" => Some(Region::Midwest),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Region::South => 0,
            Region::West => 1,
            Region::East => 2,
            Region::Midwest => 3,
        }
    }
}

/// The 16 seed slots of one region. Seed `s` lives at index `s - 1`;
/// `None` means the seed has not been announced (or failed validation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionField {
    seeds: [Option<Team>; 16],
}

impl RegionField {
    pub fn new() -> RegionField {
        RegionField::default()
    }

    /// Place a team at its seed slot. Invalid teams are skipped with a warning
    /// so one bad row never sinks the whole field.
    pub fn insert(&mut self, team: Team) {
        if !team.is_valid() {
            warn!(seed = team.seed, name = %team.name, "skipping invalid team");
            return;
        }
        let idx = (team.seed - 1) as usize;
        self.seeds[idx] = Some(team);
    }

    pub fn by_seed(&self, seed: u8) -> Option<&Team> {
        if !(1..=SEEDS_PER_REGION).contains(&seed) {
            return None;
        }
        self.seeds[(seed - 1) as usize].as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.seeds.iter().all(|s| s.is_some())
    }
}

/// A single team row in the external field format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRecord {
    pub region: String,
    pub seed: String,
    pub name: String,
}

/// The full four-region tournament field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    south: RegionField,
    west: RegionField,
    east: RegionField,
    midwest: RegionField,
}

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("failed to read field file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse field csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to parse field json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Field {
    pub fn new() -> Field {
        Field::default()
    }

    pub fn region(&self, region: Region) -> &RegionField {
        match region {
            Region::South => &self.south,
            Region::West => &self.west,
            Region::East => &self.east,
            Region::Midwest => &self.midwest,
        }
    }

    fn region_mut(&mut self, region: Region) -> &mut RegionField {
        match region {
            Region::South => &mut self.south,
            Region::West => &mut self.west,
            Region::East => &mut self.east,
            Region::Midwest => &mut self.midwest,
        }
    }

    pub fn insert(&mut self, region: Region, team: Team) {
        self.region_mut(region).insert(team);
    }

    pub fn team(&self, region: Region, seed: u8) -> Option<&Team> {
        self.region(region).by_seed(seed)
    }

    /// Load the field from a CSV file with `region,seed,team` columns.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Field, FieldError> {
        let rdr = csv::Reader::from_path(path.as_ref())?;
        Field::from_csv_reader(rdr)
    }

    /// Load the field from any CSV source (used by tests and the CLI alike).
    pub fn from_csv_reader<R: io::Read>(mut rdr: csv::Reader<R>) -> Result<Field, FieldError> {
        let mut field = Field::new();
        for result in rdr.records() {
            let record = result?;
            if record.len() < 3 {
                warn!(row = ?record, "skipping short field row");
                continue;
            }
            field.ingest_record(&record[0], &record[1], &record[2]);
        }
        Ok(field)
    }

    /// Load the field from a JSON array of `{region, seed, name}` records.
    pub fn from_json_records(json: &str) -> Result<Field, FieldError> {
        let records: Vec<FieldRecord> = serde_json::from_str(json)?;
        let mut field = Field::new();
        for rec in &records {
            field.ingest_record(&rec.region, &rec.seed, &rec.name);
        }
        Ok(field)
    }

    fn ingest_record(&mut self, region: &str, seed: &str, name: &str) {
        let region = match Region::parse(region) {
            Some(r) => r,
            None => {
                warn!(region, "skipping row with unknown region");
                return;
            }
        };
        // Play-in entries carry a letter suffix on the seed ("16a"); the
        // committee's eventual pick takes the bare seed slot.
        let mut seed_str = seed.trim().to_string();
        if seed_str.ends_with('a') || seed_str.ends_with('b') {
            seed_str.pop();
        }
        let seed: u8 = match seed_str.parse() {
            Ok(s) => s,
            Err(_) => {
                warn!(seed, "skipping row with unparsable seed");
                return;
            }
        };
        self.insert(region, Team::new(seed, name.trim()));
    }

    /// Fast `(region, seed) -> name` index for callers that resolve many
    /// stored picks against the field.
    pub fn lookup(&self) -> HashMap<(Region, u8), &Team> {
        let mut map = HashMap::with_capacity(64);
        for region in Region::ALL {
            for seed in 1..=SEEDS_PER_REGION {
                if let Some(team) = self.team(region, seed) {
                    map.insert((region, seed), team);
                }
            }
        }
        map
    }

    /// A fully-populated demonstration field: seed `s` of each region is named
    /// "<Region> s" (e.g. "South 1"). Used by the CLI's dry-run mode and tests.
    pub fn sample() -> Field {
        let mut field = Field::new();
        for region in Region::ALL {
            for seed in 1..=SEEDS_PER_REGION {
                field.insert(region, Team::new(seed, format!("{} {}", region.as_str(), seed)));
            }
        }
        field
    }
}
