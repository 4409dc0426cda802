//! Seed data loaders for data-driven escape-room content
//!
//! Catalogs and achievement tables live in JSON files (by default under
//! `data/seeds/`) so rooms can be authored without recompiling. `escapekit init`
//! writes the built-in starter content in the same format.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::escape::catalog::PuzzleCatalog;
use crate::escape::errors::EscapeError;
use crate::escape::rooms::RoomGraph;
use crate::escape::types::{
    AchievementRecord, AchievementRule, Item, Puzzle, PuzzleId, PuzzleKind, Room, TerminalScript,
};

/// Everything a catalog file describes.
#[derive(Debug)]
pub struct LoadedContent {
    pub catalog: PuzzleCatalog,
    pub rooms: RoomGraph,
}

fn invalid_data(path: &Path, e: impl std::fmt::Display) -> EscapeError {
    EscapeError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("Failed to parse {}: {}", path.display(), e),
    ))
}

/// Load and validate a catalog from `data/seeds/catalog.json`-style JSON.
pub fn load_catalog_from_json<P: AsRef<Path>>(path: P) -> Result<LoadedContent, EscapeError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let seed: CatalogSeed = serde_json::from_str(&contents).map_err(|e| invalid_data(path, e))?;
    seed.into_content()
}

/// Load achievements from `data/seeds/achievements.json`.
pub fn load_achievements_from_json<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<AchievementRecord>, EscapeError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let seeds: Vec<AchievementSeed> =
        serde_json::from_str(&contents).map_err(|e| invalid_data(path, e))?;

    seeds
        .into_iter()
        .map(|seed| {
            let rule = seed.rule()?;
            let mut record = AchievementRecord::new(&seed.id, &seed.title, &seed.description, rule);
            if seed.hidden {
                record = record.as_hidden();
            }
            Ok(record)
        })
        .collect()
}

/// Write `catalog` and `rooms` as catalog JSON.
pub fn write_catalog_json<P: AsRef<Path>>(
    path: P,
    catalog: &PuzzleCatalog,
    rooms: &RoomGraph,
) -> Result<(), EscapeError> {
    let seed = CatalogSeed::from_content(catalog, rooms);
    write_pretty(path.as_ref(), &seed)
}

pub fn write_achievements_json<P: AsRef<Path>>(
    path: P,
    achievements: &[AchievementRecord],
) -> Result<(), EscapeError> {
    let seeds: Vec<AchievementSeed> = achievements.iter().map(AchievementSeed::from_record).collect();
    write_pretty(path.as_ref(), &seeds)
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), EscapeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

// ============================================================================
// Seed data structures that match JSON format
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct CatalogSeed {
    puzzles: Vec<PuzzleSeed>,
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    grants: Vec<GrantSeed>,
    #[serde(default)]
    rooms: Vec<RoomSeed>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PuzzleSeed {
    id: PuzzleId,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    hint: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    solution: String,
    #[serde(default)]
    required_item: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    terminal: Option<TerminalScript>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GrantSeed {
    puzzle: PuzzleId,
    item: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RoomSeed {
    id: String,
    name: String,
    x: f32,
    y: f32,
    #[serde(default)]
    connections: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AchievementSeed {
    id: String,
    title: String,
    description: String,
    /// Rule name, e.g. `"no_hints"` or `"puzzles_solved"`.
    rule: String,
    /// Threshold for counted rules (count, seconds or ratio).
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    hidden: bool,
}

impl CatalogSeed {
    fn into_content(self) -> Result<LoadedContent, EscapeError> {
        let puzzles = self
            .puzzles
            .into_iter()
            .map(PuzzleSeed::into_puzzle)
            .collect::<Result<Vec<_>, _>>()?;

        let mut grants = BTreeMap::new();
        for grant in self.grants {
            if grants.insert(grant.puzzle, grant.item).is_some() {
                return Err(EscapeError::InvalidCatalog(format!(
                    "puzzle {} grants more than one item",
                    grant.puzzle
                )));
            }
        }

        let rooms = self
            .rooms
            .into_iter()
            .map(|seed| {
                let connections: Vec<&str> = seed.connections.iter().map(String::as_str).collect();
                Room::new(&seed.id, &seed.name, seed.x, seed.y).connected_to(&connections)
            })
            .collect();

        Ok(LoadedContent {
            catalog: PuzzleCatalog::new(puzzles, self.items, grants)?,
            rooms: RoomGraph::new(rooms)?,
        })
    }

    fn from_content(catalog: &PuzzleCatalog, rooms: &RoomGraph) -> Self {
        Self {
            puzzles: catalog.puzzles().iter().map(PuzzleSeed::from_puzzle).collect(),
            items: catalog.items().cloned().collect(),
            grants: catalog
                .item_grants()
                .iter()
                .map(|(puzzle, item)| GrantSeed {
                    puzzle: *puzzle,
                    item: item.clone(),
                })
                .collect(),
            rooms: rooms
                .rooms()
                .iter()
                .map(|room| RoomSeed {
                    id: room.id.clone(),
                    name: room.name.clone(),
                    x: room.x,
                    y: room.y,
                    connections: room.connections.iter().cloned().collect(),
                })
                .collect(),
        }
    }
}

impl PuzzleSeed {
    fn into_puzzle(self) -> Result<Puzzle, EscapeError> {
        let kind = match (self.kind.to_ascii_lowercase().as_str(), self.terminal) {
            ("code", _) => PuzzleKind::Code,
            ("sequence", _) => PuzzleKind::Sequence,
            ("order", _) => PuzzleKind::Order,
            ("switches", _) => PuzzleKind::Switches,
            ("terminal", Some(script)) => PuzzleKind::Terminal(script),
            ("terminal", None) => {
                return Err(EscapeError::InvalidCatalog(format!(
                    "terminal puzzle {} has no terminal script",
                    self.id
                )))
            }
            (other, _) => {
                return Err(EscapeError::InvalidCatalog(format!(
                    "puzzle {} has unknown type '{}'",
                    self.id, other
                )))
            }
        };

        let mut puzzle = Puzzle::new(self.id, &self.title, kind, &self.solution)
            .with_description(&self.description)
            .with_hint(&self.hint);
        if let Some(item) = self.required_item {
            puzzle = puzzle.requiring(&item);
        }
        if let Some(image) = self.image {
            puzzle = puzzle.with_image(&image);
        }
        Ok(puzzle)
    }

    fn from_puzzle(puzzle: &Puzzle) -> Self {
        Self {
            id: puzzle.id,
            title: puzzle.title.clone(),
            description: puzzle.description.clone(),
            hint: puzzle.hint.clone(),
            kind: puzzle.kind.label().to_string(),
            solution: puzzle.solution.clone(),
            required_item: puzzle.required_item_id.clone(),
            image: puzzle.image.clone(),
            terminal: puzzle.kind.terminal_script().cloned(),
        }
    }
}

impl AchievementSeed {
    fn rule(&self) -> Result<AchievementRule, EscapeError> {
        let count = |value: Option<f64>| -> Result<u32, EscapeError> {
            match value {
                Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
                _ => Err(EscapeError::InvalidCatalog(format!(
                    "achievement '{}' needs a whole-number value",
                    self.id
                ))),
            }
        };
        let rule = match self.rule.as_str() {
            "first_puzzle_solved" => AchievementRule::FirstPuzzleSolved,
            "puzzles_solved" => AchievementRule::PuzzlesSolved {
                required: count(self.value)?,
            },
            "sessions_completed" => AchievementRule::SessionsCompleted {
                required: count(self.value)?,
            },
            "efficiency" => match self.value {
                Some(ratio) if (0.0..=1.0).contains(&ratio) => AchievementRule::Efficiency {
                    min_ratio: ratio as f32,
                },
                _ => {
                    return Err(EscapeError::InvalidCatalog(format!(
                        "achievement '{}' needs a ratio between 0 and 1",
                        self.id
                    )))
                }
            },
            "no_hints" => AchievementRule::NoHints,
            "completed_within" => AchievementRule::CompletedWithin {
                seconds: count(self.value)?,
            },
            "all_items_collected" => AchievementRule::AllItemsCollected,
            other => {
                return Err(EscapeError::InvalidCatalog(format!(
                    "achievement '{}' has unknown rule '{}'",
                    self.id, other
                )))
            }
        };
        Ok(rule)
    }

    fn from_record(record: &AchievementRecord) -> Self {
        let (rule, value) = match &record.rule {
            AchievementRule::FirstPuzzleSolved => ("first_puzzle_solved", None),
            AchievementRule::PuzzlesSolved { required } => ("puzzles_solved", Some(*required as f64)),
            AchievementRule::SessionsCompleted { required } => {
                ("sessions_completed", Some(*required as f64))
            }
            AchievementRule::Efficiency { min_ratio } => ("efficiency", Some(*min_ratio as f64)),
            AchievementRule::NoHints => ("no_hints", None),
            AchievementRule::CompletedWithin { seconds } => ("completed_within", Some(*seconds as f64)),
            AchievementRule::AllItemsCollected => ("all_items_collected", None),
        };
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            rule: rule.to_string(),
            value,
            hidden: record.hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::state::{seed_starter_achievements, starter_catalog, starter_room_graph};
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_file() {
        assert!(load_catalog_from_json("nonexistent.json").is_err());
        assert!(load_achievements_from_json("nonexistent.json").is_err());
    }

    #[test]
    fn starter_content_survives_file_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let catalog_path = dir.path().join("seeds/catalog.json");
        let catalog = starter_catalog().unwrap();
        let rooms = starter_room_graph().unwrap();
        write_catalog_json(&catalog_path, &catalog, &rooms).unwrap();

        let loaded = load_catalog_from_json(&catalog_path).unwrap();
        assert_eq!(loaded.catalog.puzzles(), catalog.puzzles());
        assert_eq!(loaded.catalog.item_grants(), catalog.item_grants());
        assert_eq!(loaded.rooms.rooms().len(), rooms.rooms().len());

        let ach_path = dir.path().join("seeds/achievements.json");
        write_achievements_json(&ach_path, &seed_starter_achievements()).unwrap();
        let achievements = load_achievements_from_json(&ach_path).unwrap();
        assert_eq!(achievements, seed_starter_achievements());
    }

    #[test]
    fn rejects_unknown_type_and_bad_references() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{"puzzles":[{"id":1,"title":"Dial","type":"dial","solution":"7"}]}"#,
        )
        .unwrap();
        let err = load_catalog_from_json(&path).unwrap_err();
        assert!(err.to_string().contains("unknown type"));

        fs::write(
            &path,
            r#"{"puzzles":[{"id":1,"title":"Box","type":"code","solution":"7","required_item":"key"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            load_catalog_from_json(&path),
            Err(EscapeError::InvalidCatalog(_))
        ));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_catalog_from_json(&path), Err(EscapeError::Io(_))));
    }

    #[test]
    fn achievement_rules_need_values() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("achievements.json");
        fs::write(
            &path,
            r#"[{"id":"a","title":"A","description":"d","rule":"puzzles_solved"}]"#,
        )
        .unwrap();
        assert!(load_achievements_from_json(&path).is_err());

        fs::write(
            &path,
            r#"[{"id":"a","title":"A","description":"d","rule":"efficiency","value":0.75,"hidden":true}]"#,
        )
        .unwrap();
        let loaded = load_achievements_from_json(&path).unwrap();
        assert_eq!(loaded[0].rule, AchievementRule::Efficiency { min_ratio: 0.75 });
        assert!(loaded[0].hidden);
    }
}
