//! Room adjacency for the map view.
//!
//! Advisory only: room entry never gates puzzle availability. Connections are
//! undirected, so a link declared on either side counts for both.

use std::collections::{BTreeMap, BTreeSet};

use crate::escape::errors::EscapeError;
use crate::escape::types::{Room, RoomId};
use crate::validation::validate_rooms;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomGraph {
    rooms: Vec<Room>,
    adjacency: BTreeMap<RoomId, BTreeSet<RoomId>>,
}

impl RoomGraph {
    pub fn new(rooms: Vec<Room>) -> Result<Self, EscapeError> {
        validate_rooms(&rooms).map_err(EscapeError::InvalidCatalog)?;
        let mut adjacency: BTreeMap<RoomId, BTreeSet<RoomId>> = rooms
            .iter()
            .map(|r| (r.id.clone(), BTreeSet::new()))
            .collect();
        for room in &rooms {
            for target in &room.connections {
                adjacency
                    .entry(room.id.clone())
                    .or_default()
                    .insert(target.clone());
                adjacency
                    .entry(target.clone())
                    .or_default()
                    .insert(room.id.clone());
            }
        }
        Ok(Self { rooms, adjacency })
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    /// Neighbours of `room_id` in id order; empty for unknown rooms.
    pub fn neighbors(&self, room_id: &str) -> Vec<&Room> {
        self.adjacency
            .get(room_id)
            .map(|ids| ids.iter().filter_map(|id| self.room(id)).collect())
            .unwrap_or_default()
    }

    pub fn is_connected(&self, a: &str, b: &str) -> bool {
        self.adjacency
            .get(a)
            .map(|ids| ids.contains(b))
            .unwrap_or(false)
    }
}

/// One line per room: `name (x%,y%) -> neighbour, neighbour`
pub fn format_room_map(graph: &RoomGraph) -> String {
    let mut out = String::new();
    for room in graph.rooms() {
        let names: Vec<&str> = graph
            .neighbors(&room.id)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        out.push_str(&format!(
            "{} ({:.0}%,{:.0}%) -> {}\n",
            room.name,
            room.x,
            room.y,
            if names.is_empty() {
                "-".to_string()
            } else {
                names.join(", ")
            }
        ));
    }
    out
}
