//! Static geometry index
//!
//! Buildings, decorations and terrain zones loaded once per run. Obstacles
//! keep the id they were given at load time (buildings first, then
//! decorations, in data order) so "first obstacle" always means the same one.
//! Decorations leave the index when they break or get knocked loose; the
//! spatial grid is rebuilt when that happens.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::game::collision::{self, Aabb, OrientedRect, Separation, Shape};
use crate::game::constants::{terrain, vehicle};
use crate::game::spatial::{ObstacleGrid, ObstacleHits};
use crate::util::vec2::Vec2;

pub type ObstacleId = u32;

/// Errors raised while loading world data
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("{what} #{index} has invalid geometry: {reason}")]
    InvalidGeometry {
        what: &'static str,
        index: usize,
        reason: &'static str,
    },
    #[error("world data defines no vehicles")]
    NoVehicles,
    #[error("failed to parse world data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read world file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Serialized world description
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingDef {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecorationDef {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, alias = "collision")]
    pub collidable: bool,
    #[serde(default)]
    pub ragdoll: bool,
    #[serde(default)]
    pub breakable: bool,
    #[serde(default)]
    pub hits_to_break: u32,
}

/// Terrain surface type; anything unrecognised drives like plain road
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Grass,
    Sand,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneDef {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "type")]
    pub kind: ZoneKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpawn {
    pub x: f32,
    pub y: f32,
    /// Heading in radians
    #[serde(default)]
    pub angle: f32,
}

/// Everything needed to build a [`World`] plus the initial vehicle props
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    pub buildings: Vec<BuildingDef>,
    #[serde(default)]
    pub decorations: Vec<DecorationDef>,
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
    pub vehicles: Vec<VehicleSpawn>,
}

impl WorldData {
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check geometry before anything is built from it
    pub fn validate(&self) -> Result<(), WorldError> {
        let rect_ok = |x: f32, y: f32, w: f32, h: f32| Aabb::from_xywh(x, y, w, h).is_valid();

        for (index, b) in self.buildings.iter().enumerate() {
            if !rect_ok(b.x, b.y, b.width, b.height) {
                return Err(WorldError::InvalidGeometry {
                    what: "building",
                    index,
                    reason: "rectangle must be finite with positive size",
                });
            }
        }
        for (index, d) in self.decorations.iter().enumerate() {
            if !rect_ok(d.x, d.y, d.width, d.height) {
                return Err(WorldError::InvalidGeometry {
                    what: "decoration",
                    index,
                    reason: "rectangle must be finite with positive size",
                });
            }
            if d.breakable && d.hits_to_break == 0 {
                return Err(WorldError::InvalidGeometry {
                    what: "decoration",
                    index,
                    reason: "breakable decoration needs hitsToBreak >= 1",
                });
            }
        }
        for (index, z) in self.zones.iter().enumerate() {
            if !rect_ok(z.x, z.y, z.width, z.height) {
                return Err(WorldError::InvalidGeometry {
                    what: "zone",
                    index,
                    reason: "rectangle must be finite with positive size",
                });
            }
        }
        if self.vehicles.is_empty() {
            return Err(WorldError::NoVehicles);
        }
        for (index, v) in self.vehicles.iter().enumerate() {
            if !(v.x.is_finite() && v.y.is_finite() && v.angle.is_finite()) {
                return Err(WorldError::InvalidGeometry {
                    what: "vehicle",
                    index,
                    reason: "position and angle must be finite",
                });
            }
        }
        Ok(())
    }

    /// Built-in city block: perimeter fence, downtown buildings, a handful
    /// of props and three parked cars
    pub fn city() -> Self {
        let b = |x: f32, y: f32, width: f32, height: f32| BuildingDef {
            x,
            y,
            width,
            height,
        };
        let buildings = vec![
            // Perimeter fence
            b(-4000.0, -2700.0, 7000.0, 300.0),
            b(-4000.0, -2700.0, 300.0, 6000.0),
            b(3000.0, -2700.0, 300.0, 6000.0),
            b(-4000.0, 3300.0, 7000.0, 300.0),
            // North-east block
            b(800.0, -1800.0, 260.0, 700.0),
            b(1060.0, -1800.0, 600.0, 300.0),
            b(1660.0, -1800.0, 240.0, 1400.0),
            b(-100.0, -440.0, 2000.0, 240.0),
            b(1000.0, -800.0, 100.0, 100.0),
            // West blocks
            b(-2130.0, -1320.0, 240.0, 920.0),
            b(-2700.0, -620.0, 570.0, 220.0),
            b(-3280.0, -680.0, 300.0, 1360.0),
            b(-3280.0, -2240.0, 300.0, 1300.0),
            b(-2980.0, -2240.0, 920.0, 240.0),
            b(-2360.0, -2000.0, 300.0, 300.0),
            b(-2740.0, -960.0, 200.0, 200.0),
            b(-2520.0, 40.0, 380.0, 380.0),
            // Downtown
            b(-1560.0, -1220.0, 340.0, 340.0),
            b(-940.0, -240.0, 240.0, 260.0),
            b(-1700.0, -440.0, 1000.0, 200.0),
            b(-1700.0, -240.0, 240.0, 260.0),
            b(-940.0, 380.0, 240.0, 260.0),
            b(-1700.0, 640.0, 1000.0, 200.0),
            b(-1700.0, 380.0, 240.0, 260.0),
            b(-330.0, 80.0, 320.0, 320.0),
            b(400.0, 140.0, 1200.0, 200.0),
            b(-1360.0, 1400.0, 340.0, 340.0),
            b(-760.0, 1120.0, 200.0, 200.0),
            b(720.0, 1200.0, 160.0, 160.0),
            b(0.0, 700.0, 1500.0, 200.0),
            b(1300.0, 900.0, 200.0, 900.0),
            b(-500.0, 1600.0, 1800.0, 200.0),
        ];

        let d = |x: f32,
                 y: f32,
                 width: f32,
                 height: f32,
                 collidable: bool,
                 ragdoll: bool,
                 breakable: bool,
                 hits_to_break: u32| {
            DecorationDef {
                x,
                y,
                width,
                height,
                collidable,
                ragdoll,
                breakable,
                hits_to_break,
            }
        };
        let decorations = vec![
            // Heavy props that get shoved around
            d(50.0, -200.0, 60.0, 60.0, true, true, false, 0),
            d(200.0, 500.0, 80.0, 40.0, true, true, false, 0),
            // Breakables
            d(400.0, 380.0, 40.0, 40.0, true, true, true, 3),
            d(600.0, 370.0, 30.0, 60.0, true, true, true, 2),
            // Trees and kiosks
            d(800.0, 380.0, 36.0, 36.0, true, false, false, 0),
            d(1100.0, 380.0, 60.0, 40.0, true, false, false, 0),
            // Ground decals
            d(1140.0, -100.0, 140.0, 100.0, false, false, false, 0),
            d(1200.0, 420.0, 100.0, 100.0, false, false, false, 0),
            d(440.0, 420.0, 100.0, 100.0, false, false, false, 0),
        ];

        let z = |x: f32, y: f32, width: f32, height: f32, kind: ZoneKind| ZoneDef {
            x,
            y,
            width,
            height,
            kind,
        };
        let zones = vec![
            z(-680.0, 100.0, 300.0, 200.0, ZoneKind::Grass),
            z(-680.0, 900.0, 400.0, 400.0, ZoneKind::Grass),
            z(-1800.0, 500.0, 800.0, 1100.0, ZoneKind::Grass),
            z(200.0, 200.0, 200.0, 100.0, ZoneKind::Sand),
        ];

        let vehicles = vec![
            VehicleSpawn {
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            },
            VehicleSpawn {
                x: 300.0,
                y: -100.0,
                angle: std::f32::consts::FRAC_PI_2,
            },
            VehicleSpawn {
                x: -1200.0,
                y: 1100.0,
                angle: 0.0,
            },
        ];

        Self {
            buildings,
            decorations,
            zones,
            vehicles,
        }
    }
}

// ============================================================================
// Runtime index
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Building,
    Decoration,
}

/// How a vehicle reacts when it runs into an obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// Bounce off it
    Solid,
    /// Counts down hits, then breaks into transient debris
    Breakable,
    /// Knocked loose into persistent debris on first contact
    Loose,
    /// Decal; nothing collides with it
    Passable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub rect: Aabb,
    pub kind: ObstacleKind,
    pub collidable: bool,
    pub breakable: bool,
    pub ragdoll: bool,
    /// Remaining hits for breakables (0 otherwise)
    pub hits_to_break: u32,
    /// Tick of the last counted vehicle hit (breakables only)
    pub last_hit_tick: Option<u64>,
}

impl Obstacle {
    pub fn contact_kind(&self) -> ContactKind {
        match self.kind {
            ObstacleKind::Building => ContactKind::Solid,
            ObstacleKind::Decoration if !self.collidable => ContactKind::Passable,
            ObstacleKind::Decoration if self.breakable => ContactKind::Breakable,
            ObstacleKind::Decoration if self.ragdoll => ContactKind::Loose,
            ObstacleKind::Decoration => ContactKind::Solid,
        }
    }

    /// Blocks circles (agents, the on-foot player, debris)
    #[inline]
    pub fn blocks_movement(&self) -> bool {
        self.kind == ObstacleKind::Building || self.collidable
    }

    /// Only buildings are tall enough to hide a target
    #[inline]
    pub fn blocks_sight(&self) -> bool {
        self.kind == ObstacleKind::Building
    }

    #[inline]
    pub fn collider(&self) -> Shape {
        Shape::Aabb(self.rect)
    }
}

/// Friction and lateral grip of the ground under a vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub friction: f32,
    pub grip: f32,
}

impl Surface {
    /// Surface for a zone, falling back to the vehicle's own friction
    pub fn for_zone(kind: Option<ZoneKind>, base_friction: f32) -> Self {
        match kind {
            Some(ZoneKind::Grass) => Self {
                friction: terrain::GRASS_FRICTION,
                grip: terrain::GRASS_GRIP,
            },
            Some(ZoneKind::Sand) => Self {
                friction: terrain::SAND_FRICTION,
                grip: terrain::SAND_GRIP,
            },
            Some(ZoneKind::Unknown) | None => Self {
                friction: base_friction,
                grip: vehicle::BASE_GRIP,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub rect: Aabb,
    pub kind: ZoneKind,
}

/// Static geometry index
#[derive(Debug, Clone)]
pub struct World {
    /// Sorted by id
    obstacles: Vec<Obstacle>,
    zones: Vec<Zone>,
    grid: ObstacleGrid,
}

impl World {
    pub fn from_data(data: &WorldData) -> Result<Self, WorldError> {
        data.validate()?;

        let buildings = data.buildings.iter().map(|b| Obstacle {
            id: 0,
            rect: Aabb::from_xywh(b.x, b.y, b.width, b.height),
            kind: ObstacleKind::Building,
            collidable: true,
            breakable: false,
            ragdoll: false,
            hits_to_break: 0,
            last_hit_tick: None,
        });
        let decorations = data.decorations.iter().map(|d| Obstacle {
            id: 0,
            rect: Aabb::from_xywh(d.x, d.y, d.width, d.height),
            kind: ObstacleKind::Decoration,
            collidable: d.collidable,
            breakable: d.breakable,
            ragdoll: d.ragdoll,
            hits_to_break: if d.breakable { d.hits_to_break } else { 0 },
            last_hit_tick: None,
        });

        let obstacles: Vec<Obstacle> = buildings
            .chain(decorations)
            .enumerate()
            .map(|(i, mut o)| {
                o.id = i as ObstacleId;
                o
            })
            .collect();

        let zones = data
            .zones
            .iter()
            .map(|z| Zone {
                rect: Aabb::from_xywh(z.x, z.y, z.width, z.height),
                kind: z.kind,
            })
            .collect();

        let mut world = Self {
            obstacles,
            zones,
            grid: ObstacleGrid::default(),
        };
        world.rebuild_grid();

        debug!(
            obstacles = world.obstacles.len(),
            zones = world.zones.len(),
            cells = world.grid.cell_count(),
            "World index built"
        );
        Ok(world)
    }

    fn rebuild_grid(&mut self) {
        self.grid
            .rebuild(self.obstacles.iter().map(|o| (o.id, &o.rect)));
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles
            .binary_search_by_key(&id, |o| o.id)
            .ok()
            .map(|i| &self.obstacles[i])
    }

    pub fn obstacle_mut(&mut self, id: ObstacleId) -> Option<&mut Obstacle> {
        match self.obstacles.binary_search_by_key(&id, |o| o.id) {
            Ok(i) => Some(&mut self.obstacles[i]),
            Err(_) => None,
        }
    }

    /// Take an obstacle out of the index for good
    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let index = self.obstacles.binary_search_by_key(&id, |o| o.id).ok()?;
        let removed = self.obstacles.remove(index);
        self.rebuild_grid();
        Some(removed)
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// First zone (in data order) strictly containing `p`
    pub fn zone_at(&self, p: Vec2) -> Option<&Zone> {
        self.zones.iter().find(|z| z.rect.contains_strict(p))
    }

    pub fn surface_at(&self, p: Vec2, base_friction: f32) -> Surface {
        Surface::for_zone(self.zone_at(p).map(|z| z.kind), base_friction)
    }

    /// Obstacles whose grid cells touch `area`, in id order
    pub fn candidates(&self, area: &Aabb) -> impl Iterator<Item = &Obstacle> {
        let hits: ObstacleHits = self.grid.query(area);
        hits.into_iter().filter_map(move |id| self.obstacle(id))
    }

    /// Does `shape` overlap anything that blocks movement?
    pub fn blocked(&self, shape: &Shape) -> bool {
        self.candidates(&shape.bounds())
            .any(|o| o.blocks_movement() && collision::overlaps(shape, &o.collider()))
    }

    #[inline]
    pub fn circle_blocked(&self, center: Vec2, radius: f32) -> bool {
        self.blocked(&Shape::circle(center, radius))
    }

    /// Deepest blocking overlap for `shape`; ties keep the lower id
    pub fn deepest_contact(&self, shape: &Shape) -> Option<(ObstacleId, Separation)> {
        self.candidates(&shape.bounds())
            .filter(|o| o.blocks_movement())
            .filter_map(|o| collision::separation(shape, &o.collider()).map(|s| (o.id, s)))
            .fold(None, |best, (id, sep)| match best {
                Some((_, b)) if b.depth >= sep.depth => best,
                _ => Some((id, sep)),
            })
    }

    /// First non-passable obstacle (lowest id) overlapping a rotated rect
    pub fn first_oriented_contact(&self, rect: &OrientedRect) -> Option<&Obstacle> {
        let body = Shape::Oriented(*rect);
        self.candidates(&body.bounds()).find(|o| {
            o.contact_kind() != ContactKind::Passable && collision::overlaps(&body, &o.collider())
        })
    }

    /// Unobstructed sight line between two points (buildings only)
    pub fn line_of_sight(&self, a: Vec2, b: Vec2) -> bool {
        let area = Aabb::new(
            Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        );
        let blockers: ObstacleHits = self.grid.query(&area);
        collision::has_line_of_sight(
            a,
            b,
            blockers
                .iter()
                .filter_map(|&id| self.obstacle(id))
                .filter(|o| o.blocks_sight())
                .map(|o| &o.rect),
        )
    }
}
