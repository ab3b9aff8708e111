// Wire protocol DTOs and conversions for public game server messages.

use crate::domain::{Arena, CraftId, CraftSnapshot, Intent, ProjectileSnapshot};
use crate::use_cases::WorldUpdate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned craft id, sent once right after connecting.
    Identity { craft_id: String },
    // Arena geometry, sent once right after the identity.
    ArenaInfo(ArenaDto),
    // Snapshot of every craft and projectile for a given tick.
    WorldUpdate(WorldUpdateDto),
    // Sent to the owner only, once, when its craft is destroyed.
    Destroyed { craft_id: String },
}

impl ServerMessage {
    pub fn identity(craft_id: CraftId) -> Self {
        Self::Identity {
            craft_id: craft_id.to_string(),
        }
    }

    pub fn destroyed(craft_id: CraftId) -> Self {
        Self::Destroyed {
            craft_id: craft_id.to_string(),
        }
    }
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    Input(IntentDto),
}

/// Control flags; missing flags count as released.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntentDto {
    #[serde(default)]
    pub turn_left: bool,
    #[serde(default)]
    pub turn_right: bool,
    #[serde(default)]
    pub accelerate: bool,
    #[serde(default)]
    pub decelerate: bool,
    #[serde(default)]
    pub shoot: bool,
}

/// Bare camel-case movement object sent by older browser clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LegacyIntentDto {
    #[serde(default)]
    pub turn_left: bool,
    #[serde(default)]
    pub turn_right: bool,
    #[serde(default)]
    pub accelerate: bool,
    #[serde(default)]
    pub decelerate: bool,
    #[serde(default)]
    pub shoot: bool,
}

impl From<IntentDto> for Intent {
    fn from(input: IntentDto) -> Self {
        Self {
            turn_left: input.turn_left,
            turn_right: input.turn_right,
            accelerate: input.accelerate,
            decelerate: input.decelerate,
            shoot: input.shoot,
        }
    }
}

impl From<LegacyIntentDto> for Intent {
    fn from(input: LegacyIntentDto) -> Self {
        Self {
            turn_left: input.turn_left,
            turn_right: input.turn_right,
            accelerate: input.accelerate,
            decelerate: input.decelerate,
            shoot: input.shoot,
        }
    }
}

/// Parses either message shape into an intent.
pub fn parse_intent(text: &str) -> Result<Intent, serde_json::Error> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Input(input)) => Ok(input.into()),
        Err(err) => serde_json::from_str::<LegacyIntentDto>(text)
            .map(Intent::from)
            // Report the structured-format error; it is the documented one.
            .map_err(|_| err),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointDto {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArenaDto {
    pub center: PointDto,
    pub radius: f64,
}

impl From<&Arena> for ArenaDto {
    fn from(arena: &Arena) -> Self {
        Self {
            center: PointDto {
                x: arena.center_x,
                y: arena.center_y,
            },
            radius: arena.radius,
        }
    }
}

/// Snapshot of the world sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    // Keyed by craft id.
    pub crafts: BTreeMap<String, CraftStateDto>,
    pub projectiles: Vec<ProjectileStateDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            crafts: update
                .crafts
                .iter()
                .map(|c| (c.id.to_string(), CraftStateDto::from(c)))
                .collect(),
            projectiles: update
                .projectiles
                .iter()
                .map(ProjectileStateDto::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CraftStateDto {
    pub x: f64,
    pub y: f64,
    pub vel: f64,
    pub rot: f64,
}

impl From<&CraftSnapshot> for CraftStateDto {
    fn from(craft: &CraftSnapshot) -> Self {
        Self {
            x: craft.x,
            y: craft.y,
            vel: craft.vel,
            rot: craft.rot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileStateDto {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub vel: f64,
    pub rot: f64,
}

impl From<&ProjectileSnapshot> for ProjectileStateDto {
    fn from(projectile: &ProjectileSnapshot) -> Self {
        Self {
            id: projectile.id.to_string(),
            x: projectile.x,
            y: projectile.y,
            vel: projectile.vel,
            rot: projectile.rot,
        }
    }
}
