//! Operator console: one session event per line.
//!
//! ```text
//! block <x> <y> <z> <state>
//! piston <x> <y> <z> <push|pull|cancel> <facing>
//! plugin <x> <y> <z> <extend|retract> <sticky> [x,y,z ...]
//! move <x> <y> <z> [air]
//! dimension
//! ```

use bridge_world::block_registry::BlockRegistry;
use bridge_world::geometry::Direction;
use bridge_world::physics::PlayerPhysics;
use bridge_world::piston::PistonAction;
use glam::{DVec3, IVec3};
use thiserror::Error;

use crate::session::SessionEvent;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("not a number: {0}")]
    BadNumber(String),

    #[error("unknown block state: {0}")]
    UnknownBlock(String),

    #[error("unknown {what}: {value}")]
    BadValue { what: &'static str, value: String },
}

/// Parse a console line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str, registry: &BlockRegistry) -> Result<Option<SessionEvent>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut args = line.split_whitespace();
    let command = args.next().unwrap_or_default();

    let event = match command {
        "block" => {
            let position = block_pos(&mut args)?;
            let state = args.next().ok_or(CommandError::Missing("block state"))?;
            let block = registry
                .id_of(state)
                .ok_or_else(|| CommandError::UnknownBlock(state.to_string()))?;
            SessionEvent::BlockUpdate { position, block }
        }
        "piston" => {
            let position = block_pos(&mut args)?;
            let action = match args.next().ok_or(CommandError::Missing("action"))? {
                "push" => PistonAction::Pushing,
                "pull" => PistonAction::Pulling,
                "cancel" => PistonAction::CancelledMidPush,
                other => return Err(bad_value("action", other)),
            };
            let facing = facing(&mut args)?;
            SessionEvent::PistonBlockEvent {
                position,
                action,
                facing,
            }
        }
        "plugin" => {
            let position = block_pos(&mut args)?;
            let extending = match args.next().ok_or(CommandError::Missing("direction"))? {
                "extend" => true,
                "retract" => false,
                other => return Err(bad_value("direction", other)),
            };
            let sticky = match args.next().ok_or(CommandError::Missing("sticky flag"))? {
                "true" => true,
                "false" => false,
                other => return Err(bad_value("sticky flag", other)),
            };
            let blocks = args.map(packed_pos).collect::<Result<_, _>>()?;
            SessionEvent::PluginPistonEvent {
                position,
                extending,
                sticky,
                blocks,
            }
        }
        "move" => {
            let feet = DVec3::new(
                number(args.next(), "x")?,
                number(args.next(), "y")?,
                number(args.next(), "z")?,
            );
            let on_ground = args.next() != Some("air");
            SessionEvent::ClientMove {
                eye: PlayerPhysics::eye_from_feet(feet),
                on_ground,
                pitch: 0.0,
                yaw: 0.0,
                head_yaw: 0.0,
            }
        }
        "dimension" => SessionEvent::DimensionChange,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(event))
}

fn bad_value(what: &'static str, value: &str) -> CommandError {
    CommandError::BadValue {
        what,
        value: value.to_string(),
    }
}

fn number<T: std::str::FromStr>(arg: Option<&str>, name: &'static str) -> Result<T, CommandError> {
    let arg = arg.ok_or(CommandError::Missing(name))?;
    arg.parse()
        .map_err(|_| CommandError::BadNumber(arg.to_string()))
}

fn block_pos<'a>(args: &mut impl Iterator<Item = &'a str>) -> Result<IVec3, CommandError> {
    Ok(IVec3::new(
        number(args.next(), "x")?,
        number(args.next(), "y")?,
        number(args.next(), "z")?,
    ))
}

/// `x,y,z`
fn packed_pos(arg: &str) -> Result<IVec3, CommandError> {
    let mut parts = arg.split(',');
    let pos = block_pos(&mut parts)?;
    if parts.next().is_some() {
        return Err(bad_value("position", arg));
    }
    Ok(pos)
}

fn facing<'a>(args: &mut impl Iterator<Item = &'a str>) -> Result<Direction, CommandError> {
    let name = args.next().ok_or(CommandError::Missing("facing"))?;
    Direction::from_name(name).ok_or_else(|| bad_value("facing", name))
}
