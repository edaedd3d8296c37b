//! Per-client session: owns the world cache, the player and the piston
//! simulation, and applies events and ticks in one ordered stream.

mod block_event;
mod movement;

use std::sync::Arc;
use std::time::Duration;

use bridge_world::block_registry::{BlockId, BlockRegistry, PistonClassifier};
use bridge_world::chunk::ChunkCache;
use bridge_world::geometry::Direction;
use bridge_world::physics::PlayerPhysics;
use bridge_world::piston::{
    BlockData, ClientUpdate, PistonAction, PistonArm, PistonCache, PistonEnv,
};
use glam::{DVec3, IVec3};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::EventSource;
use crate::emit::{PacketEmitter, SessionError};

/// Everything that reaches a session from the source server or the client.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Source server block event on a piston.
    PistonBlockEvent {
        position: IVec3,
        action: PistonAction,
        facing: Direction,
    },
    /// A server plugin reporting a move with the blocks it takes along.
    PluginPistonEvent {
        position: IVec3,
        extending: bool,
        sticky: bool,
        blocks: Vec<IVec3>,
    },
    BlockUpdate {
        position: IVec3,
        block: BlockId,
    },
    /// Client movement, as eye position.
    ClientMove {
        eye: DVec3,
        on_ground: bool,
        pitch: f32,
        yaw: f32,
        head_yaw: f32,
    },
    DimensionChange,
}

pub struct Session {
    registry: Arc<BlockRegistry>,
    world: ChunkCache,
    player: PlayerPhysics,
    pistons: PistonCache,
    outbox: Vec<ClientUpdate>,
    emitter: PacketEmitter,
    event_source: EventSource,
}

impl Session {
    pub fn new(
        registry: Arc<BlockRegistry>,
        emitter: PacketEmitter,
        player: PlayerPhysics,
        event_source: EventSource,
    ) -> Self {
        Self {
            registry,
            world: ChunkCache::new(),
            player,
            pistons: PistonCache::new(),
            outbox: Vec::new(),
            emitter,
            event_source,
        }
    }

    /// Apply one event and send whatever it produced.
    pub fn handle(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        match event {
            SessionEvent::PistonBlockEvent {
                position,
                action,
                facing,
            } => self.on_piston_block_event(position, action, facing),
            SessionEvent::PluginPistonEvent {
                position,
                extending,
                sticky,
                blocks,
            } => self.on_plugin_piston_event(position, extending, sticky, &blocks),
            SessionEvent::BlockUpdate { position, block } => self.on_block_update(position, block),
            SessionEvent::ClientMove {
                eye,
                on_ground,
                pitch,
                yaw,
                head_yaw,
            } => {
                self.player.pitch = pitch;
                self.player.yaw = yaw;
                self.player.head_yaw = head_yaw;
                self.on_client_move(eye, on_ground)?;
            }
            SessionEvent::DimensionChange => {
                debug!(pistons = self.pistons.len(), "dimension change");
                self.pistons.clear();
                self.world.clear();
            }
        }
        self.flush()
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> Result<(), SessionError> {
        let (pistons, mut env) = self.piston_env();
        pistons.tick(&mut env);
        self.flush()
    }

    /// The piston cache alongside everything its updates touch.
    fn piston_env(&mut self) -> (&mut PistonCache, PistonEnv<'_>) {
        let env = PistonEnv {
            world: &mut self.world,
            data: BlockData::from_registry(&self.registry),
            player: &mut self.player,
            out: &mut self.outbox,
        };
        (&mut self.pistons, env)
    }

    fn on_block_update(&mut self, position: IVec3, block: BlockId) {
        self.world.set_block(position, block);
        // The client animates heads itself; the server's moving piston only flickers.
        let moving_piston = self
            .registry
            .get(block)
            .is_some_and(|info| info.base_name() == "minecraft:moving_piston");
        if moving_piston {
            return;
        }
        self.outbox.push(ClientUpdate::Block { position, block });

        // A base the simulation is not driving still needs its arm described.
        if let Some(base) = self.registry.piston(block) {
            if self.pistons.piston(position).is_none() {
                let arm = PistonArm::resting(position, base.extended, base.sticky);
                self.outbox.push(ClientUpdate::PistonArmData(arm));
            }
        }
    }

    fn flush(&mut self) -> Result<(), SessionError> {
        for update in self.outbox.drain(..) {
            self.emitter.emit(&update, &self.player)?;
        }
        Ok(())
    }

    /// Run until the event queue closes or the client goes away.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        tick_interval: Duration,
    ) -> Result<(), SessionError> {
        info!(player = self.player.runtime_id, "session opened");
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                biased;
                event = events.recv() => {
                    let Some(event) = event else {
                        break Ok(());
                    };
                    if let Err(e) = self.handle(event) {
                        break Err(e);
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick() {
                        break Err(e);
                    }
                }
            }
        };

        self.pistons.clear();
        info!(player = self.player.runtime_id, "session closed");
        result
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use bytes::Bytes;

    use crate::mappings::BlockMappings;

    pub struct Harness {
        pub session: Session,
        pub rx: mpsc::UnboundedReceiver<Bytes>,
    }

    impl Harness {
        pub fn new(event_source: EventSource) -> Self {
            let registry = Arc::new(BlockRegistry::vanilla());
            let mappings = Arc::new(BlockMappings::new(&registry));
            let (tx, rx) = mpsc::unbounded_channel();
            let player = PlayerPhysics::at_feet(1, DVec3::new(100.5, 64.0, 100.5));
            let session = Session::new(
                registry,
                PacketEmitter::new(mappings, tx),
                player,
                event_source,
            );
            Self { session, rx }
        }

        pub fn id(&self, name: &str) -> BlockId {
            self.session.registry.id_of(name).unwrap()
        }

        pub fn piston(&self, facing: Direction, sticky: bool, extended: bool) -> BlockId {
            self.session
                .registry
                .piston_base(facing, sticky, extended)
                .unwrap()
        }

        pub fn set(&mut self, position: IVec3, block: BlockId) {
            self.session.world.set_block(position, block);
        }

        /// Number of packets sent since the last call.
        pub fn drain(&mut self) -> usize {
            let mut count = 0;
            while self.rx.try_recv().is_ok() {
                count += 1;
            }
            count
        }
    }
}
