//! Sparse per-session block cache.
//!
//! Holds the Java block states the session has seen, in 16³ palettized
//! sections. Sections that were never written read as air.

use std::collections::HashMap;

use glam::IVec3;

use crate::block_registry::{BlockId, AIR};

/// Read access to world blocks.
pub trait BlockView {
    fn block_at(&self, pos: IVec3) -> BlockId;
}

/// A 16x16x16 section with a single storage layer.
#[derive(Debug, Clone)]
struct SubChunk {
    /// Palette indices in XZY order: `(x*16 + z)*16 + y`.
    blocks: Box<[u16; 4096]>,
    palette: Vec<BlockId>,
}

impl SubChunk {
    /// A section filled with one block.
    fn new_single(block: BlockId) -> Self {
        Self {
            blocks: Box::new([0; 4096]),
            palette: vec![block],
        }
    }

    fn index(x: usize, y: usize, z: usize) -> usize {
        (x * 16 + z) * 16 + y
    }

    /// `x`, `y`, `z` must each be in `[0, 15]`.
    fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId) {
        debug_assert!(x < 16 && y < 16 && z < 16);
        let palette_index = match self.palette.iter().position(|&id| id == block) {
            Some(idx) => idx,
            None => {
                self.palette.push(block);
                self.palette.len() - 1
            }
        };
        self.blocks[Self::index(x, y, z)] = palette_index as u16;
    }

    fn get_block(&self, x: usize, y: usize, z: usize) -> BlockId {
        let palette_index = self.blocks[Self::index(x, y, z)] as usize;
        self.palette.get(palette_index).copied().unwrap_or(AIR)
    }
}

/// Sections keyed by section coordinate (`block >> 4` on every axis).
#[derive(Debug, Default)]
pub struct ChunkCache {
    sections: HashMap<IVec3, SubChunk>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from `(position, block)` pairs.
    #[cfg(test)]
    pub fn from_blocks(blocks: impl IntoIterator<Item = (IVec3, BlockId)>) -> Self {
        let mut cache = Self::new();
        for (pos, block) in blocks {
            cache.set_block(pos, block);
        }
        cache
    }

    /// Forget everything, e.g. on dimension change.
    pub fn clear(&mut self) {
        self.sections.clear();
    }

    fn split(pos: IVec3) -> (IVec3, usize, usize, usize) {
        let section = pos >> 4;
        let local = pos & 15;
        (section, local.x as usize, local.y as usize, local.z as usize)
    }
}

impl BlockView for ChunkCache {
    fn block_at(&self, pos: IVec3) -> BlockId {
        let (section, x, y, z) = Self::split(pos);
        self.sections
            .get(&section)
            .map_or(AIR, |sub| sub.get_block(x, y, z))
    }
}

impl ChunkCache {
    pub fn set_block(&mut self, pos: IVec3, block: BlockId) {
        let (section, x, y, z) = Self::split(pos);
        match self.sections.get_mut(&section) {
            Some(sub) => sub.set_block(x, y, z, block),
            None if block == AIR => {}
            None => {
                let mut sub = SubChunk::new_single(AIR);
                sub.set_block(x, y, z, block);
                self.sections.insert(section, sub);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_block_subchunk() {
        let sub = SubChunk::new_single(7);
        assert_eq!(sub.get_block(0, 0, 0), 7);
        assert_eq!(sub.get_block(15, 15, 15), 7);
    }

    #[test]
    fn palette_growth() {
        let mut sub = SubChunk::new_single(AIR);
        sub.set_block(1, 2, 3, 5);
        sub.set_block(4, 5, 6, 5);
        sub.set_block(0, 0, 1, 9);
        assert_eq!(sub.palette.len(), 3);
        assert_eq!(sub.get_block(1, 2, 3), 5);
        assert_eq!(sub.get_block(0, 0, 1), 9);
        assert_eq!(sub.get_block(0, 0, 0), AIR);
    }

    #[test]
    fn negative_coordinates() {
        let mut cache = ChunkCache::new();
        cache.set_block(IVec3::new(-1, -64, -17), 3);
        assert_eq!(cache.block_at(IVec3::new(-1, -64, -17)), 3);
        assert_eq!(cache.block_at(IVec3::new(-1, -63, -17)), AIR);
        assert_eq!(cache.block_at(IVec3::new(15, -64, 15)), AIR);
    }

    #[test]
    fn unloaded_reads_air_and_air_writes_allocate_nothing() {
        let mut cache = ChunkCache::new();
        assert_eq!(cache.block_at(IVec3::new(100, 5, 100)), AIR);
        cache.set_block(IVec3::new(100, 5, 100), AIR);
        assert!(cache.sections.is_empty());
    }

    #[test]
    fn from_blocks_and_clear() {
        let mut cache = ChunkCache::from_blocks([(IVec3::ZERO, 1), (IVec3::new(0, 1, 0), 2)]);
        assert_eq!(cache.block_at(IVec3::new(0, 1, 0)), 2);
        cache.clear();
        assert_eq!(cache.block_at(IVec3::ZERO), AIR);
    }
}
