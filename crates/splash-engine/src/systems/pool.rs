//! Fixed-capacity particle pool.
//!
//! Slots live in a contiguous arena. Available slots sit on a free list and
//! active slots are tracked in a dense list, so acquire and release are O(1)
//! and iteration only touches live particles. Releasing a slot bumps its
//! generation, which invalidates every handle issued for the previous occupant.

use crate::components::particle::{Particle, ParticleSpawn};

/// Generational reference to a pooled particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleHandle {
    index: u32,
    generation: u32,
}

impl ParticleHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    particle: Particle,
    generation: u32,
    /// Position in the dense active list; `None` while the slot is free.
    dense: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ParticlePool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    active: Vec<u32>,
}

impl ParticlePool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::default(); capacity],
            // Reversed so the lowest index is handed out first.
            free: (0..capacity as u32).rev().collect(),
            active: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn available_count(&self) -> usize {
        self.free.len()
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Take a free slot and initialize it. `None` when the pool is exhausted.
    pub fn acquire(&mut self, spawn: &ParticleSpawn) -> Option<ParticleHandle> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.particle = Particle::spawn(spawn);
        slot.dense = Some(self.active.len() as u32);
        self.active.push(index);
        Some(ParticleHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Return a particle to the pool. Stale or foreign handles are ignored.
    pub fn release(&mut self, handle: ParticleHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation {
            return false;
        }
        let Some(dense) = slot.dense.take() else {
            return false;
        };
        slot.particle = Particle::default();
        slot.generation = slot.generation.wrapping_add(1);

        self.active.swap_remove(dense as usize);
        if let Some(&moved) = self.active.get(dense as usize) {
            self.slots[moved as usize].dense = Some(dense);
        }
        self.free.push(handle.index);
        true
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.dense.is_some())
            .map(|s| &s.particle)
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.dense.is_some())
            .map(|s| &mut s.particle)
    }

    fn handle_at(&self, index: u32) -> ParticleHandle {
        ParticleHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Iterate over live particles.
    pub fn iter_active(&self) -> impl Iterator<Item = (ParticleHandle, &Particle)> + '_ {
        self.active
            .iter()
            .map(move |&i| (self.handle_at(i), &self.slots[i as usize].particle))
    }

    /// Visit every live particle mutably.
    pub fn for_each_active_mut(&mut self, mut f: impl FnMut(ParticleHandle, &mut Particle)) {
        for &index in &self.active {
            let slot = &mut self.slots[index as usize];
            let handle = ParticleHandle {
                index,
                generation: slot.generation,
            };
            f(handle, &mut slot.particle);
        }
    }

    /// Release every live particle for which `keep` returns false. Returns the count released.
    pub fn retain(&mut self, mut keep: impl FnMut(&Particle) -> bool) -> usize {
        let mut released = 0;
        let mut i = self.active.len();
        // Walk backwards: swap_remove only moves already-visited entries.
        while i > 0 {
            i -= 1;
            let index = self.active[i];
            if !keep(&self.slots[index as usize].particle) {
                let handle = self.handle_at(index);
                if self.release(handle) {
                    released += 1;
                }
            }
        }
        released
    }

    pub fn release_all(&mut self) {
        while let Some(&index) = self.active.last() {
            let handle = self.handle_at(index);
            self.release(handle);
        }
    }

    /// Change capacity. Growing adds free slots. Shrinking below the live count
    /// first releases the particles closest to end of life, then compacts the
    /// arena; every outstanding handle is invalidated by a compaction.
    pub fn resize(&mut self, capacity: usize) {
        let old = self.capacity();
        if capacity == old {
            return;
        }
        if capacity > old {
            let generation = self.next_generation();
            self.slots.extend((old..capacity).map(|_| Slot {
                generation,
                ..Slot::default()
            }));
            // Keep low indices first out.
            let mut added: Vec<u32> = (old as u32..capacity as u32).rev().collect();
            added.append(&mut self.free);
            self.free = added;
            log::debug!("particle pool grown {} -> {}", old, capacity);
            return;
        }

        if self.active.len() > capacity {
            let excess = self.active.len() - capacity;
            let mut by_age: Vec<(f32, ParticleHandle)> = self
                .iter_active()
                .map(|(h, p)| (p.life_fraction(), h))
                .collect();
            by_age.sort_by(|a, b| b.0.total_cmp(&a.0));
            for &(_, handle) in by_age.iter().take(excess) {
                self.release(handle);
            }
        }

        let survivors: Vec<Particle> = self.iter_active().map(|(_, p)| *p).collect();
        let generation = self.next_generation();
        self.slots = vec![
            Slot {
                generation,
                ..Slot::default()
            };
            capacity
        ];
        self.active.clear();
        for (i, particle) in survivors.into_iter().enumerate() {
            self.slots[i].particle = particle;
            self.slots[i].dense = Some(i as u32);
            self.active.push(i as u32);
        }
        self.free = (self.active.len() as u32..capacity as u32).rev().collect();
        log::debug!(
            "particle pool shrunk {} -> {} ({} live)",
            old,
            capacity,
            self.active.len()
        );
    }

    fn next_generation(&self) -> u32 {
        self.slots
            .iter()
            .map(|s| s.generation)
            .max()
            .unwrap_or(0)
            .wrapping_add(1)
    }
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
