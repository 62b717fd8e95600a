//! Plan reuse: an LRU cache keyed by descriptor and a handle table for
//! callers that can only hold integers.

use std::collections::VecDeque;
use std::sync::OnceLock;

use hashbrown::HashMap;

use crate::backend::BackendParameters;
use crate::desc::Desc;
use crate::error::{Error, Result};
use crate::plan::Plan;

/// Capacity used by [`PlanCache::default`].
pub const DEFAULT_PLAN_CACHE_SIZE: usize = 64;

static ENV_CACHE_SIZE: OnceLock<usize> = OnceLock::new();

fn env_cache_size() -> usize {
    *ENV_CACHE_SIZE.get_or_init(|| {
        std::env::var("OMNIFFT_PLAN_CACHE_SIZE")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_PLAN_CACHE_SIZE)
    })
}

/// Plans keyed by their descriptor, evicted least recently used first.
pub struct PlanCache {
    plans: HashMap<Desc, Plan>,
    /// Most recently used at the back.
    order: VecDeque<Desc>,
    max_size: usize,
}

impl Default for PlanCache {
    /// A cache holding `OMNIFFT_PLAN_CACHE_SIZE` plans (64 when unset).
    fn default() -> Self {
        Self::new(env_cache_size())
    }
}

impl core::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlanCache")
            .field("len", &self.plans.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl PlanCache {
    /// A cache holding at most `max_size` plans; `0` is treated as `1`.
    pub fn new(max_size: usize) -> Self {
        Self {
            plans: HashMap::new(),
            order: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the capacity, evicting the oldest plans that no longer fit.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size.max(1);
        while self.plans.len() > self.max_size {
            self.evict();
        }
    }

    pub fn clear(&mut self) {
        self.plans.clear();
        self.order.clear();
    }

    pub fn contains(&self, desc: &Desc) -> bool {
        self.plans.contains_key(desc)
    }

    fn evict(&mut self) {
        if let Some(old) = self.order.pop_front() {
            debug_log!("plan cache: evicting {} {:?}", old.transform(), old.shape());
            self.plans.remove(&old);
        }
    }

    fn touch(&mut self, desc: &Desc) {
        if let Some(pos) = self.order.iter().position(|d| d == desc) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }

    /// Insert `plan` as most recently used, returning the plan it replaced.
    pub fn insert(&mut self, plan: Plan) -> Option<Plan> {
        let desc = plan.desc().clone();
        if let Some(old) = self.plans.insert(desc.clone(), plan) {
            self.touch(&desc);
            return Some(old);
        }
        if self.plans.len() > self.max_size {
            self.evict();
        }
        self.order.push_back(desc);
        None
    }

    /// The cached plan for `desc`, marked most recently used.
    pub fn get_mut(&mut self, desc: &Desc) -> Option<&mut Plan> {
        if !self.plans.contains_key(desc) {
            return None;
        }
        self.touch(desc);
        self.plans.get_mut(desc)
    }

    pub fn remove(&mut self, desc: &Desc) -> Option<Plan> {
        let plan = self.plans.remove(desc)?;
        self.order.retain(|d| d != desc);
        Some(plan)
    }

    /// The cached plan for `desc`, built with the global registry on a miss.
    pub fn get_or_make(&mut self, desc: &Desc, params: &BackendParameters) -> Result<&mut Plan> {
        self.get_or_insert_with(desc, |desc| crate::registry::make_plan(desc, params))
    }

    /// The cached plan for `desc`, built by `make` on a miss. A failed build
    /// leaves the cache unchanged.
    pub fn get_or_insert_with(
        &mut self,
        desc: &Desc,
        make: impl FnOnce(Desc) -> Result<Plan>,
    ) -> Result<&mut Plan> {
        if !self.plans.contains_key(desc) {
            let plan = make(desc.clone())?;
            self.insert(plan);
        } else {
            self.touch(desc);
        }
        self.plans
            .get_mut(desc)
            .ok_or_else(|| Error::Runtime("plan built for a different descriptor".into()))
    }

    /// Move every plan of `other` into this cache, keeping `other`'s
    /// recency order. Fails without moving anything when the result would
    /// exceed the capacity.
    pub fn merge(&mut self, other: &mut PlanCache) -> Result<()> {
        let incoming = other
            .plans
            .keys()
            .filter(|desc| !self.plans.contains_key(*desc))
            .count();
        if self.plans.len() + incoming > self.max_size {
            return Err(Error::Runtime(
                "cannot merge plan caches: the maximum size would be exceeded".into(),
            ));
        }
        while let Some(desc) = other.order.pop_front() {
            if let Some(plan) = other.plans.remove(&desc) {
                self.insert(plan);
            }
        }
        other.clear();
        Ok(())
    }
}

/// Opaque handle into a [`PlanArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlanHandle {
    index: u32,
    generation: u32,
}

impl PlanHandle {
    /// Pack into one integer for callers across a C boundary.
    pub fn to_bits(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

struct Slot {
    generation: u32,
    plan: Option<Plan>,
}

/// Plans addressed by generational handles. A removed plan's handle never
/// resolves again, even after its slot is reused.
#[derive(Default)]
pub struct PlanArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl core::fmt::Debug for PlanArena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlanArena").field("len", &self.len()).finish()
    }
}

impl PlanArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&mut self, plan: Plan) -> PlanHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.plan = Some(plan);
            return PlanHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            plan: Some(plan),
        });
        PlanHandle {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, handle: PlanHandle) -> Option<&Plan> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.plan.as_ref())
    }

    pub fn get_mut(&mut self, handle: PlanHandle) -> Option<&mut Plan> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.plan.as_mut())
    }

    pub fn remove(&mut self, handle: PlanHandle) -> Option<Plan> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let plan = slot.plan.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(plan)
    }
}
