//! Render target pooling.
//!
//! Preview rendering reuses a small fixed arena of targets keyed by slot,
//! reallocating a slot only when the requested dimensions change. Final
//! captures use a [`OneShotTarget`] instead: its size varies per request, so
//! it is created for one capture and destroyed right after.

use crate::backend::{RenderBackend, TargetDesc, TargetId};
use crate::format::{FilterMode, TextureFormat};
use stillshot_core::{CaptureError, Result};
use tracing::{debug, warn};

/// Slots in the preview pool.
pub const PREVIEW_SLOTS: usize = 2;

/// A live target owned by a pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PooledTarget {
    pub target: TargetId,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
    pub anti_aliasing: u8,
    pub slot: usize,
}

/// Fixed-capacity arena of reusable render targets.
///
/// At most one target is live per slot; replacing a slot destroys the
/// previous target through the backend before allocating the new one.
#[derive(Debug)]
pub struct RenderResourcePool<const N: usize = PREVIEW_SLOTS> {
    slots: [Option<PooledTarget>; N],
    created: u64,
    destroyed: u64,
}

impl<const N: usize> RenderResourcePool<N> {
    pub fn new() -> Self {
        Self {
            slots: [None; N],
            created: 0,
            destroyed: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Get the target in `slot`, creating or resizing it as needed.
    ///
    /// Returns the entry and whether it was (re)created. The reference is
    /// valid until the next pool mutation.
    pub fn acquire<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        slot: usize,
        desc: &TargetDesc,
    ) -> Result<(&PooledTarget, bool)> {
        if slot >= N {
            return Err(CaptureError::AllocationFailure {
                width: desc.width,
                height: desc.height,
                reason: format!("pool slot {slot} out of range (capacity {N})"),
            });
        }

        let reusable = self.slots[slot]
            .map_or(false, |e| e.width == desc.width && e.height == desc.height);

        if !reusable {
            if let Some(stale) = self.slots[slot].take() {
                debug!(
                    "Pool slot {} resized {}x{} -> {}x{}",
                    slot, stale.width, stale.height, desc.width, desc.height
                );
                backend.destroy_target(stale.target);
                self.destroyed += 1;
            }
            let target = backend.create_target(desc)?;
            self.created += 1;
            self.slots[slot] = Some(PooledTarget {
                target,
                width: desc.width,
                height: desc.height,
                format: desc.format,
                filter: desc.filter,
                anti_aliasing: desc.anti_aliasing,
                slot,
            });
        }

        let entry = self.slots[slot]
            .as_ref()
            .ok_or_else(|| CaptureError::AllocationFailure {
                width: desc.width,
                height: desc.height,
                reason: format!("pool slot {slot} empty after allocation"),
            })?;
        Ok((entry, !reusable))
    }

    /// Current occupant of a slot.
    pub fn get(&self, slot: usize) -> Option<&PooledTarget> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Destroy every pooled target.
    pub fn invalidate_all<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        for entry in self.slots.iter_mut().filter_map(Option::take) {
            backend.destroy_target(entry.target);
            self.destroyed += 1;
        }
        debug!("Render pool invalidated");
    }

    /// Number of occupied slots.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Targets allocated over the pool's lifetime.
    pub fn created_count(&self) -> u64 {
        self.created
    }

    /// Targets destroyed over the pool's lifetime.
    pub fn destroyed_count(&self) -> u64 {
        self.destroyed
    }
}

impl<const N: usize> Default for RenderResourcePool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Drop for RenderResourcePool<N> {
    fn drop(&mut self) {
        let live = self.live_count();
        if live > 0 {
            warn!("Render pool dropped with {live} live target(s); call invalidate_all first");
        }
    }
}

/// Full-resolution target owned by a single capture.
///
/// Not `Clone`: [`OneShotTarget::destroy`] consumes it, so a capture cannot
/// release the same target twice.
#[derive(Debug)]
pub struct OneShotTarget {
    target: TargetId,
    desc: TargetDesc,
}

impl OneShotTarget {
    pub fn create<B: RenderBackend + ?Sized>(backend: &mut B, desc: TargetDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            return Err(CaptureError::AllocationFailure {
                width: desc.width,
                height: desc.height,
                reason: "zero-sized target".to_string(),
            });
        }
        let target = backend.create_target(&desc)?;
        debug!("Created {}x{} capture target", desc.width, desc.height);
        Ok(Self { target, desc })
    }

    pub fn id(&self) -> TargetId {
        self.target
    }

    pub fn desc(&self) -> &TargetDesc {
        &self.desc
    }

    pub fn destroy<B: RenderBackend + ?Sized>(self, backend: &mut B) {
        backend.destroy_target(self.target);
        debug!("Destroyed {}x{} capture target", self.desc.width, self.desc.height);
    }
}
