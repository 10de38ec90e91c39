//! Thin host-facing adapter: receives configuration and events, drives a
//! [`CompTree`] one tick at a time, and emits spike timestamps.

use crate::compartment::CompartmentParams;
use crate::error::Result;
use crate::receptors::{ReceptorKind, ReceptorParams};
use crate::tree::{CompTree, RecordableHandle};

/// Façade a host simulator drives: configuration calls, spike/current
/// delivery, and the tick loop. Holds exactly one neuron's tree.
pub struct Node {
    tree: CompTree,
}

impl Node {
    /// `dt` is the fixed step size (ms), `v_th` the root spike threshold
    /// (mV), `buffer_capacity` the number of delivery lags every ring
    /// buffer can hold.
    pub fn new(dt: f64, v_th: f64, buffer_capacity: usize) -> Self {
        log::trace!("creating node: dt={dt} v_th={v_th} buffer_capacity={buffer_capacity}");
        Self {
            tree: CompTree::new(dt, v_th, buffer_capacity),
        }
    }

    /// Add a compartment. The first call must pass `parent_idx = -1`.
    pub fn add_compartment(
        &mut self,
        comp_idx: i64,
        parent_idx: i64,
        params: CompartmentParams,
    ) -> Result<()> {
        self.tree
            .add_compartment(comp_idx, parent_idx, params)
            .inspect_err(|e| log::warn!("add_compartment({comp_idx}) rejected: {e}"))
    }

    /// Attach a sodium channel to `comp_idx`.
    pub fn set_na_channel(&mut self, comp_idx: i64, gbar: f64, e: f64) -> Result<()> {
        self.tree.with_currents(comp_idx, |c| c.set_na(gbar, e))
    }

    /// Attach a potassium channel to `comp_idx`.
    pub fn set_k_channel(&mut self, comp_idx: i64, gbar: f64, e: f64) -> Result<()> {
        self.tree.with_currents(comp_idx, |c| c.set_k(gbar, e))
    }

    /// Attach a new receptor. Returns the receptor id used by
    /// [`Node::deliver_spike`].
    pub fn add_receptor(
        &mut self,
        comp_idx: i64,
        kind: ReceptorKind,
        params: ReceptorParams,
    ) -> Result<usize> {
        self.tree
            .add_receptor(comp_idx, kind, params)
            .inspect_err(|e| log::warn!("add_receptor(comp={comp_idx}) rejected: {e}"))
    }

    /// Reset every compartment to rest.
    pub fn init(&mut self) {
        log::debug!("reinitializing node");
        self.tree.init();
    }

    /// Route a delivered spike to its receptor's buffer.
    pub fn deliver_spike(
        &mut self,
        receptor_id: usize,
        lag: i64,
        weight: f64,
        multiplicity: f64,
    ) -> Result<()> {
        log::trace!("deliver_spike(receptor={receptor_id}, lag={lag}, weight={weight})");
        self.tree
            .deliver_spike(receptor_id, lag, weight, multiplicity)
            .inspect_err(|e| log::warn!("deliver_spike(receptor={receptor_id}) rejected: {e}"))
    }

    /// Add a current injection to a compartment's input buffer.
    pub fn deliver_current(
        &mut self,
        comp_idx: i64,
        lag: i64,
        weight: f64,
        current: f64,
    ) -> Result<()> {
        log::trace!("deliver_current(comp={comp_idx}, lag={lag}, current={current})");
        self.tree
            .deliver_current(comp_idx, lag, weight, current)
            .inspect_err(|e| log::warn!("deliver_current(comp={comp_idx}) rejected: {e}"))
    }

    /// Advance `to_lag - from_lag` steps, returning the absolute timestamp
    /// of every spike emitted by the root during this call.
    pub fn tick(&mut self, origin_steps: i64, from_lag: i64, to_lag: i64) -> Result<Vec<i64>> {
        log::trace!("tick(origin={origin_steps}, from={from_lag}, to={to_lag})");
        let mut spikes = Vec::new();
        for lag in from_lag..to_lag {
            if self.tree.step(lag)? {
                let timestamp = origin_steps + lag + 1;
                log::debug!("spike emitted at step {timestamp}");
                spikes.push(timestamp);
            }
        }
        Ok(spikes)
    }

    /// Every named recordable in the tree.
    pub fn recordables(&self) -> Vec<(String, RecordableHandle)> {
        self.tree.recordables()
    }

    /// Resolve a recordable handle to its current scalar value.
    pub fn sample(&self, handle: &RecordableHandle) -> Result<f64> {
        self.tree.sample(handle)
    }

    /// Current root voltage.
    pub fn root_voltage(&self) -> Result<f64> {
        self.tree.root_voltage()
    }

    /// Current voltage of a specific compartment, by its stable id.
    pub fn voltage(&self, comp_idx: i64) -> Result<f64> {
        self.tree.voltage(comp_idx)
    }
}
