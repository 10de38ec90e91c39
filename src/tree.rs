//! Owns the full compartment arena: builds the tree, assembles and solves
//! the per-step matrix with an O(N) Hines-style sweep, and exposes
//! recordables and threshold detection.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::compartment::{ChildCoupling, Compartment, CompartmentIndex, CompartmentParams};
use crate::currents::RecordableField;
use crate::error::{CmError, Result};
use crate::receptors::{ReceptorKind, ReceptorParams};
use crate::ring_buffer::RingBuffer;

/// A stable reference to one sampleable scalar, valid for the lifetime of
/// the tree (arena indices are never invalidated, since compartments are
/// never removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordableHandle {
    compartment: CompartmentIndex,
    field: RecordableField,
}

/// Owns every compartment of one neuron and drives its per-step solve.
pub struct CompTree {
    compartments: Vec<Compartment>,
    lookup: HashMap<i64, CompartmentIndex>,
    root: Option<CompartmentIndex>,
    /// Children-before-parent traversal order, rebuilt on every structural
    /// change. Down-sweep runs it forward, up-sweep runs it in reverse.
    post_order: Vec<CompartmentIndex>,
    syn_buffers: Vec<Rc<RefCell<RingBuffer>>>,
    dt: f64,
    v_th: f64,
    v_prev: f64,
    buffer_capacity: usize,
}

impl CompTree {
    /// An empty tree. `dt` is the fixed step size (ms); `buffer_capacity`
    /// sizes every ring buffer (input-current and receptor) to cover the
    /// host's maximum delivery delay.
    pub fn new(dt: f64, v_th: f64, buffer_capacity: usize) -> Self {
        Self {
            compartments: Vec::new(),
            lookup: HashMap::new(),
            root: None,
            post_order: Vec::new(),
            syn_buffers: Vec::new(),
            dt,
            v_th,
            // no root exists yet; reseeded to the root's own voltage as soon
            // as it is added, same as `init()` does.
            v_prev: f64::NEG_INFINITY,
            buffer_capacity,
        }
    }

    fn index_of(&self, comp_idx: i64) -> Result<CompartmentIndex> {
        self.lookup
            .get(&comp_idx)
            .copied()
            .ok_or(CmError::UnknownCompartment { index: comp_idx })
    }

    /// Add a compartment. The first call must pass `parent_idx = -1` and
    /// becomes the root; every subsequent call must name an existing
    /// parent.
    pub fn add_compartment(
        &mut self,
        comp_idx: i64,
        parent_idx: i64,
        params: CompartmentParams,
    ) -> Result<()> {
        if self.lookup.contains_key(&comp_idx) {
            return Err(CmError::DuplicateCompartment { index: comp_idx });
        }

        let parent = if self.root.is_none() {
            if parent_idx != -1 {
                return Err(CmError::MissingRoot);
            }
            None
        } else {
            if parent_idx == -1 {
                return Err(CmError::DuplicateCompartment { index: comp_idx });
            }
            Some(
                self.lookup
                    .get(&parent_idx)
                    .copied()
                    .ok_or(CmError::UnknownParent { index: parent_idx })?,
            )
        };

        let compartment = Compartment::new(comp_idx, parent, params, self.buffer_capacity)?;
        let arena_idx = CompartmentIndex(self.compartments.len());
        self.compartments.push(compartment);
        self.lookup.insert(comp_idx, arena_idx);

        if let Some(parent_arena) = parent {
            self.compartments[parent_arena.0].children.push(arena_idx);
        } else {
            self.root = Some(arena_idx);
            self.v_prev = self.compartments[arena_idx.0].v;
        }

        self.rebuild_post_order();
        Ok(())
    }

    /// Run `f` against a compartment's channel/receptor bundle in place.
    /// Used to attach ion channels after construction.
    pub fn with_currents(
        &mut self,
        comp_idx: i64,
        f: impl FnOnce(&mut crate::currents::CompartmentCurrents),
    ) -> Result<()> {
        let idx = self.index_of(comp_idx)?;
        f(&mut self.compartments[idx.0].currents);
        Ok(())
    }

    /// Attach a new receptor of `kind` to `comp_idx`, allocating a fresh
    /// ring buffer for it. Returns the receptor id used to route
    /// `deliver_spike`.
    pub fn add_receptor(
        &mut self,
        comp_idx: i64,
        kind: ReceptorKind,
        params: ReceptorParams,
    ) -> Result<usize> {
        let arena_idx = self.index_of(comp_idx)?;
        let buffer = Rc::new(RefCell::new(RingBuffer::new(self.buffer_capacity)));
        let receptor_id = self.syn_buffers.len();
        self.compartments[arena_idx.0]
            .currents
            .add_synapse(kind, buffer.clone(), params)?;
        self.syn_buffers.push(buffer);
        Ok(receptor_id)
    }

    /// Reset every compartment's voltage to `e_l` and clear all state and
    /// buffers. Must be called after a `CmError::NumericalDegeneracy`
    /// before the tree is used again.
    pub fn init(&mut self) {
        for c in &mut self.compartments {
            c.init();
        }
        self.v_prev = self
            .root
            .map(|root| self.compartments[root.0].v)
            .unwrap_or(f64::NEG_INFINITY);
    }

    fn rebuild_post_order(&mut self) {
        self.post_order.clear();
        if let Some(root) = self.root {
            self.visit_post_order(root);
        }
    }

    fn visit_post_order(&mut self, idx: CompartmentIndex) {
        let children = self.compartments[idx.0].children.clone();
        for child in children {
            self.visit_post_order(child);
        }
        self.post_order.push(idx);
    }

    /// Route a delivered spike to its receptor's buffer at `lag`. `weight`
    /// must be nonnegative.
    pub fn deliver_spike(
        &mut self,
        receptor_id: usize,
        lag: i64,
        weight: f64,
        multiplicity: f64,
    ) -> Result<()> {
        if weight < 0.0 {
            return Err(CmError::NegativeSpikeWeight { value: weight });
        }
        let buffer = self.syn_buffers.get(receptor_id).ok_or_else(|| {
            CmError::IndexOutOfRange {
                index: receptor_id as i64,
                capacity: self.syn_buffers.len(),
            }
        })?;
        buffer.borrow_mut().add_value(lag, weight * multiplicity)
    }

    /// Add `weight * current` to a compartment's input-current buffer at
    /// `lag`.
    pub fn deliver_current(
        &mut self,
        comp_idx: i64,
        lag: i64,
        weight: f64,
        current: f64,
    ) -> Result<()> {
        let idx = self.index_of(comp_idx)?;
        self.compartments[idx.0]
            .input_current
            .add_value(lag, weight * current)
    }

    /// Assemble every compartment's local matrix row for this step. Order
    /// does not matter: each row depends only on voltages as of the start
    /// of the step, never on a neighbor's scratch fields.
    fn construct_matrix(&mut self, lag: i64) -> Result<()> {
        for i in 0..self.compartments.len() {
            let parent_v = self.compartments[i].parent.map(|p| self.compartments[p.0].v);
            let children_coupling: Vec<ChildCoupling> = self.compartments[i]
                .children
                .iter()
                .map(|c| self.compartments[c.0].coupling_to_parent())
                .collect();
            self.compartments[i].construct_matrix_element(
                self.dt,
                lag,
                parent_v,
                &children_coupling,
            )?;
        }
        Ok(())
    }

    /// Two-pass O(N) solve: fold children into parents along the
    /// precomputed post-order, then back-substitute root to leaves.
    fn solve_matrix(&mut self) -> Result<()> {
        for &idx in &self.post_order {
            let children = self.compartments[idx.0].children.clone();
            for child in children {
                let child_gg = self.compartments[child.0].gg;
                if child_gg == 0.0 {
                    return Err(CmError::NumericalDegeneracy {
                        compartment: self.compartments[child.0].comp_idx,
                    });
                }
                let child_hh = self.compartments[child.0].hh;
                let child_ff = self.compartments[child.0].ff;
                let parent = &mut self.compartments[idx.0];
                parent.gg -= child_hh * child_hh / child_gg;
                parent.ff -= child_hh * child_ff / child_gg;
            }
        }

        for &idx in self.post_order.iter().rev() {
            let gg = self.compartments[idx.0].gg;
            if gg == 0.0 {
                return Err(CmError::NumericalDegeneracy {
                    compartment: self.compartments[idx.0].comp_idx,
                });
            }
            match self.compartments[idx.0].parent {
                Some(parent) => {
                    let v_parent = self.compartments[parent.0].v;
                    let c = &mut self.compartments[idx.0];
                    c.v = (c.ff - c.hh * v_parent) / gg;
                }
                None => {
                    let c = &mut self.compartments[idx.0];
                    c.v = c.ff / gg;
                }
            }
        }

        Ok(())
    }

    /// Advance one step at `lag`: construct the matrix, solve it, and
    /// report whether the root crossed `v_th` upward on this step.
    pub fn step(&mut self, lag: i64) -> Result<bool> {
        self.construct_matrix(lag)?;
        self.solve_matrix()?;

        let root_idx = self.root.ok_or(CmError::MissingRoot)?;
        let v_root = self.compartments[root_idx.0].v;
        let crossed = self.v_prev < self.v_th && v_root >= self.v_th;
        self.v_prev = v_root;
        Ok(crossed)
    }

    /// Current root voltage.
    pub fn root_voltage(&self) -> Result<f64> {
        let root_idx = self.root.ok_or(CmError::MissingRoot)?;
        Ok(self.compartments[root_idx.0].v)
    }

    /// Current voltage of a specific compartment, by its stable id.
    pub fn voltage(&self, comp_idx: i64) -> Result<f64> {
        let idx = self.index_of(comp_idx)?;
        Ok(self.compartments[idx.0].v)
    }

    /// Force a compartment's voltage directly, bypassing the solve. Used to
    /// set up initial conditions that differ from `e_l` (scenario setup,
    /// voltage clamps); not part of the per-step solve path.
    pub fn set_voltage(&mut self, comp_idx: i64, v: f64) -> Result<()> {
        let idx = self.index_of(comp_idx)?;
        self.compartments[idx.0].v = v;
        Ok(())
    }

    /// Every named recordable in the tree: `v_comp<id>` for voltages, plus
    /// whatever each compartment's channel/receptor bundle exposes.
    pub fn recordables(&self) -> Vec<(String, RecordableHandle)> {
        let mut out = Vec::new();
        for c in &self.compartments {
            let arena_idx = self.lookup[&c.comp_idx];
            out.push((
                format!("v_comp{}", c.comp_idx),
                RecordableHandle {
                    compartment: arena_idx,
                    field: RecordableField::Voltage,
                },
            ));
            for (name, field) in c.currents.recordables() {
                out.push((
                    format!("{}_comp{}", name, c.comp_idx),
                    RecordableHandle {
                        compartment: arena_idx,
                        field,
                    },
                ));
            }
        }
        out
    }

    /// Resolve a handle to its current scalar value.
    pub fn sample(&self, handle: &RecordableHandle) -> Result<f64> {
        let c = self
            .compartments
            .get(handle.compartment.0)
            .ok_or(CmError::IndexOutOfRange {
                index: handle.compartment.0 as i64,
                capacity: self.compartments.len(),
            })?;
        Ok(match handle.field {
            RecordableField::Voltage => c.v,
            other => c.currents.sample(other).unwrap_or(0.0),
        })
    }

    /// Number of compartments in the tree.
    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }
}
