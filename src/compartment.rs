//! A single membrane patch: passive parameters, matrix scratch state, and
//! its owned channel/receptor bundle and input-current buffer.

use crate::currents::CompartmentCurrents;
use crate::error::{CmError, Result};
use crate::ring_buffer::RingBuffer;

/// Index into [`crate::tree::CompTree`]'s compartment arena. Stable across
/// `add_compartment`/`add_receptor` — nothing is ever removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompartmentIndex(pub usize);

/// Passive electrical parameters supplied when a compartment is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompartmentParams {
    /// Membrane capacitance (pF). Must be `> 0`.
    pub c_m: f64,
    /// Axial coupling conductance to the parent (nS). Ignored for the root.
    pub g_c: f64,
    /// Leak conductance (nS).
    pub g_l: f64,
    /// Leak reversal potential (mV); also the initial and rest voltage.
    pub e_l: f64,
}

/// The coupling a child compartment exposes to its parent during matrix
/// assembly: the child's own `g_c` and current voltage.
#[derive(Debug, Clone, Copy)]
pub struct ChildCoupling {
    pub g_c: f64,
    pub v: f64,
}

/// One compartment: passive RC patch, its active currents, and the scratch
/// fields the tree solver reduces in place each tick.
#[derive(Clone)]
pub struct Compartment {
    /// Caller-facing stable identifier (not an arena index).
    pub comp_idx: i64,
    /// Arena index of the parent, or `None` for the root.
    pub parent: Option<CompartmentIndex>,
    /// Arena indices of this compartment's children, in insertion order.
    pub children: Vec<CompartmentIndex>,

    pub ca: f64,
    pub gc: f64,
    pub gl: f64,
    pub el: f64,

    pub v: f64,

    pub ff: f64,
    pub gg: f64,
    pub hh: f64,
    pub xx: f64,
    pub yy: f64,
    pub n_passed: u32,

    pub input_current: RingBuffer,
    pub currents: CompartmentCurrents,
}

impl Compartment {
    /// Create a new compartment at rest (`v = e_l`), with an input-current
    /// buffer sized to `buffer_capacity` delivery lags.
    pub fn new(
        comp_idx: i64,
        parent: Option<CompartmentIndex>,
        params: CompartmentParams,
        buffer_capacity: usize,
    ) -> Result<Self> {
        if params.c_m <= 0.0 {
            return Err(CmError::InvalidCapacitance { value: params.c_m });
        }

        Ok(Self {
            comp_idx,
            parent,
            children: Vec::new(),
            ca: params.c_m,
            gc: params.g_c,
            gl: params.g_l,
            el: params.e_l,
            v: params.e_l,
            ff: 0.0,
            gg: 0.0,
            hh: 0.0,
            xx: 0.0,
            yy: 0.0,
            n_passed: 0,
            input_current: RingBuffer::new(buffer_capacity),
            currents: CompartmentCurrents::new(),
        })
    }

    /// Reset to rest: voltage to `e_l`, all scratch fields and channel /
    /// receptor / input-buffer state cleared.
    pub fn init(&mut self) {
        self.v = self.el;
        self.ff = 0.0;
        self.gg = 0.0;
        self.hh = 0.0;
        self.xx = 0.0;
        self.yy = 0.0;
        self.n_passed = 0;
        self.input_current.clear();
        self.currents.init(self.el);
    }

    /// Assemble this compartment's local row of the Crank-Nicolson
    /// tridiagonal system: `gg`, `hh` (coupling to parent only), `ff`.
    /// `parent_v` is `None` for the root. `children` carries each child's
    /// own `g_c`/`v` as of the start of this step.
    pub fn construct_matrix_element(
        &mut self,
        dt: f64,
        lag: i64,
        parent_v: Option<f64>,
        children: &[ChildCoupling],
    ) -> Result<()> {
        self.gg = self.ca / dt + self.gl / 2.0;
        self.ff = self.ca / dt * self.v - self.gl * (self.v / 2.0 - self.el);

        if let Some(v_parent) = parent_v {
            self.gg += self.gc / 2.0;
            self.hh = -self.gc / 2.0;
            self.ff -= self.gc * (self.v - v_parent) / 2.0;
        } else {
            self.hh = 0.0;
        }

        for child in children {
            self.gg += child.g_c / 2.0;
            self.ff -= child.g_c * (self.v - child.v) / 2.0;
        }

        let (g_cur, i_cur) = self.currents.f_numstep(self.v, dt, lag)?;
        self.gg += g_cur;
        self.ff += i_cur;

        self.ff += self.input_current.get_value(lag)?;

        Ok(())
    }

    /// This compartment's own coupling to its parent, as its parent will
    /// see it during the parent's `construct_matrix_element` call.
    pub fn coupling_to_parent(&self) -> ChildCoupling {
        ChildCoupling {
            g_c: self.gc,
            v: self.v,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(c_m: f64, g_c: f64, g_l: f64, e_l: f64) -> CompartmentParams {
        CompartmentParams {
            c_m,
            g_c,
            g_l,
            e_l,
        }
    }

    #[test]
    fn new_compartment_starts_at_rest() {
        let c = Compartment::new(0, None, params(1.0, 0.0, 0.1, -70.0), 8).unwrap();
        assert_eq!(c.v, -70.0);
        assert!(c.is_root());
        assert!(c.is_leaf());
    }

    #[test]
    fn zero_capacitance_is_rejected() {
        assert!(Compartment::new(0, None, params(0.0, 0.0, 0.1, -70.0), 8).is_err());
        assert!(Compartment::new(0, None, params(-1.0, 0.0, 0.1, -70.0), 8).is_err());
    }

    #[test]
    fn root_row_has_no_parent_coupling() {
        let mut c = Compartment::new(0, None, params(1.0, 0.0, 0.1, -70.0), 8).unwrap();
        c.construct_matrix_element(0.1, 0, None, &[]).unwrap();
        assert_eq!(c.hh, 0.0);
        assert!((c.gg - (1.0 / 0.1 + 0.05)).abs() < 1e-12);
    }

    #[test]
    fn passive_compartment_at_rest_has_zero_net_flux() {
        // at v == e_l with no parent/children/currents, ff should equal
        // ca/dt * v exactly (the leak term vanishes).
        let mut c = Compartment::new(0, None, params(1.0, 0.0, 0.1, -70.0), 8).unwrap();
        c.construct_matrix_element(0.1, 0, None, &[]).unwrap();
        assert!((c.ff - (c.ca / 0.1 * c.v)).abs() < 1e-9);
    }

    #[test]
    fn axial_coupling_contribution_is_conserved_between_parent_and_child() {
        let gc = 0.5;
        let v_parent = -70.0;
        let v_child = -60.0;
        let dt = 0.1;

        let mut parent_alone = Compartment::new(0, None, params(1.0, 0.0, 0.1, -70.0), 8).unwrap();
        parent_alone.v = v_parent;
        parent_alone.construct_matrix_element(dt, 0, None, &[]).unwrap();
        let ff_parent_alone = parent_alone.ff;

        let mut parent_coupled = Compartment::new(0, None, params(1.0, 0.0, 0.1, -70.0), 8).unwrap();
        parent_coupled.v = v_parent;
        parent_coupled
            .construct_matrix_element(dt, 0, None, &[ChildCoupling { g_c: gc, v: v_child }])
            .unwrap();
        let ff_parent_coupled = parent_coupled.ff;
        let parent_contribution = ff_parent_coupled - ff_parent_alone;

        let mut child_alone = Compartment::new(1, None, params(1.0, gc, 0.1, -70.0), 8).unwrap();
        child_alone.v = v_child;
        child_alone.construct_matrix_element(dt, 0, None, &[]).unwrap();
        let ff_child_alone = child_alone.ff;

        let mut child_coupled = Compartment::new(1, None, params(1.0, gc, 0.1, -70.0), 8).unwrap();
        child_coupled.v = v_child;
        child_coupled
            .construct_matrix_element(dt, 0, Some(v_parent), &[])
            .unwrap();
        let ff_child_coupled = child_coupled.ff;
        let child_contribution = ff_child_coupled - ff_child_alone;

        assert!(
            (parent_contribution + child_contribution).abs() < 1e-12,
            "parent={parent_contribution} child={child_contribution}"
        );
    }

    #[test]
    fn child_coupling_pulls_toward_parent_voltage() {
        let mut parent = Compartment::new(0, None, params(1.0, 0.0, 0.1, -70.0), 8).unwrap();
        parent.v = -70.0;
        let child_coupling = ChildCoupling { g_c: 0.5, v: -60.0 };
        parent
            .construct_matrix_element(0.1, 0, None, &[child_coupling])
            .unwrap();
        // ff should be pulled upward (toward the warmer child) relative to
        // the no-children case.
        let mut isolated = Compartment::new(0, None, params(1.0, 0.0, 0.1, -70.0), 8).unwrap();
        isolated.v = -70.0;
        isolated.construct_matrix_element(0.1, 0, None, &[]).unwrap();
        assert!(parent.ff > isolated.ff);
    }
}
