//! Synaptic receptors driven by a spike [`RingBuffer`](crate::ring_buffer::RingBuffer).
//!
//! All four kinds (AMPA, GABA, NMDA, AMPA+NMDA) share a double-exponential
//! conductance kernel. A kernel is parameterized by a rise time `tau_r` and
//! decay time `tau_d` and tracks two state variables `g_r`, `g_d` such that
//! `g(t) = g_d(t) + g_r(t)` traces out a normalized alpha-like waveform that
//! peaks at exactly `1.0` for a unit-weight spike.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{CmError, Result};
use crate::ring_buffer::RingBuffer;

/// The four receptor kinds this crate supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceptorKind {
    Ampa,
    Gaba,
    Nmda,
    AmpaNmda,
}

impl ReceptorKind {
    /// Parse the host-facing name (`"AMPA"`, `"GABA"`, `"NMDA"`, `"AMPA_NMDA"`).
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "AMPA" => Ok(Self::Ampa),
            "GABA" => Ok(Self::Gaba),
            "NMDA" => Ok(Self::Nmda),
            "AMPA_NMDA" => Ok(Self::AmpaNmda),
            other => Err(CmError::UnknownReceptorKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Double-exponential conductance kernel shared by every receptor kind.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Kernel {
    tau_r: f64,
    tau_d: f64,
    g_norm: f64,
    g_r: f64,
    g_d: f64,
}

impl Kernel {
    fn new(tau_r: f64, tau_d: f64) -> Result<Self> {
        if tau_r <= 0.0 {
            return Err(CmError::InvalidTimeConstant { value: tau_r });
        }
        if tau_d <= tau_r {
            return Err(CmError::InvalidTimeConstant { value: tau_d });
        }

        let tp = tau_r * tau_d / (tau_d - tau_r) * (tau_d / tau_r).ln();
        let g_norm = 1.0 / (-(-tp / tau_r).exp() + (-tp / tau_d).exp());

        Ok(Self {
            tau_r,
            tau_d,
            g_norm,
            g_r: 0.0,
            g_d: 0.0,
        })
    }

    fn init(&mut self) {
        self.g_r = 0.0;
        self.g_d = 0.0;
    }

    /// Decay the kernel by `dt` and inject a weighted spike `w` (`w == 0.0`
    /// is a no-op decay-only step). Returns the resulting conductance.
    fn step(&mut self, dt: f64, w: f64) -> f64 {
        self.g_r *= (-dt / self.tau_r).exp();
        self.g_d *= (-dt / self.tau_d).exp();

        self.g_r -= w * self.g_norm;
        self.g_d += w * self.g_norm;

        self.g_d + self.g_r
    }
}

/// Magnesium-block sigmoid and its derivative, used by NMDA-containing
/// receptor kinds.
fn nmda_sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + 0.3 * (-0.1 * v).exp())
}

fn d_nmda_sigmoid_dv(v: f64) -> f64 {
    0.03 * (-0.1 * v).exp() / (0.3 * (-0.1 * v).exp() + 1.0).powi(2)
}

/// Linearize a voltage-independent kernel conductance `g` into the
/// `(g_contrib, i_contrib)` pair the compartment's matrix row expects.
fn linearize_linear(g: f64, e_rev: f64, v: f64) -> (f64, f64) {
    (g / 2.0, g * (e_rev - v / 2.0))
}

/// Linearize an NMDA kernel conductance `g` (voltage-independent part) times
/// the voltage-dependent magnesium-block sigmoid, as a first-order Taylor
/// expansion around the current `v`.
fn linearize_nmda(g: f64, e_rev: f64, v: f64) -> (f64, f64) {
    let s = nmda_sigmoid(v);
    let ds = d_nmda_sigmoid_dv(v);
    let g_contrib = (g / 2.0) * (s + ds * (v - e_rev));
    let i_contrib = g * (s * (e_rev - v / 2.0) + ds * v * (v - e_rev) / 2.0);
    (g_contrib, i_contrib)
}

/// Default rise/decay time constants (ms) and reversal potential (mV) for
/// each receptor kind.
mod defaults {
    pub const AMPA: (f64, f64, f64) = (0.2, 3.0, 0.0);
    pub const GABA: (f64, f64, f64) = (0.2, 10.0, -80.0);
    pub const NMDA: (f64, f64, f64) = (0.2, 43.0, 0.0);
    pub const NMDA_RATIO: f64 = 2.0;
}

/// A single synaptic receptor attached to one compartment.
#[derive(Clone)]
pub struct Receptor {
    kind: ReceptorKind,
    e_rev: f64,
    kernel: Kernel,
    /// Present only for `AmpaNmda`: the NMDA component's own kernel and
    /// scaling ratio.
    nmda_part: Option<(Kernel, f64)>,
    spikes: Rc<RefCell<RingBuffer>>,
}

/// Parameters accepted by [`Receptor::new`]; fields not relevant to the
/// chosen kind are ignored. `None` selects the kind's documented default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceptorParams {
    pub e_rev: Option<f64>,
    pub tau_r: Option<f64>,
    pub tau_d: Option<f64>,
    pub tau_r_nmda: Option<f64>,
    pub tau_d_nmda: Option<f64>,
    pub nmda_ratio: Option<f64>,
}

impl Receptor {
    /// Construct a receptor of the given kind, reading from `spikes`.
    pub fn new(
        kind: ReceptorKind,
        spikes: Rc<RefCell<RingBuffer>>,
        params: ReceptorParams,
    ) -> Result<Self> {
        let (default_tau_r, default_tau_d, default_e_rev) = match kind {
            ReceptorKind::Ampa | ReceptorKind::AmpaNmda => defaults::AMPA,
            ReceptorKind::Gaba => defaults::GABA,
            ReceptorKind::Nmda => defaults::NMDA,
        };

        let e_rev = params.e_rev.unwrap_or(default_e_rev);
        let tau_r = params.tau_r.unwrap_or(default_tau_r);
        let tau_d = params.tau_d.unwrap_or(default_tau_d);
        let kernel = Kernel::new(tau_r, tau_d)?;

        let nmda_part = if kind == ReceptorKind::AmpaNmda {
            let (ntr, ntd, _) = defaults::NMDA;
            let tau_r_nmda = params.tau_r_nmda.unwrap_or(ntr);
            let tau_d_nmda = params.tau_d_nmda.unwrap_or(ntd);
            let ratio = params.nmda_ratio.unwrap_or(defaults::NMDA_RATIO);
            Some((Kernel::new(tau_r_nmda, tau_d_nmda)?, ratio))
        } else {
            None
        };

        Ok(Self {
            kind,
            e_rev,
            kernel,
            nmda_part,
            spikes,
        })
    }

    /// Receptor kind.
    pub fn kind(&self) -> ReceptorKind {
        self.kind
    }

    /// Reset kernel state and clear the spike buffer.
    pub fn init(&mut self) {
        self.kernel.init();
        if let Some((nmda, _)) = &mut self.nmda_part {
            nmda.init();
        }
        self.spikes.borrow_mut().clear();
    }

    /// Current total conductance `g_r + g_d` (plus the NMDA component's, if
    /// present), ignoring the sigmoid/voltage dependence. Exposed as a
    /// recordable.
    pub fn conductance(&self) -> f64 {
        let base = self.kernel.g_d + self.kernel.g_r;
        match &self.nmda_part {
            Some((nmda, ratio)) => base + ratio * (nmda.g_d + nmda.g_r),
            None => base,
        }
    }

    /// Integrate one step: decay the kernel(s), inject this tick's spike
    /// weight at `lag`, and return the linearized `(g_contrib, i_contrib)`
    /// pair for the compartment's matrix row.
    pub fn f_numstep(&mut self, v: f64, dt: f64, lag: i64) -> Result<(f64, f64)> {
        let w = self.spikes.borrow_mut().get_value(lag)?;
        let g = self.kernel.step(dt, w);

        Ok(match self.kind {
            ReceptorKind::Ampa | ReceptorKind::Gaba => linearize_linear(g, self.e_rev, v),
            ReceptorKind::Nmda => linearize_nmda(g, self.e_rev, v),
            ReceptorKind::AmpaNmda => {
                let (ampa_g, ampa_i) = linearize_linear(g, self.e_rev, v);
                let (nmda_kernel, ratio) = self
                    .nmda_part
                    .as_mut()
                    .expect("AmpaNmda always carries an nmda_part");
                // the NMDA component reads the same ring buffer again at the
                // same lag, which would double-count the spike weight; it
                // instead shares the AMPA component's injected weight `w`.
                nmda_kernel.g_r *= (-dt / nmda_kernel.tau_r).exp();
                nmda_kernel.g_d *= (-dt / nmda_kernel.tau_d).exp();
                nmda_kernel.g_r -= w * nmda_kernel.g_norm;
                nmda_kernel.g_d += w * nmda_kernel.g_norm;
                let nmda_g = nmda_kernel.g_d + nmda_kernel.g_r;
                let (nmda_gc, nmda_ic) = linearize_nmda(nmda_g, self.e_rev, v);
                (ampa_g + ratio * nmda_gc, ampa_i + ratio * nmda_ic)
            }
        })
    }
}
