//! Voltage-gated ion channels.
//!
//! Each channel holds its own gating state and integrates it with per-gate
//! exponential Euler, `x ← x_inf(v) + (x - x_inf(v)) * exp(-dt/tau_x(v))`,
//! then linearizes its conductance around the half step so the compartment
//! can fold it directly into a Crank-Nicolson matrix row: `f_numstep`
//! returns `(g/2, g*(e - v/2))`, never a raw current.
//!
//! Rate functions are the textbook Hodgkin & Huxley (1952) squid-axon
//! equations.

/// Sodium channel: fast activation (`m`) and slower inactivation (`h`),
/// `g = gbar * m^3 * h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NaChannel {
    /// Maximal conductance (nS). Zero until configured — inert by default.
    pub gbar: f64,
    /// Reversal potential (mV).
    pub e: f64,
    m: f64,
    h: f64,
}

impl NaChannel {
    /// Create an inactive sodium channel with the given maximal conductance
    /// and reversal potential.
    pub fn new(gbar: f64, e: f64) -> Self {
        Self {
            gbar,
            e,
            m: 0.0,
            h: 0.0,
        }
    }

    /// Alpha rate for the `m` gate (ms^-1). HH 1952 eq. 12.
    pub fn alpha_m(v: f64) -> f64 {
        let vs = v + 40.0;
        if vs.abs() < 1e-4 {
            1.0
        } else {
            0.1 * vs / (1.0 - (-vs / 10.0).exp())
        }
    }

    /// Beta rate for the `m` gate (ms^-1). HH 1952 eq. 13.
    pub fn beta_m(v: f64) -> f64 {
        4.0 * (-(v + 65.0) / 18.0).exp()
    }

    /// Alpha rate for the `h` gate (ms^-1). HH 1952 eq. 14.
    pub fn alpha_h(v: f64) -> f64 {
        0.07 * (-(v + 65.0) / 20.0).exp()
    }

    /// Beta rate for the `h` gate (ms^-1). HH 1952 eq. 15.
    pub fn beta_h(v: f64) -> f64 {
        1.0 / (1.0 + (-(v + 35.0) / 10.0).exp())
    }

    /// Steady-state value of `m` at voltage `v`.
    pub fn m_inf(v: f64) -> f64 {
        let a = Self::alpha_m(v);
        a / (a + Self::beta_m(v))
    }

    /// Time constant of `m` at voltage `v` (ms).
    pub fn tau_m(v: f64) -> f64 {
        1.0 / (Self::alpha_m(v) + Self::beta_m(v))
    }

    /// Steady-state value of `h` at voltage `v`.
    pub fn h_inf(v: f64) -> f64 {
        let a = Self::alpha_h(v);
        a / (a + Self::beta_h(v))
    }

    /// Time constant of `h` at voltage `v` (ms).
    pub fn tau_h(v: f64) -> f64 {
        1.0 / (Self::alpha_h(v) + Self::beta_h(v))
    }

    /// Reset gating to zero, or (if `v0` is given) to steady state at `v0`.
    pub fn init(&mut self, v0: Option<f64>) {
        match v0 {
            Some(v) => {
                self.m = Self::m_inf(v);
                self.h = Self::h_inf(v);
            }
            None => {
                self.m = 0.0;
                self.h = 0.0;
            }
        }
    }

    /// Current gating variables `(m, h)`.
    pub fn gates(&self) -> (f64, f64) {
        (self.m, self.h)
    }

    /// Integrate one step and return the linearized `(g_contrib, i_contrib)`
    /// pair for the compartment's matrix row.
    pub fn f_numstep(&mut self, v: f64, dt: f64) -> (f64, f64) {
        self.m = Self::m_inf(v) + (self.m - Self::m_inf(v)) * (-dt / Self::tau_m(v)).exp();
        self.h = Self::h_inf(v) + (self.h - Self::h_inf(v)) * (-dt / Self::tau_h(v)).exp();

        let g = self.gbar * self.m.powi(3) * self.h;
        (g / 2.0, g * (self.e - v / 2.0))
    }
}

/// Potassium delayed-rectifier channel: single activation gate `n`,
/// `g = gbar * n^4`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KChannel {
    /// Maximal conductance (nS). Zero until configured — inert by default.
    pub gbar: f64,
    /// Reversal potential (mV).
    pub e: f64,
    n: f64,
}

impl KChannel {
    /// Create an inactive potassium channel with the given maximal
    /// conductance and reversal potential.
    pub fn new(gbar: f64, e: f64) -> Self {
        Self { gbar, e, n: 0.0 }
    }

    /// Alpha rate for the `n` gate (ms^-1). HH 1952 eq. 16.
    pub fn alpha_n(v: f64) -> f64 {
        let vs = v + 55.0;
        if vs.abs() < 1e-4 {
            0.1
        } else {
            0.01 * vs / (1.0 - (-vs / 10.0).exp())
        }
    }

    /// Beta rate for the `n` gate (ms^-1). HH 1952 eq. 17.
    pub fn beta_n(v: f64) -> f64 {
        0.125 * (-(v + 65.0) / 80.0).exp()
    }

    /// Steady-state value of `n` at voltage `v`.
    pub fn n_inf(v: f64) -> f64 {
        let a = Self::alpha_n(v);
        a / (a + Self::beta_n(v))
    }

    /// Time constant of `n` at voltage `v` (ms).
    pub fn tau_n(v: f64) -> f64 {
        1.0 / (Self::alpha_n(v) + Self::beta_n(v))
    }

    /// Reset gating to zero, or (if `v0` is given) to steady state at `v0`.
    pub fn init(&mut self, v0: Option<f64>) {
        self.n = match v0 {
            Some(v) => Self::n_inf(v),
            None => 0.0,
        };
    }

    /// Current gating variable `n`.
    pub fn gate(&self) -> f64 {
        self.n
    }

    /// Integrate one step and return the linearized `(g_contrib, i_contrib)`
    /// pair for the compartment's matrix row.
    pub fn f_numstep(&mut self, v: f64, dt: f64) -> (f64, f64) {
        self.n = Self::n_inf(v) + (self.n - Self::n_inf(v)) * (-dt / Self::tau_n(v)).exp();

        let g = self.gbar * self.n.powi(4);
        (g / 2.0, g * (self.e - v / 2.0))
    }
}
