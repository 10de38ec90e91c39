//! Per-compartment aggregator of ion channels and synaptic receptors.

use std::cell::RefCell;
use std::rc::Rc;

use crate::channels::{KChannel, NaChannel};
use crate::error::Result;
use crate::receptors::{Receptor, ReceptorKind, ReceptorParams};
use crate::ring_buffer::RingBuffer;

/// A named, sampleable scalar local to one compartment's current bundle.
/// Combined with a compartment index by [`crate::tree::CompTree`] to form a
/// full [`crate::tree::RecordableHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordableField {
    /// Membrane voltage. Always available; not produced by this module but
    /// listed here since `CompTree` builds the full recordable set from
    /// both `Compartment` and `CompartmentCurrents`.
    Voltage,
    NaGateM,
    NaGateH,
    KGateN,
    /// Conductance of the `n`th receptor appended to this compartment
    /// (insertion order across all four kinds combined).
    ReceptorConductance(u32),
}

/// Owns the channel and receptor set of one compartment and sums their
/// linearized `(g, i)` contributions for a step.
#[derive(Clone, Default)]
pub struct CompartmentCurrents {
    na: Option<NaChannel>,
    k: Option<KChannel>,
    ampa: Vec<Receptor>,
    gaba: Vec<Receptor>,
    nmda: Vec<Receptor>,
    ampa_nmda: Vec<Receptor>,
}

impl CompartmentCurrents {
    /// An empty bundle: no channels, no receptors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sodium channel, replacing any previous one.
    pub fn set_na(&mut self, gbar: f64, e: f64) {
        self.na = Some(NaChannel::new(gbar, e));
    }

    /// Attach a potassium channel, replacing any previous one.
    pub fn set_k(&mut self, gbar: f64, e: f64) {
        self.k = Some(KChannel::new(gbar, e));
    }

    /// Construct a receptor of `kind` reading from `spikes` and append it.
    /// Returns its index within its kind's bucket (used to build the
    /// `ReceptorConductance` recordable below).
    pub fn add_synapse(
        &mut self,
        kind: ReceptorKind,
        spikes: Rc<RefCell<RingBuffer>>,
        params: ReceptorParams,
    ) -> Result<usize> {
        let receptor = Receptor::new(kind, spikes, params)?;
        let bucket = self.bucket_mut(kind);
        bucket.push(receptor);
        Ok(bucket.len() - 1)
    }

    fn bucket_mut(&mut self, kind: ReceptorKind) -> &mut Vec<Receptor> {
        match kind {
            ReceptorKind::Ampa => &mut self.ampa,
            ReceptorKind::Gaba => &mut self.gaba,
            ReceptorKind::Nmda => &mut self.nmda,
            ReceptorKind::AmpaNmda => &mut self.ampa_nmda,
        }
    }

    fn receptors(&self) -> impl Iterator<Item = &Receptor> {
        self.ampa
            .iter()
            .chain(self.gaba.iter())
            .chain(self.nmda.iter())
            .chain(self.ampa_nmda.iter())
    }

    fn receptors_mut(&mut self) -> impl Iterator<Item = &mut Receptor> {
        self.ampa
            .iter_mut()
            .chain(self.gaba.iter_mut())
            .chain(self.nmda.iter_mut())
            .chain(self.ampa_nmda.iter_mut())
    }

    /// Reset every channel and receptor to its rest state.
    pub fn init(&mut self, v0: f64) {
        if let Some(na) = &mut self.na {
            na.init(Some(v0));
        }
        if let Some(k) = &mut self.k {
            k.init(Some(v0));
        }
        for r in self.receptors_mut() {
            r.init();
        }
    }

    /// Sum `(g_contrib, i_contrib)` over every channel and receptor.
    pub fn f_numstep(&mut self, v: f64, dt: f64, lag: i64) -> Result<(f64, f64)> {
        let mut gg = 0.0;
        let mut ff = 0.0;

        if let Some(na) = &mut self.na {
            let (g, i) = na.f_numstep(v, dt);
            gg += g;
            ff += i;
        }
        if let Some(k) = &mut self.k {
            let (g, i) = k.f_numstep(v, dt);
            gg += g;
            ff += i;
        }
        for r in self.receptors_mut() {
            let (g, i) = r.f_numstep(v, dt, lag)?;
            gg += g;
            ff += i;
        }

        Ok((gg, ff))
    }

    /// Named recordables local to this bundle (`m_Na`, `h_Na`, `n_K`, and
    /// `g_<n>` for each receptor in insertion order).
    pub fn recordables(&self) -> Vec<(String, RecordableField)> {
        let mut out = Vec::new();
        if self.na.is_some() {
            out.push(("m_Na".to_string(), RecordableField::NaGateM));
            out.push(("h_Na".to_string(), RecordableField::NaGateH));
        }
        if self.k.is_some() {
            out.push(("n_K".to_string(), RecordableField::KGateN));
        }
        for (i, _) in self.receptors().enumerate() {
            out.push((format!("g_{i}"), RecordableField::ReceptorConductance(i as u32)));
        }
        out
    }

    /// Resolve a field produced by this bundle (all but `Voltage`, which
    /// `CompTree` answers directly from the owning compartment).
    pub fn sample(&self, field: RecordableField) -> Option<f64> {
        match field {
            RecordableField::Voltage => None,
            RecordableField::NaGateM => self.na.as_ref().map(|na| na.gates().0),
            RecordableField::NaGateH => self.na.as_ref().map(|na| na.gates().1),
            RecordableField::KGateN => self.k.as_ref().map(|k| k.gate()),
            RecordableField::ReceptorConductance(n) => {
                self.receptors().nth(n as usize).map(Receptor::conductance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf() -> Rc<RefCell<RingBuffer>> {
        Rc::new(RefCell::new(RingBuffer::new(4)))
    }

    #[test]
    fn empty_bundle_is_inert() {
        let mut currents = CompartmentCurrents::new();
        let (g, i) = currents.f_numstep(-65.0, 0.1, 0).unwrap();
        assert_eq!(g, 0.0);
        assert_eq!(i, 0.0);
        assert!(currents.recordables().is_empty());
    }

    #[test]
    fn channels_and_receptors_both_contribute() {
        let mut currents = CompartmentCurrents::new();
        currents.set_na(120.0, 50.0);
        currents.set_k(36.0, -77.0);
        currents
            .add_synapse(ReceptorKind::Ampa, buf(), ReceptorParams::default())
            .unwrap();

        currents.init(-65.0);
        let (g, _i) = currents.f_numstep(-65.0, 0.01, 0).unwrap();
        assert!(g > 0.0);

        let names: Vec<_> = currents.recordables().into_iter().map(|(n, _)| n).collect();
        assert!(names.contains(&"m_Na".to_string()));
        assert!(names.contains(&"h_Na".to_string()));
        assert!(names.contains(&"n_K".to_string()));
        assert!(names.contains(&"g_0".to_string()));
    }

    #[test]
    fn receptor_conductance_recordable_tracks_kernel() {
        let mut currents = CompartmentCurrents::new();
        let spikes = buf();
        currents
            .add_synapse(ReceptorKind::Ampa, spikes.clone(), ReceptorParams::default())
            .unwrap();
        spikes.borrow_mut().add_value(0, 1.0).unwrap();
        currents.f_numstep(0.0, 0.001, 0).unwrap();
        let g = currents
            .sample(RecordableField::ReceptorConductance(0))
            .unwrap();
        assert!(g > 0.0);
    }
}
