//! An O(N) Hines-style solver for compartmental neuron models.
//!
//! A neuron is a rooted tree of electrically coupled [`Compartment`]s, each
//! a small patch of membrane with its own capacitance, leak, axial coupling
//! to its parent, and a pluggable set of active currents (voltage-gated ion
//! [channels](channels) and synaptic [receptors](receptors) driven by
//! delayed spike [ring buffers](ring_buffer)). Every tick, [`CompTree`]
//! assembles a tridiagonal system from all compartments under implicit
//! (Crank-Nicolson) integration and solves it in two linear passes instead
//! of a general `O(N^3)` dense solve.
//!
//! [`Node`] is the thin façade a host simulator drives: configure the tree,
//! deliver spike and current events, then call [`Node::tick`] to advance
//! and collect emitted spike timestamps.
//!
//! # Example
//!
//! A single passive compartment relaxing to its leak reversal potential:
//!
//! ```
//! use compartmental_tree::{CompartmentParams, Node};
//!
//! let mut node = Node::new(0.1, 0.0, 8);
//! node.add_compartment(
//!     0,
//!     -1,
//!     CompartmentParams {
//!         c_m: 1.0,
//!         g_c: 0.0,
//!         g_l: 0.1,
//!         e_l: -70.0,
//!     },
//! )
//! .unwrap();
//!
//! let spikes = node.tick(0, 0, 8).unwrap();
//! assert!(spikes.is_empty());
//! assert!((node.root_voltage().unwrap() - (-70.0)).abs() < 1e-9);
//! ```

pub mod channels;
pub mod compartment;
pub mod currents;
pub mod error;
pub mod node;
pub mod receptors;
pub mod ring_buffer;
pub mod tree;

pub use compartment::{CompartmentIndex, CompartmentParams};
pub use currents::{CompartmentCurrents, RecordableField};
pub use error::{CmError, Result};
pub use node::Node;
pub use receptors::{Receptor, ReceptorKind, ReceptorParams};
pub use ring_buffer::RingBuffer;
pub use tree::{CompTree, RecordableHandle};
