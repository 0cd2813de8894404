//! Mesh-current analysis over a fundamental cycle basis.
//!
//! With the edge law `u(src) - u(tgt) = Z·(J + I) - E` and edge currents
//! `J = Kᵗ·x`, Kirchhoff's voltage law around every basis cycle gives
//!
//! ```text
//! K·Z·Kᵗ · x = K·(E - Z·I)
//! ```
//!
//! The mesh matrix `A = K·Z·Kᵗ` only depends on topology and impedances, so it
//! is factorized once per assembly and reused while only the sources change.

use nalgebra::{DMatrix, DVector, Dyn, LU};
use tp_core::{Phasor, Sentinels};
use tp_graph::{CycleBasis, Graph};

use crate::error::{SolverError, SolverResult};

/// Assembled matrices of one zone.
#[derive(Debug, Clone)]
pub struct MeshSystem<T: Phasor> {
    /// Edge impedances with mutual couplings off the diagonal.
    z: DMatrix<T>,
    /// Cycle incidence, one row per cycle.
    k: DMatrix<T>,
    injected: DVector<T>,
    emf: DVector<T>,
    lu: LU<T, Dyn, Dyn>,
}

/// Edge currents and voltage drops of one solve.
#[derive(Debug, Clone)]
pub struct MeshSolution<T: Phasor> {
    pub mesh: DVector<T>,
    pub currents: DVector<T>,
    pub drops: DVector<T>,
}

impl<T: Phasor> MeshSystem<T> {
    /// Assemble `Z`, `K`, `I`, `E` and factorize `A`.
    ///
    /// The graph must be dense; `zone` only labels errors.
    pub fn new(graph: &Graph<T>, basis: &CycleBasis, zone: &str) -> SolverResult<Self> {
        if !graph.is_dense() {
            return Err(tp_graph::GraphError::NotDense.into());
        }
        let m = graph.edge_count();
        let c = basis.len();

        let mut z = DMatrix::<T>::zeros(m, m);
        for e in graph.edges() {
            z[(e.id.slot(), e.id.slot())] = e.impedance;
        }
        for coupling in graph.couplings() {
            let (a, b) = (coupling.a.slot(), coupling.b.slot());
            z[(a, b)] += coupling.value;
            z[(b, a)] += coupling.value;
        }

        let mut k = DMatrix::<T>::zeros(c, m);
        for (row, cycle) in basis.iter().enumerate() {
            for (edge, orientation) in &cycle.edges {
                k[(row, edge.slot())] += T::from_parts(orientation.sign(), 0.0);
            }
        }

        let a = &k * &z * k.transpose();
        let lu = a.lu();
        if !lu.is_invertible() {
            return Err(SolverError::Singular {
                zone: zone.to_string(),
            });
        }
        tracing::trace!(zone, edges = m, cycles = c, "mesh matrix factorized");

        let mut system = Self {
            z,
            k,
            injected: DVector::zeros(m),
            emf: DVector::zeros(m),
            lu,
        };
        system.load_sources(graph);
        Ok(system)
    }

    /// Re-read injected currents and EMFs; impedances must be unchanged.
    pub fn load_sources(&mut self, graph: &Graph<T>) {
        for e in graph.edges() {
            let i = e.id.slot();
            if i < self.injected.len() {
                self.injected[i] = e.injected;
                self.emf[i] = e.emf;
            }
        }
    }

    pub fn cycles(&self) -> usize {
        self.k.nrows()
    }

    pub fn edges(&self) -> usize {
        self.z.nrows()
    }

    /// Solve for mesh currents, edge currents and voltage drops.
    pub fn solve(&self, zone: &str) -> SolverResult<MeshSolution<T>> {
        let rhs = &self.k * (&self.emf - &self.z * &self.injected);
        let mesh = self.lu.solve(&rhs).ok_or_else(|| SolverError::Singular {
            zone: zone.to_string(),
        })?;
        if mesh.iter().any(|v| !v.is_finite_value()) {
            return Err(SolverError::Numeric {
                what: format!("non-finite mesh current in zone {zone}"),
            });
        }
        let currents = self.k.transpose() * &mesh;
        let drops = &self.z * (&currents + &self.injected);
        Ok(MeshSolution {
            mesh,
            currents,
            drops,
        })
    }
}

/// Write edge currents and propagate node potentials from the ground node.
///
/// Traverses depth-first over edges that are not disconnected, setting
/// `u(tgt) = u(src) - (dU - E)` along each edge. Nodes reachable only
/// through open edges keep a zero potential.
pub fn apply_solution<T: Phasor>(
    graph: &mut Graph<T>,
    solution: &MeshSolution<T>,
    sentinels: &Sentinels,
) -> SolverResult<()> {
    for e in graph.edges_mut() {
        e.current = solution.currents[e.id.slot()];
    }

    let ground = graph.ground().ok_or_else(|| SolverError::Topology {
        what: "zone has no ground node".into(),
    })?;
    let adjacency = graph.adjacency();
    let mut potential: Vec<Option<T>> = vec![None; adjacency.len()];
    potential[ground.slot()] = Some(T::nil());
    let mut stack = vec![ground];
    while let Some(v) = stack.pop() {
        let Some(u) = potential[v.slot()] else {
            continue;
        };
        for &(id, outgoing) in &adjacency[v.slot()] {
            let Some(edge) = graph.edge(id) else { continue };
            if sentinels.is_disconnected(edge.impedance.modulus()) {
                continue;
            }
            let rise = solution.drops[id.slot()] - edge.emf;
            let (other, value) = if outgoing {
                (edge.target, u - rise)
            } else {
                (edge.source, u + rise)
            };
            if potential[other.slot()].is_none() {
                potential[other.slot()] = Some(value);
                stack.push(other);
            }
        }
    }

    for node in graph.nodes_mut() {
        node.potential = potential[node.id.slot()].unwrap_or_else(T::nil);
        if !node.potential.is_finite_value() {
            return Err(SolverError::Numeric {
                what: format!("non-finite potential at node '{}'", node.label),
            });
        }
    }
    Ok(())
}
