//! # neat-evolver
//!
//! Neuroevolution of variable-topology networks: genomes grow nodes and
//! connections through mutation, and a fixed-size population is driven by
//! fitness-proportionate selection. There is no crossover and no
//! speciation; every child is a mutated clone of one parent.
//!
//! ## Quick Start
//!
//! ```rust
//! use neat_evolver::{NeatConfig, Population};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut config = NeatConfig::minimal(2, 1);
//! config.population.size = 20;
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let mut population = Population::new(config, &mut rng);
//!
//! for _ in 0..5 {
//!     for entity in population.entities_mut() {
//!         let out = entity.evaluate(&[1.0, 0.0]).unwrap_or_default();
//!         entity.fitness = out.first().copied().unwrap_or(0.0);
//!     }
//!     population.advance_generation(&mut rng).unwrap();
//! }
//! assert_eq!(population.generation(), 5);
//! ```
//!
//! ## Architecture
//!
//! ### Genotype
//!
//! A [`Genome`] is an ordered list of [`NodeGene`]s and an ordered list of
//! [`ConnectionGene`]s. Node ids grow monotonically and are never reused.
//! Mutation picks one of three classes per call: split a connection with a
//! new hidden node, add a connection (feed-forward or deliberately
//! recurrent, checked against the current graph), or tune weights and
//! enabled flags.
//!
//! ### Phenotype
//!
//! A [`Network`] is compiled from the enabled genes. Nodes and connections
//! are stored in flat `SlotMap` buffers:
//!
//! - No reference counting overhead
//! - Safe generational indices instead of parent/child pointers
//! - One [`Network::activate`] call moves signals one hop
//!
//! The network depth (longest non-recurrent path to an output) tells the
//! evaluator how many steps carry inputs to the outputs.

pub mod activation;
pub mod config;
pub mod entity;
pub mod gene;
pub mod genome;
pub mod network;
pub mod population;

// Re-exports for convenience
pub use activation::Activation;
pub use config::{
    ConfigError, ConnectionMutationConfig, MutationConfig, NeatConfig, NetworkConfig,
    NodeMutationConfig, PopulationConfig, WeightMutationConfig,
};
pub use entity::Entity;
pub use gene::{ConnectionGene, NodeGene, NodeType, BIAS_ID};
pub use genome::{Genome, GenomeError, MutationOutcome};
pub use network::{Network, NetworkError, BIAS_OUTPUT};
pub use population::{Population, PopulationError};
