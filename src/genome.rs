//! Genomes and their mutation operators.
//!
//! A [`Genome`] is two ordered lists: node genes in creation order and
//! connection genes in creation order. Node ids are assigned as
//! `max(id) + 1`, so they are never reused within a lineage.
//!
//! Settings are not stored in the genome. Every mutation takes the
//! [`NeatConfig`] and the random source explicitly, which keeps genomes
//! plain values: `clone()` yields a fully independent copy.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{MutationConfig, NeatConfig, NodeMutationConfig, WeightMutationConfig};
use crate::gene::{ConnectionGene, NodeGene, NodeType, BIAS_ID};
use crate::network::Network;

/// Half-width of the uniform range for generation-0 weights.
pub const INITIAL_WEIGHT_RANGE: f32 = 5.0;

/// Chance that the order-biased split scan stops at each eligible gene.
const SPLIT_STOP_PROB: f32 = 0.7;

/// Errors raised when a genome breaks its structural invariants.
#[derive(Debug, thiserror::Error)]
pub enum GenomeError {
    #[error("genome must contain exactly one bias node, with id 0")]
    InvalidBias,

    #[error("node id {0} is used more than once")]
    DuplicateNodeId(u32),

    #[error("connection refers to unknown node {0}")]
    UnknownNode(u32),

    #[error("connection records node {id} as {recorded:?} but the genome has it as {actual:?}")]
    NodeTypeMismatch {
        id: u32,
        recorded: NodeType,
        actual: NodeType,
    },

    #[error("connection {input} -> {output} targets a bias or input node")]
    ConnectionIntoSensor { input: u32, output: u32 },

    #[error("connection {input} -> {output} already exists")]
    DuplicateConnection { input: u32, output: u32 },

    #[error("genome (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a call to [`Genome::mutate`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// A connection was split by a new hidden node.
    NodeAdded {
        node: NodeGene,
        /// `(source id, target id)` of the gene that was disabled.
        split: (u32, u32),
    },
    /// A new connection gene was appended.
    ConnectionAdded {
        input: u32,
        output: u32,
        recurrent: bool,
    },
    /// The weight / re-enable / toggle bundle ran.
    Tuned {
        weights_perturbed: bool,
        /// Index of the gene that was re-enabled.
        reenabled: Option<usize>,
        /// Index of the gene whose `enabled` flag flipped.
        toggled: Option<usize>,
    },
    /// A structural mutation was chosen but found no valid candidate.
    Exhausted,
}

/// A genome: node genes plus connection genes, both in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Node genes in creation order. The bias node (id 0) comes first.
    pub nodes: Vec<NodeGene>,
    /// Connection genes in creation order.
    pub connections: Vec<ConnectionGene>,
}

impl Genome {
    /// Create a genome with a bias node, `inputs` input nodes and `outputs`
    /// output nodes, and no connections.
    ///
    /// Ids: bias is 0, inputs are `1..=inputs`, outputs follow.
    #[must_use]
    pub fn minimal(inputs: usize, outputs: usize) -> Self {
        let mut nodes = Vec::with_capacity(1 + inputs + outputs);
        nodes.push(NodeGene::bias());

        let mut id = BIAS_ID;
        for _ in 0..inputs {
            id += 1;
            nodes.push(NodeGene::input(id));
        }
        for _ in 0..outputs {
            id += 1;
            nodes.push(NodeGene::output(id));
        }

        Self {
            nodes,
            connections: Vec::new(),
        }
    }

    /// Create a generation-0 genome.
    ///
    /// Starts from [`minimal`](Self::minimal) and connects every bias/input
    /// node to every output node with probability
    /// `network.initial_connectivity`, using weights uniform in
    /// `[-5, 5]`.
    #[must_use]
    pub fn initial<R: Rng>(config: &NeatConfig, rng: &mut R) -> Self {
        let mut genome = Self::minimal(config.network.inputs, config.network.outputs);
        let connectivity = config.network.initial_connectivity;

        for &source in genome.nodes.iter().filter(|n| n.node_type != NodeType::Output) {
            for &target in genome.nodes.iter().filter(|n| !n.node_type.is_sensor()) {
                if rng.random::<f32>() >= connectivity {
                    continue;
                }
                let weight = random_weight(rng, INITIAL_WEIGHT_RANGE);
                genome
                    .connections
                    .push(ConnectionGene::new(source, target, weight, false));
            }
        }

        genome
    }

    /// Assemble a genome from parts, checking its invariants.
    ///
    /// # Errors
    ///
    /// See [`validate`](Self::validate).
    pub fn from_parts(
        nodes: Vec<NodeGene>,
        connections: Vec<ConnectionGene>,
    ) -> Result<Self, GenomeError> {
        let genome = Self { nodes, connections };
        genome.validate()?;
        Ok(genome)
    }

    /// Check the structural invariants.
    ///
    /// # Errors
    ///
    /// - [`GenomeError::InvalidBias`] unless there is exactly one bias node and it has id 0
    /// - [`GenomeError::DuplicateNodeId`] if two node genes share an id
    /// - [`GenomeError::UnknownNode`] / [`GenomeError::NodeTypeMismatch`] if a
    ///   connection endpoint is missing or recorded with another type
    /// - [`GenomeError::ConnectionIntoSensor`] if a connection targets a bias or input node
    /// - [`GenomeError::DuplicateConnection`] if two genes join the same pair
    pub fn validate(&self) -> Result<(), GenomeError> {
        let mut biases = self.nodes.iter().filter(|n| n.node_type == NodeType::Bias);
        match (biases.next(), biases.next()) {
            (Some(bias), None) if bias.id == BIAS_ID => {}
            _ => return Err(GenomeError::InvalidBias),
        }

        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(GenomeError::DuplicateNodeId(node.id));
            }
        }

        let mut pairs = HashSet::with_capacity(self.connections.len());
        for gene in &self.connections {
            for endpoint in [gene.input, gene.output] {
                let actual = self
                    .node(endpoint.id)
                    .ok_or(GenomeError::UnknownNode(endpoint.id))?;
                if actual.node_type != endpoint.node_type {
                    return Err(GenomeError::NodeTypeMismatch {
                        id: endpoint.id,
                        recorded: endpoint.node_type,
                        actual: actual.node_type,
                    });
                }
            }

            let (input, output) = gene.key();
            if gene.output.node_type.is_sensor() {
                return Err(GenomeError::ConnectionIntoSensor { input, output });
            }
            if !pairs.insert((input, output)) {
                return Err(GenomeError::DuplicateConnection { input, output });
            }
        }

        Ok(())
    }

    /// Node genes in creation order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeGene] {
        &self.nodes
    }

    /// Connection genes in creation order.
    #[must_use]
    pub fn connections(&self) -> &[ConnectionGene] {
        &self.connections
    }

    /// Mutable access to the connection genes, e.g. to pin weights from outside.
    pub fn connections_mut(&mut self) -> &mut [ConnectionGene] {
        &mut self.connections
    }

    /// Look up a node gene by id.
    #[must_use]
    pub fn node(&self, id: u32) -> Option<&NodeGene> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The id the next new node will receive.
    #[must_use]
    pub fn next_node_id(&self) -> u32 {
        self.nodes.iter().map(|n| n.id).max().map_or(BIAS_ID, |max| max + 1)
    }

    /// Whether any gene, enabled or not, joins `input -> output`.
    #[must_use]
    pub fn contains_connection(&self, input: u32, output: u32) -> bool {
        self.connections.iter().any(|g| g.key() == (input, output))
    }

    /// Get the number of enabled connections.
    #[must_use]
    pub fn num_enabled_connections(&self) -> usize {
        self.connections.iter().filter(|c| c.enabled).count()
    }

    /// Ids of all nodes of the given type, in creation order.
    #[must_use]
    pub fn ids_of(&self, node_type: NodeType) -> Vec<u32> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == node_type)
            .map(|n| n.id)
            .collect()
    }

    /// Get all hidden node ids.
    #[must_use]
    pub fn hidden_ids(&self) -> Vec<u32> {
        self.ids_of(NodeType::Hidden)
    }

    /// Append an enabled connection between two existing nodes.
    ///
    /// Returns the index of the new gene.
    ///
    /// # Errors
    ///
    /// Fails if either node is unknown, the target is a bias/input node, or
    /// the pair is already connected.
    pub fn connect(
        &mut self,
        input: u32,
        output: u32,
        weight: f32,
        recurrent: bool,
    ) -> Result<usize, GenomeError> {
        let source = *self.node(input).ok_or(GenomeError::UnknownNode(input))?;
        let target = *self.node(output).ok_or(GenomeError::UnknownNode(output))?;
        if target.node_type.is_sensor() {
            return Err(GenomeError::ConnectionIntoSensor { input, output });
        }
        if self.contains_connection(input, output) {
            return Err(GenomeError::DuplicateConnection { input, output });
        }

        self.connections
            .push(ConnectionGene::new(source, target, weight, recurrent));
        Ok(self.connections.len() - 1)
    }

    /// Split the connection at `index` with a new hidden node.
    ///
    /// The original gene is disabled, and two new genes are appended:
    /// `input -> new` with weight 1.0 (keeping the original's recurrent flag)
    /// and `new -> output` with the original weight.
    ///
    /// Returns `None` if the index is out of range or the gene is disabled.
    pub fn add_node(&mut self, index: usize) -> Option<NodeGene> {
        let id = self.next_node_id();
        let gene = self.connections.get_mut(index)?;
        if !gene.enabled {
            return None;
        }

        gene.enabled = false;
        let (input, output, weight, recurrent) = (gene.input, gene.output, gene.weight, gene.recurrent);

        let node = NodeGene::hidden(id);
        self.nodes.push(node);
        self.connections
            .push(ConnectionGene::new(input, node, 1.0, recurrent));
        self.connections
            .push(ConnectionGene::new(node, output, weight, false));

        Some(node)
    }

    /// Apply exactly one mutation class.
    ///
    /// With probability `mutation.node.probability` a connection is split;
    /// otherwise with probability `mutation.connection.probability` a new
    /// connection is added; otherwise the weight / re-enable / toggle
    /// bundle runs. Structural mutations that find no candidate leave the
    /// genome untouched and report [`MutationOutcome::Exhausted`].
    pub fn mutate<R: Rng>(&mut self, config: &NeatConfig, rng: &mut R) -> MutationOutcome {
        let mutation = &config.mutation;

        let outcome = if rng.random::<f32>() < mutation.node.probability {
            self.mutate_add_node(&mutation.node, rng)
        } else if rng.random::<f32>() < mutation.connection.probability {
            self.mutate_add_connection(config, rng)
        } else {
            self.mutate_bundle(mutation, rng)
        };

        log::trace!("mutation: {outcome:?}");
        outcome
    }

    /// Try to add a node by splitting an eligible connection.
    ///
    /// Eligible genes are enabled and do not leave the bias node (splitting
    /// those would move the bias away from its target).
    fn mutate_add_node<R: Rng>(&mut self, config: &NodeMutationConfig, rng: &mut R) -> MutationOutcome {
        if self.connections.is_empty() {
            return MutationOutcome::Exhausted;
        }

        let chosen = if config.random {
            self.pick_split_uniform(config.random_tries, rng)
        } else {
            self.pick_split_oldest(rng)
        };

        let Some(index) = chosen else {
            return MutationOutcome::Exhausted;
        };
        let split = self.connections[index].key();
        match self.add_node(index) {
            Some(node) => MutationOutcome::NodeAdded { node, split },
            None => MutationOutcome::Exhausted,
        }
    }

    fn pick_split_uniform<R: Rng>(&self, tries: usize, rng: &mut R) -> Option<usize> {
        let len = self.connections.len();
        (0..tries)
            .map(|_| rng.random_range(0..len))
            .find(|&i| is_splittable(&self.connections[i]))
    }

    /// Scan genes oldest first, stopping at each eligible one with
    /// probability 0.7, so older structure is split far more often than
    /// newer structure. Falls back to the last eligible gene.
    fn pick_split_oldest<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        let mut chosen = None;
        for (i, gene) in self.connections.iter().enumerate() {
            if !is_splittable(gene) {
                continue;
            }
            chosen = Some(i);
            if rng.random::<f32>() < SPLIT_STOP_PROB {
                break;
            }
        }
        chosen
    }

    /// Try to add a random new connection.
    ///
    /// The new edge is required to be recurrent with probability
    /// `connection.recurrent_prob`. Candidates that duplicate an existing
    /// gene, even a disabled one, or whose recurrency disagrees with that
    /// requirement are redrawn, up to `connection.tries` times.
    fn mutate_add_connection<R: Rng>(&mut self, config: &NeatConfig, rng: &mut R) -> MutationOutcome {
        let settings = &config.mutation.connection;
        let network = Network::from_genome(self, &config.network);
        let do_recur = rng.random::<f32>() < settings.recurrent_prob;

        // Outputs without inputs can never carry a signal forward.
        let sources: Vec<NodeGene> = self
            .nodes
            .iter()
            .filter(|n| {
                if do_recur {
                    !n.node_type.is_sensor()
                } else {
                    n.node_type != NodeType::Output || network.has_incoming(n.id)
                }
            })
            .copied()
            .collect();
        let targets: Vec<NodeGene> = self
            .nodes
            .iter()
            .filter(|n| !n.node_type.is_sensor())
            .copied()
            .collect();

        if sources.is_empty() || targets.is_empty() {
            return MutationOutcome::Exhausted;
        }

        let threshold = self.nodes.len() * self.nodes.len();
        for _ in 0..settings.tries {
            let source = sources[rng.random_range(0..sources.len())];
            let target = targets[rng.random_range(0..targets.len())];

            if self.contains_connection(source.id, target.id) {
                continue;
            }
            if network.is_recurrent(source, target, threshold) != do_recur {
                continue;
            }

            let weight = random_weight(rng, config.mutation.weight.power);
            self.connections
                .push(ConnectionGene::new(source, target, weight, do_recur));
            return MutationOutcome::ConnectionAdded {
                input: source.id,
                output: target.id,
                recurrent: do_recur,
            };
        }

        MutationOutcome::Exhausted
    }

    fn mutate_bundle<R: Rng>(&mut self, config: &MutationConfig, rng: &mut R) -> MutationOutcome {
        let weights_perturbed = rng.random::<f32>() < config.weight.probability;
        if weights_perturbed {
            self.mutate_weights(&config.weight, rng);
        }

        let reenabled = if rng.random::<f32>() < config.connection.reenable_prob {
            self.reenable_oldest()
        } else {
            None
        };

        let toggled = if !self.connections.is_empty()
            && rng.random::<f32>() < config.connection.toggle_enable_prob
        {
            let index = rng.random_range(0..self.connections.len());
            self.toggle(index).then_some(index)
        } else {
            None
        };

        MutationOutcome::Tuned {
            weights_perturbed,
            reenabled,
            toggled,
        }
    }

    /// Mutate weights of all connections.
    ///
    /// A `cap` that is not positive and finite (possible when the config
    /// was never sanitized) is replaced by the default cap.
    fn mutate_weights<R: Rng>(&mut self, config: &WeightMutationConfig, rng: &mut R) {
        let cap = if config.cap.is_finite() && config.cap > 0.0 {
            config.cap
        } else {
            WeightMutationConfig::default().cap
        };
        for gene in &mut self.connections {
            if rng.random::<f32>() < config.randomize_prob {
                gene.weight = random_weight(rng, config.power);
            } else {
                gene.weight += random_weight(rng, config.power);
            }
            gene.weight = gene.weight.clamp(-cap, cap);
        }
    }

    /// Enable the lowest-index disabled gene, if any.
    fn reenable_oldest(&mut self) -> Option<usize> {
        let index = self.connections.iter().position(|g| !g.enabled)?;
        self.connections[index].enabled = true;
        Some(index)
    }

    /// Flip the `enabled` flag of the gene at `index`.
    ///
    /// Enabling always succeeds. Disabling is refused unless another enabled
    /// gene leaves the same source for a different target and another
    /// enabled gene enters the same target from a different source, so the
    /// toggle cannot cut a node off from one side. Returns whether the flag
    /// changed.
    pub fn toggle(&mut self, index: usize) -> bool {
        let Some(gene) = self.connections.get(index) else {
            return false;
        };
        if !gene.enabled {
            self.connections[index].enabled = true;
            return true;
        }

        let (input, output) = gene.key();
        let others = || {
            self.connections
                .iter()
                .enumerate()
                .filter(move |&(i, g)| i != index && g.enabled)
                .map(|(_, g)| g.key())
        };
        let source_shared = others().any(|(i, o)| i == input && o != output);
        let target_shared = others().any(|(i, o)| o == output && i != input);

        if source_shared && target_shared {
            self.connections[index].enabled = false;
            true
        } else {
            false
        }
    }

    /// Serialize the structure (node list and connection list) to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String, GenomeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a genome exported by [`to_json`](Self::to_json) and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::Serialization`] for malformed JSON, or any
    /// error from [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, GenomeError> {
        let genome: Self = serde_json::from_str(json)?;
        genome.validate()?;
        Ok(genome)
    }
}

#[inline]
fn is_splittable(gene: &ConnectionGene) -> bool {
    gene.enabled && gene.input.node_type != NodeType::Bias
}

/// Uniform in `[-range, range)`.
#[inline]
fn random_weight<R: Rng>(rng: &mut R, range: f32) -> f32 {
    (rng.random::<f32>() * 2.0 - 1.0) * range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    /// Only the named mutation class can fire.
    fn only(node: f32, connection: f32) -> NeatConfig {
        let mut config = NeatConfig::minimal(2, 1);
        config.mutation.node.probability = node;
        config.mutation.connection.probability = connection;
        config
    }

    #[test]
    fn test_minimal_genome() {
        let genome = Genome::minimal(3, 2);

        assert_eq!(genome.nodes.len(), 6);
        assert_eq!(genome.nodes[0], NodeGene::bias());
        assert_eq!(genome.ids_of(NodeType::Input), vec![1, 2, 3]);
        assert_eq!(genome.ids_of(NodeType::Output), vec![4, 5]);
        assert!(genome.connections.is_empty());
        assert_eq!(genome.next_node_id(), 6);
        assert!(genome.validate().is_ok());
    }

    #[test]
    fn test_initial_genome_fully_connected() {
        let config = NeatConfig::minimal(2, 2);
        let mut rng = test_rng();
        let genome = Genome::initial(&config, &mut rng);

        // (bias + 2 inputs) * 2 outputs
        assert_eq!(genome.connections.len(), 6);
        for gene in &genome.connections {
            assert!(gene.enabled);
            assert!(!gene.recurrent);
            assert!(gene.weight.abs() <= INITIAL_WEIGHT_RANGE);
            assert_eq!(gene.output.node_type, NodeType::Output);
        }
        assert!(genome.validate().is_ok());
    }

    #[test]
    fn test_initial_genome_respects_connectivity() {
        let mut config = NeatConfig::minimal(4, 3);
        config.network.initial_connectivity = 0.0;
        let mut rng = test_rng();
        assert!(Genome::initial(&config, &mut rng).connections.is_empty());

        config.network.initial_connectivity = 0.5;
        let genome = Genome::initial(&config, &mut rng);
        assert!(genome.connections.len() < 15);
    }

    #[test]
    fn test_connect_rejects_invalid_pairs() {
        let mut genome = Genome::minimal(2, 1);

        assert_eq!(genome.connect(1, 3, 0.5, false).unwrap(), 0);
        assert!(matches!(
            genome.connect(1, 3, 0.5, false),
            Err(GenomeError::DuplicateConnection { input: 1, output: 3 })
        ));
        assert!(matches!(
            genome.connect(3, 0, 0.5, false),
            Err(GenomeError::ConnectionIntoSensor { .. })
        ));
        assert!(matches!(
            genome.connect(9, 3, 0.5, false),
            Err(GenomeError::UnknownNode(9))
        ));
    }

    #[test]
    fn test_add_node_splits_connection() {
        let mut genome = Genome::minimal(1, 1);
        genome.connect(1, 2, -0.75, true).unwrap();

        let node = genome.add_node(0).unwrap();

        assert_eq!(node, NodeGene::hidden(3));
        assert_eq!(genome.nodes.len(), 4);
        assert_eq!(genome.connections.len(), 3);
        assert!(!genome.connections[0].enabled);

        let first = &genome.connections[1];
        assert_eq!(first.key(), (1, 3));
        assert_eq!(first.weight, 1.0);
        assert!(first.recurrent);
        assert!(first.enabled);

        let second = &genome.connections[2];
        assert_eq!(second.key(), (3, 2));
        assert_eq!(second.weight, -0.75);
        assert!(!second.recurrent);
        assert!(second.enabled);

        // disabled genes cannot be split again
        assert!(genome.add_node(0).is_none());
        assert!(genome.add_node(99).is_none());
    }

    #[test]
    fn test_node_ids_are_never_reused() {
        let config = NeatConfig::minimal(2, 1);
        let mut rng = test_rng();
        let mut genome = Genome::initial(&config, &mut rng);

        let a = genome.add_node(1).unwrap();
        let b = genome.add_node(genome.connections.len() - 1).unwrap();
        assert_eq!(a.id, 4);
        assert_eq!(b.id, 5);
    }

    #[test]
    fn test_mutate_add_node_skips_bias_genes() {
        let config = only(1.0, 0.0);
        let mut genome = Genome::minimal(1, 1);
        genome.connect(0, 2, 1.0, false).unwrap();

        let mut rng = test_rng();
        assert_eq!(genome.mutate(&config, &mut rng), MutationOutcome::Exhausted);
        assert_eq!(genome.connections.len(), 1);

        genome.connect(1, 2, 1.0, false).unwrap();
        let outcome = genome.mutate(&config, &mut rng);
        assert!(matches!(outcome, MutationOutcome::NodeAdded { split: (1, 2), .. }));
    }

    #[test]
    fn test_mutate_add_node_on_empty_genome_is_noop() {
        let config = only(1.0, 0.0);
        let mut genome = Genome::minimal(2, 1);
        let mut rng = test_rng();

        assert_eq!(genome.mutate(&config, &mut rng), MutationOutcome::Exhausted);
        assert_eq!(genome, Genome::minimal(2, 1));
    }

    #[test]
    fn test_mutate_add_node_random_selection() {
        let mut config = only(1.0, 0.0);
        config.mutation.node.random = true;
        config.mutation.node.random_tries = 50;
        let mut rng = test_rng();
        let mut genome = Genome::initial(&config, &mut rng);

        let outcome = genome.mutate(&config, &mut rng);
        let MutationOutcome::NodeAdded { split, .. } = outcome else {
            panic!("expected a split, got {outcome:?}");
        };
        assert_ne!(split.0, BIAS_ID);
    }

    #[test]
    fn test_oldest_genes_are_split_more_often() {
        let config = only(1.0, 0.0);
        let mut rng = test_rng();
        let base = Genome::initial(&NeatConfig::minimal(4, 1), &mut rng);
        // genes 1..=4 are input -> output, gene 0 leaves the bias
        let mut first = 0;
        let mut last = 0;
        for _ in 0..500 {
            let mut genome = base.clone();
            match genome.mutate(&config, &mut rng) {
                MutationOutcome::NodeAdded { split: (1, _), .. } => first += 1,
                MutationOutcome::NodeAdded { split: (4, _), .. } => last += 1,
                _ => {}
            }
        }
        assert!(first > last * 5, "first={first} last={last}");
    }

    #[test]
    fn test_mutate_add_connection_feed_forward() {
        let config = only(0.0, 1.0);
        let mut rng = test_rng();
        let mut genome = Genome::minimal(2, 1);
        genome.connect(1, 3, 1.0, false).unwrap();
        genome.add_node(0).unwrap();

        for _ in 0..20 {
            if let MutationOutcome::ConnectionAdded { input, output, recurrent } =
                genome.mutate(&config, &mut rng)
            {
                assert!(!recurrent);
                let target = genome.node(output).unwrap();
                assert!(!target.node_type.is_sensor());
                assert_ne!(input, output);
            }
        }
        assert!(genome.validate().is_ok());

        let mut network = Network::from_genome(&genome, &config.network);
        assert!(network.calculate_depth().is_some());
    }

    #[test]
    fn test_mutate_add_connection_recurrent() {
        let mut config = only(0.0, 1.0);
        config.mutation.connection.recurrent_prob = 1.0;
        let mut rng = test_rng();
        let mut genome = Genome::minimal(1, 1);
        genome.connect(1, 2, 1.0, false).unwrap();
        genome.add_node(0).unwrap();

        let outcome = genome.mutate(&config, &mut rng);
        let MutationOutcome::ConnectionAdded { input, output, recurrent } = outcome else {
            panic!("expected a recurrent connection, got {outcome:?}");
        };
        assert!(recurrent);
        let source = genome.node(input).unwrap();
        assert!(!source.node_type.is_sensor());

        let gene = genome.connections.last().unwrap();
        assert_eq!(gene.key(), (input, output));
        assert!(gene.recurrent);
    }

    #[test]
    fn test_mutate_add_connection_never_duplicates_disabled_gene() {
        let mut config = only(0.0, 1.0);
        config.mutation.connection.tries = 100;
        let mut rng = test_rng();
        let mut genome = Genome::minimal(1, 1);
        genome.connect(0, 2, 1.0, false).unwrap();
        genome.connect(1, 2, 1.0, false).unwrap();
        genome.connections[1].enabled = false;

        // 2 -> 2 is a cycle and 1 -> 2 exists, disabled
        for _ in 0..10 {
            assert_eq!(genome.mutate(&config, &mut rng), MutationOutcome::Exhausted);
        }
        assert_eq!(genome.connections.len(), 2);
        assert!(!genome.connections[1].enabled);
    }

    #[test]
    fn test_weight_mutation_respects_cap() {
        let mut config = only(0.0, 0.0);
        config.mutation.weight.probability = 1.0;
        config.mutation.weight.power = 100.0;
        config.mutation.weight.cap = 3.0;
        config.mutation.connection.reenable_prob = 0.0;
        config.mutation.connection.toggle_enable_prob = 0.0;
        let mut rng = test_rng();
        let mut genome = Genome::initial(&config, &mut rng);
        let before = genome.clone();

        let outcome = genome.mutate(&config, &mut rng);
        assert_eq!(
            outcome,
            MutationOutcome::Tuned {
                weights_perturbed: true,
                reenabled: None,
                toggled: None
            }
        );
        for (gene, old) in genome.connections.iter().zip(&before.connections) {
            assert!(gene.weight.abs() <= 3.0);
            assert_ne!(gene.weight, old.weight);
        }
    }

    #[test]
    fn test_weight_mutation_tolerates_invalid_cap() {
        for cap in [-1.0, f32::NAN, 0.0] {
            let mut config = only(0.0, 0.0);
            config.mutation.weight.probability = 1.0;
            config.mutation.weight.cap = cap;
            let mut rng = test_rng();
            let mut genome = Genome::initial(&config, &mut rng);

            for _ in 0..10 {
                genome.mutate(&config, &mut rng);
            }
            let default_cap = WeightMutationConfig::default().cap;
            for gene in &genome.connections {
                assert!(gene.weight.abs() <= default_cap, "cap {cap}: {}", gene.weight);
            }
        }
    }

    #[test]
    fn test_reenable_picks_oldest_disabled_gene() {
        let mut config = only(0.0, 0.0);
        config.mutation.weight.probability = 0.0;
        config.mutation.connection.reenable_prob = 1.0;
        config.mutation.connection.toggle_enable_prob = 0.0;
        let mut rng = test_rng();
        let mut genome = Genome::initial(&config, &mut rng);
        genome.connections[1].enabled = false;
        genome.connections[2].enabled = false;

        let outcome = genome.mutate(&config, &mut rng);
        assert!(matches!(outcome, MutationOutcome::Tuned { reenabled: Some(1), .. }));
        assert!(genome.connections[1].enabled);
        assert!(!genome.connections[2].enabled);
    }

    #[test]
    fn test_toggle_safety_rule() {
        // 1 -> 3, 2 -> 3, 1 -> 4, 0 -> 4 with outputs 3 and 4
        let mut genome = Genome::minimal(2, 2);
        genome.connect(1, 3, 1.0, false).unwrap();
        genome.connect(2, 3, 1.0, false).unwrap();
        genome.connect(1, 4, 1.0, false).unwrap();
        genome.connect(0, 4, 1.0, false).unwrap();

        // 2 -> 3: node 2 has no other outgoing edge
        assert!(!genome.toggle(1));
        assert!(genome.connections[1].enabled);

        // 1 -> 3: 1 also feeds 4, and 3 is also fed by 2
        assert!(genome.toggle(0));
        assert!(!genome.connections[0].enabled);

        // 1 -> 4 now has no sibling out of 1
        assert!(!genome.toggle(2));

        // enabling has no restriction
        assert!(genome.toggle(0));
        assert!(genome.connections[0].enabled);
    }

    #[test]
    fn test_clone_is_independent() {
        let config = NeatConfig::minimal(3, 2);
        let mut rng = test_rng();
        let mut genome = Genome::initial(&config, &mut rng);
        genome.add_node(2);

        let mut copy = genome.clone();
        assert_eq!(copy, genome);

        copy.connections[0].weight += 1.0;
        copy.connections[1].enabled = false;
        copy.add_node(0);
        assert_ne!(copy.connections[0].weight, genome.connections[0].weight);
        assert!(genome.connections[1].enabled);
        assert_eq!(genome.nodes.len(), 7);
    }

    #[test]
    fn test_json_round_trip() {
        let config = NeatConfig::minimal(2, 1);
        let mut rng = test_rng();
        let mut genome = Genome::initial(&config, &mut rng);
        genome.add_node(1);

        let json = genome.to_json().unwrap();
        let restored = Genome::from_json(&json).unwrap();
        assert_eq!(restored, genome);
    }

    #[test]
    fn test_from_json_rejects_broken_genomes() {
        let no_bias = r#"{"nodes":[{"id":1,"type":"input"}],"connections":[]}"#;
        assert!(matches!(Genome::from_json(no_bias), Err(GenomeError::InvalidBias)));

        let dangling = r#"{"nodes":[{"id":0,"type":"bias"},{"id":1,"type":"output"}],
            "connections":[{"input":{"id":0,"type":"bias"},"output":{"id":2,"type":"output"},
            "weight":1.0,"recurrent":false,"enabled":true}]}"#;
        assert!(matches!(Genome::from_json(dangling), Err(GenomeError::UnknownNode(2))));

        assert!(matches!(
            Genome::from_json("not json"),
            Err(GenomeError::Serialization(_))
        ));
    }

    #[test]
    fn test_random_mutations_keep_invariants() {
        let mut config = NeatConfig::minimal(3, 2);
        config.mutation.node.probability = 0.2;
        config.mutation.connection.probability = 0.4;
        config.mutation.connection.recurrent_prob = 0.3;
        config.mutation.connection.toggle_enable_prob = 0.5;
        config.mutation.connection.reenable_prob = 0.3;
        config.network = NetworkConfig {
            initial_connectivity: 0.7,
            ..config.network
        };
        let mut rng = test_rng();
        let mut genome = Genome::initial(&config, &mut rng);

        for _ in 0..300 {
            genome.mutate(&config, &mut rng);
            genome.validate().unwrap();
        }
    }
}
