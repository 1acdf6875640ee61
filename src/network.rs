//! Phenotype networks compiled from a genome's enabled genes.
//!
//! Nodes and connections live in `SlotMap` arenas. A connection is stored
//! once and referenced by key from the target's `in_connections` and the
//! source's `out_connections`, so there are no reference cycles and a
//! rebuild is just "repopulate the arenas from the enabled genes".
//!
//! A [`Network`] is a snapshot: mutating the genome afterwards does not
//! affect it, and it must be rebuilt to see weight or structure changes.
//!
//! ## Stepping
//!
//! [`Network::activate`] advances the whole network by one synchronous
//! step, so a signal travels exactly one hop per call. Call it
//! [`Network::depth`] times to carry inputs through to the outputs.

use std::collections::{HashMap, HashSet, VecDeque};

use slotmap::{new_key_type, SlotMap};

use crate::activation::Activation;
use crate::config::NetworkConfig;
use crate::gene::{NodeGene, NodeType};
use crate::genome::Genome;

/// Constant output held by the bias node.
pub const BIAS_OUTPUT: f32 = 1.0;

new_key_type! {
    /// Arena key of a phenotype node.
    pub struct NodeKey;

    /// Arena key of a phenotype connection.
    pub struct ConnectionKey;
}

/// Errors raised when driving a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The depth is unknown or the non-recurrent edges contain a cycle, so
    /// there is no finite number of steps that reaches the outputs.
    #[error("network depth is undefined; non-recurrent edges may form a cycle")]
    UndefinedDepth,
}

/// A phenotype neuron.
#[derive(Debug, Clone)]
pub struct Node {
    /// Id of the node gene this node was built from.
    pub id: u32,
    pub node_type: NodeType,
    /// Connections arriving at this node.
    pub in_connections: Vec<ConnectionKey>,
    /// Connections leaving this node.
    pub out_connections: Vec<ConnectionKey>,
    /// Weighted input sum from the last step.
    pub active_sum: f32,
    /// Current output value.
    pub output: f32,
}

impl Node {
    fn new(gene: NodeGene) -> Self {
        Self {
            id: gene.id,
            node_type: gene.node_type,
            in_connections: Vec::new(),
            out_connections: Vec::new(),
            active_sum: 0.0,
            output: resting_output(gene.node_type),
        }
    }
}

/// A phenotype edge.
#[derive(Debug, Clone)]
pub struct Connection {
    pub input: NodeKey,
    pub output: NodeKey,
    pub weight: f32,
    pub recurrent: bool,
}

/// An executable network built from a [`Genome`].
#[derive(Debug, Clone)]
pub struct Network {
    nodes: SlotMap<NodeKey, Node>,
    connections: SlotMap<ConnectionKey, Connection>,
    /// Maps node gene ids to arena keys.
    index: HashMap<u32, NodeKey>,
    /// Bias and input nodes, in build order.
    inputs: Vec<NodeKey>,
    /// Output nodes, in build order.
    outputs: Vec<NodeKey>,
    /// Every node, in build order.
    all: Vec<NodeKey>,
    hidden_activation: Activation,
    output_activation: Activation,
    depth: Option<usize>,
}

impl Network {
    /// Build the phenotype of `genome`.
    ///
    /// Disabled genes contribute nothing, and node genes that no enabled
    /// gene touches do not appear in the network. The depth starts out
    /// unknown; see [`calculate_depth`](Self::calculate_depth).
    #[must_use]
    pub fn from_genome(genome: &Genome, config: &NetworkConfig) -> Self {
        let mut network = Self {
            nodes: SlotMap::with_key(),
            connections: SlotMap::with_key(),
            index: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            all: Vec::new(),
            hidden_activation: config.hidden_activation,
            output_activation: config.output_activation,
            depth: None,
        };

        for gene in genome.connections.iter().filter(|g| g.enabled) {
            if gene.output.node_type.is_sensor() {
                log::warn!(
                    "skipping connection {} -> {}: {:?} nodes cannot receive connections",
                    gene.input.id,
                    gene.output.id,
                    gene.output.node_type
                );
                continue;
            }

            let input = network.node_key_or_insert(gene.input);
            let output = network.node_key_or_insert(gene.output);
            let key = network.connections.insert(Connection {
                input,
                output,
                weight: gene.weight,
                recurrent: gene.recurrent,
            });
            network.nodes[output].in_connections.push(key);
            network.nodes[input].out_connections.push(key);
        }

        network
    }

    fn node_key_or_insert(&mut self, gene: NodeGene) -> NodeKey {
        if let Some(&key) = self.index.get(&gene.id) {
            return key;
        }

        let key = self.nodes.insert(Node::new(gene));
        self.index.insert(gene.id, key);
        match gene.node_type {
            NodeType::Bias | NodeType::Input => self.inputs.push(key),
            NodeType::Output => self.outputs.push(key),
            NodeType::Hidden => {}
        }
        self.all.push(key);
        key
    }

    /// Advance the network by one synchronous step.
    ///
    /// Every hidden and output node first sums `weight * source.output`
    /// over its incoming connections using the outputs as they were before
    /// this call, then all of them apply their activation function.
    pub fn activate(&mut self) -> &mut Self {
        let sums: Vec<(NodeKey, f32)> = self
            .all
            .iter()
            .filter(|&&key| !self.nodes[key].node_type.is_sensor())
            .map(|&key| {
                let sum = self.nodes[key]
                    .in_connections
                    .iter()
                    .map(|&c| {
                        let conn = &self.connections[c];
                        conn.weight * self.nodes[conn.input].output
                    })
                    .fold(0.0, |acc, x| acc + x);
                (key, sum)
            })
            .collect();

        for (key, sum) in sums {
            let node = &mut self.nodes[key];
            let activation = match node.node_type {
                NodeType::Output => self.output_activation,
                _ => self.hidden_activation,
            };
            node.active_sum = sum;
            node.output = activation.apply(sum);
        }

        self
    }

    /// Clear all activation state.
    ///
    /// Every node's sum and output go to zero except the bias output, which
    /// is held at [`BIAS_OUTPUT`] rather than zeroed so that bias weights
    /// contribute from the very first step. New networks start the same way.
    pub fn reset(&mut self) -> &mut Self {
        for node in self.nodes.values_mut() {
            node.active_sum = 0.0;
            node.output = resting_output(node.node_type);
        }
        self
    }

    /// Set the output of the input or bias node with the given id.
    ///
    /// Does nothing if no such node is part of this network, which is
    /// normal for inputs that no enabled gene uses.
    pub fn feed_input(&mut self, id: u32, value: f32) -> &mut Self {
        if let Some(&key) = self.inputs.iter().find(|&&key| self.nodes[key].id == id) {
            self.nodes[key].output = value;
        }
        self
    }

    /// Assign `values` positionally to the input list (bias included, in
    /// build order). Extra values are ignored; a short slice leaves the
    /// remaining inputs untouched.
    pub fn feed_inputs(&mut self, values: &[f32]) -> &mut Self {
        for (&key, &value) in self.inputs.iter().zip(values) {
            self.nodes[key].output = value;
        }
        self
    }

    /// Current output values, in build order of the output nodes.
    ///
    /// Only outputs reached by an enabled gene are present; use
    /// [`Entity::output_values`](crate::Entity::output_values) for one value
    /// per genome output in id order.
    #[must_use]
    pub fn output_values(&self) -> Vec<f32> {
        self.outputs.iter().map(|&key| self.nodes[key].output).collect()
    }

    /// Compute how many steps a signal needs to reach every output.
    ///
    /// For each output node, walks backwards layer by layer over
    /// non-recurrent incoming connections until only sensor nodes remain.
    /// That output's depth is the number of layers minus one; the network's
    /// depth is the maximum over all outputs.
    ///
    /// If an output needs more layers than there are nodes, the
    /// non-recurrent edges contain a cycle (a re-enabled or toggled gene can
    /// leave a stale `recurrent` flag behind). The depth is then `None`.
    pub fn calculate_depth(&mut self) -> Option<usize> {
        let threshold = self.all.len();
        let mut deepest = 0;

        for &output in &self.outputs {
            let mut current: VecDeque<NodeKey> = VecDeque::from([output]);
            let mut next: Vec<NodeKey> = Vec::new();
            let mut layers = 0usize;

            while let Some(key) = current.pop_front() {
                if layers > threshold {
                    log::debug!(
                        "depth search from output {} exceeded {threshold} layers",
                        self.nodes[output].id
                    );
                    self.depth = None;
                    return None;
                }

                for &c in &self.nodes[key].in_connections {
                    let conn = &self.connections[c];
                    if !conn.recurrent && !next.contains(&conn.input) {
                        next.push(conn.input);
                    }
                }

                if current.is_empty() {
                    current.extend(next.drain(..));
                    layers += 1;
                }
            }

            // the last layer holds only sensors and adds no hop
            deepest = deepest.max(layers.saturating_sub(1));
        }

        self.depth = Some(deepest);
        self.depth
    }

    /// The last computed depth, or `None` if unknown or cyclic.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> Option<usize> {
        self.depth
    }

    /// Would a new edge `source -> target` close a cycle?
    ///
    /// Searches forward from `target` along existing non-recurrent edges for
    /// `source`. Edges leaving bias or input nodes are never recurrent. The
    /// search gives up and answers `false` after `threshold` node visits;
    /// callers normally pass the squared node count of the genome.
    ///
    /// Node genes that are not part of this network are accepted and have
    /// no outgoing edges, so only a self-loop on them is recurrent.
    #[must_use]
    pub fn is_recurrent(&self, source: NodeGene, target: NodeGene, threshold: usize) -> bool {
        if source.node_type.is_sensor() {
            return false;
        }

        let mut queue = VecDeque::from([target.id]);
        let mut visited = HashSet::from([target.id]);
        let mut visits = 0usize;

        while let Some(id) = queue.pop_front() {
            if visits > threshold {
                return false;
            }
            if id == source.id {
                return true;
            }

            if let Some(&key) = self.index.get(&id) {
                for &c in &self.nodes[key].out_connections {
                    let conn = &self.connections[c];
                    if conn.recurrent {
                        continue;
                    }
                    let next = self.nodes[conn.output].id;
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            visits += 1;
        }

        false
    }

    /// Look up a node by its gene id.
    #[must_use]
    pub fn node(&self, id: u32) -> Option<&Node> {
        self.index.get(&id).map(|&key| &self.nodes[key])
    }

    /// Look up a node by arena key.
    #[must_use]
    pub fn node_by_key(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Look up a connection by arena key.
    #[must_use]
    pub fn connection(&self, key: ConnectionKey) -> Option<&Connection> {
        self.connections.get(key)
    }

    /// Whether the node with this gene id has at least one incoming connection.
    #[must_use]
    pub fn has_incoming(&self, id: u32) -> bool {
        self.node(id).is_some_and(|node| !node.in_connections.is_empty())
    }

    /// Bias and input nodes, in build order.
    pub fn inputs(&self) -> impl Iterator<Item = &Node> + '_ {
        self.inputs.iter().map(|&key| &self.nodes[key])
    }

    /// Output nodes, in build order.
    pub fn outputs(&self) -> impl Iterator<Item = &Node> + '_ {
        self.outputs.iter().map(|&key| &self.nodes[key])
    }

    /// Every node, in build order.
    pub fn all(&self) -> impl Iterator<Item = &Node> + '_ {
        self.all.iter().map(|&key| &self.nodes[key])
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.all.len()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// `(source id, target id)` of every connection, grouped by target in
    /// build order.
    #[must_use]
    pub fn connection_pairs(&self) -> Vec<(u32, u32)> {
        self.all()
            .flat_map(|node| {
                node.in_connections.iter().map(move |&c| {
                    let conn = &self.connections[c];
                    (self.nodes[conn.input].id, node.id)
                })
            })
            .collect()
    }
}

#[inline]
const fn resting_output(node_type: NodeType) -> f32 {
    match node_type {
        NodeType::Bias => BIAS_OUTPUT,
        _ => 0.0,
    }
}
