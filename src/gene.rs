//! Gene types for genomes.
//!
//! This module defines the genotype-level building blocks:
//! - [`NodeGene`]: a neuron, identified by a per-genome id
//! - [`ConnectionGene`]: a weighted directed edge between two node genes

use serde::{Deserialize, Serialize};

/// Id of the single bias node present in every genome.
pub const BIAS_ID: u32 = 0;

/// The type/role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Bias node - constant source, never receives connections.
    Bias,
    /// Input node - receives external values, no activation applied.
    Input,
    /// Hidden node - internal processing node added through mutation.
    Hidden,
    /// Output node - produces final network output.
    Output,
}

impl NodeType {
    /// Bias and input nodes are fed from outside and never have incoming edges.
    #[inline]
    #[must_use]
    pub const fn is_sensor(self) -> bool {
        matches!(self, Self::Bias | Self::Input)
    }
}

/// A node gene representing a neuron.
///
/// Ids are assigned monotonically within a genome and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeGene {
    /// Stable id, unique within its genome.
    pub id: u32,
    /// The type/role of this node in the network.
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

impl NodeGene {
    /// Create a node gene with an explicit id and type.
    #[must_use]
    pub const fn new(id: u32, node_type: NodeType) -> Self {
        Self { id, node_type }
    }

    /// Create the bias node (always id 0).
    #[must_use]
    pub const fn bias() -> Self {
        Self::new(BIAS_ID, NodeType::Bias)
    }

    /// Create a new input node.
    #[must_use]
    pub const fn input(id: u32) -> Self {
        Self::new(id, NodeType::Input)
    }

    /// Create a new hidden node.
    #[must_use]
    pub const fn hidden(id: u32) -> Self {
        Self::new(id, NodeType::Hidden)
    }

    /// Create a new output node.
    #[must_use]
    pub const fn output(id: u32) -> Self {
        Self::new(id, NodeType::Output)
    }
}

/// A connection gene representing a weighted link between two nodes.
///
/// Two genes are duplicates when they join the same `(input.id, output.id)`
/// pair, whatever their `enabled` state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    /// The source node of this connection.
    pub input: NodeGene,
    /// The target node of this connection.
    pub output: NodeGene,
    /// The connection weight.
    pub weight: f32,
    /// Whether this edge was recurrent when it was created.
    /// Recurrent edges are ignored by depth calculation and cycle checks.
    pub recurrent: bool,
    /// Whether this connection is expressed in the phenotype.
    /// Disabled connections are kept for lineage.
    pub enabled: bool,
}

impl ConnectionGene {
    /// Create a new enabled connection.
    #[must_use]
    pub const fn new(input: NodeGene, output: NodeGene, weight: f32, recurrent: bool) -> Self {
        Self {
            input,
            output,
            weight,
            recurrent,
            enabled: true,
        }
    }

    /// The `(source id, target id)` pair identifying this gene.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> (u32, u32) {
        (self.input.id, self.output.id)
    }
}
