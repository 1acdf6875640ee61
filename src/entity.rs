//! Entities: a genome, the network compiled from it, and a fitness score.

use rand::Rng;

use crate::config::NeatConfig;
use crate::gene::NodeType;
use crate::genome::Genome;
use crate::network::{Network, NetworkError};

/// An individual in a [`Population`](crate::Population).
///
/// The brain is compiled once at construction and its depth computed; the
/// external evaluator drives it and writes `fitness`.
#[derive(Debug, Clone)]
pub struct Entity {
    pub genome: Genome,
    brain: Network,
    /// Fitness assigned by the evaluator. Selection expects it non-negative.
    pub fitness: f32,
}

impl Entity {
    /// Wrap a genome, compiling its network and computing the depth.
    #[must_use]
    pub fn from_genome(genome: Genome, config: &NeatConfig) -> Self {
        let mut brain = Network::from_genome(&genome, &config.network);
        if brain.calculate_depth().is_none() {
            log::debug!(
                "entity with {} nodes has undefined depth",
                genome.nodes.len()
            );
        }

        Self {
            genome,
            brain,
            fitness: 0.0,
        }
    }

    /// Create a generation-0 entity from a fresh [`Genome::initial`].
    #[must_use]
    pub fn initial<R: Rng>(config: &NeatConfig, rng: &mut R) -> Self {
        Self::from_genome(Genome::initial(config, rng), config)
    }

    /// Clone the genome, mutate it once, and wrap it in a new entity with
    /// fitness 0.
    #[must_use]
    pub fn create_child<R: Rng>(&self, config: &NeatConfig, rng: &mut R) -> Self {
        let mut genome = self.genome.clone();
        genome.mutate(config, rng);
        Self::from_genome(genome, config)
    }

    /// Feed sensor values to input nodes `1..=values.len()`.
    ///
    /// Non-finite values are skipped with a warning, leaving the node's
    /// previous output in place. Returns the number of skipped values.
    pub fn feed_sensory_inputs(&mut self, values: &[f32]) -> usize {
        let mut skipped = 0;
        for (id, &value) in (1u32..).zip(values) {
            if !value.is_finite() {
                log::warn!("skipping non-finite sensor value {value} for input {id}");
                skipped += 1;
                continue;
            }
            self.brain.feed_input(id, value);
        }
        skipped
    }

    /// Run the brain on one input vector from a clean state.
    ///
    /// Resets the network, feeds `inputs` and activates `depth` times.
    /// Returns one value per output node of the genome, in id order;
    /// outputs that no enabled gene reaches read 0.0.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UndefinedDepth`] if the depth could not be
    /// determined.
    pub fn evaluate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError> {
        let depth = self.brain.depth().ok_or(NetworkError::UndefinedDepth)?;

        self.brain.reset();
        self.feed_sensory_inputs(inputs);
        for _ in 0..depth {
            self.brain.activate();
        }
        Ok(self.output_values())
    }

    /// Current output of every genome output node, in id order.
    #[must_use]
    pub fn output_values(&self) -> Vec<f32> {
        let mut ids = self.genome.ids_of(NodeType::Output);
        ids.sort_unstable();
        ids.into_iter()
            .map(|id| self.brain.node(id).map_or(0.0, |node| node.output))
            .collect()
    }

    /// Number of activation steps needed to reach the outputs.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.brain.depth()
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    #[must_use]
    pub fn brain(&self) -> &Network {
        &self.brain
    }

    pub fn brain_mut(&mut self) -> &mut Network {
        &mut self.brain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::gene::NodeGene;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn identity_config(inputs: usize, outputs: usize) -> NeatConfig {
        let mut config = NeatConfig::minimal(inputs, outputs);
        config.network.hidden_activation = Activation::Identity;
        config.network.output_activation = Activation::Identity;
        config
    }

    #[test]
    fn test_initial_entity() {
        let config = NeatConfig::minimal(2, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let entity = Entity::initial(&config, &mut rng);

        assert_eq!(entity.fitness, 0.0);
        assert_eq!(entity.depth(), Some(1));
        assert_eq!(entity.genome().connections.len(), 3);
        assert_eq!(entity.brain().num_outputs(), 1);
    }

    #[test]
    fn test_evaluate_hidden_chain() {
        let config = identity_config(1, 1);
        let mut genome = Genome::minimal(1, 1);
        genome.nodes.push(NodeGene::hidden(3));
        genome.connect(1, 3, 2.0, false).unwrap();
        genome.connect(3, 2, 0.5, false).unwrap();

        let mut entity = Entity::from_genome(genome, &config);
        assert_eq!(entity.depth(), Some(2));

        let out = entity.evaluate(&[3.0]).unwrap();
        assert_eq!(out, vec![3.0]);

        // state does not leak between evaluations
        let out = entity.evaluate(&[1.0]).unwrap();
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn test_evaluate_undefined_depth() {
        let config = identity_config(1, 1);
        let mut genome = Genome::minimal(1, 1);
        genome.nodes.push(NodeGene::hidden(3));
        genome.nodes.push(NodeGene::hidden(4));
        genome.connect(1, 3, 1.0, false).unwrap();
        genome.connect(3, 4, 1.0, false).unwrap();
        genome.connect(4, 3, 1.0, false).unwrap();
        genome.connect(4, 2, 1.0, false).unwrap();

        let mut entity = Entity::from_genome(genome, &config);
        assert_eq!(entity.depth(), None);
        assert_eq!(entity.evaluate(&[1.0]), Err(NetworkError::UndefinedDepth));
    }

    #[test]
    fn test_outputs_follow_genome_id_order() {
        let config = identity_config(1, 2);
        let mut genome = Genome::minimal(1, 2);
        genome.connect(1, 3, 10.0, false).unwrap();
        genome.connect(1, 2, 1.0, false).unwrap();

        let mut entity = Entity::from_genome(genome, &config);
        assert_eq!(entity.evaluate(&[1.0]).unwrap(), vec![1.0, 10.0]);
    }

    #[test]
    fn test_disconnected_output_reads_zero() {
        let config = identity_config(1, 2);
        let mut genome = Genome::minimal(1, 2);
        genome.connect(1, 3, 10.0, false).unwrap();

        let mut entity = Entity::from_genome(genome, &config);
        assert_eq!(entity.brain().num_outputs(), 1);
        assert_eq!(entity.evaluate(&[1.0]).unwrap(), vec![0.0, 10.0]);
    }

    #[test]
    fn test_create_child_with_unsanitized_cap() {
        let mut config = NeatConfig::minimal(2, 1);
        config.mutation.node.probability = 0.0;
        config.mutation.connection.probability = 0.0;
        config.mutation.weight.probability = 1.0;
        config.mutation.weight.cap = -1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let parent = Entity::initial(&config, &mut rng);

        let child = parent.create_child(&config, &mut rng);
        assert_eq!(child.genome().connections.len(), 3);
    }

    #[test]
    fn test_feed_skips_non_finite_values() {
        let config = identity_config(3, 1);
        let mut genome = Genome::minimal(3, 1);
        for id in 1..=3 {
            genome.connect(id, 4, 1.0, false).unwrap();
        }
        let mut entity = Entity::from_genome(genome, &config);

        let skipped = entity.feed_sensory_inputs(&[0.5, f32::NAN, f32::INFINITY]);
        assert_eq!(skipped, 2);
        assert_eq!(entity.brain().node(1).unwrap().output, 0.5);
        assert_eq!(entity.brain().node(2).unwrap().output, 0.0);
        assert_eq!(entity.brain().node(3).unwrap().output, 0.0);
    }

    #[test]
    fn test_create_child() {
        let mut config = NeatConfig::minimal(2, 1);
        config.mutation.node.probability = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut parent = Entity::initial(&config, &mut rng);
        parent.fitness = 10.0;

        let child = parent.create_child(&config, &mut rng);

        assert_eq!(child.fitness, 0.0);
        assert_eq!(child.genome().nodes.len(), parent.genome().nodes.len() + 1);
        assert_eq!(child.depth(), Some(2));
        // the parent keeps its own genome
        assert_eq!(parent.genome().nodes.len(), 4);
    }
}
