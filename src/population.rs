//! Fixed-size populations with fitness-proportionate selection.
//!
//! The caller evaluates every entity and writes its `fitness`, then calls
//! [`Population::advance_generation`] to replace the whole generation with
//! mutated children of roulette-selected parents.

use rand::Rng;

use crate::config::NeatConfig;
use crate::entity::Entity;

/// Errors raised by population operations.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PopulationError {
    /// Roulette selection needs a positive, finite fitness total.
    #[error("cannot select a parent: total fitness is {total_fitness}")]
    SelectionFailed { total_fitness: f32 },
}

/// A population of entities plus the best entity seen so far.
#[derive(Debug, Clone)]
pub struct Population {
    entities: Vec<Entity>,
    best: Entity,
    highest_fitness: f32,
    generation: u64,
    config: NeatConfig,
}

impl Population {
    /// Create generation 0.
    ///
    /// The config is sanitized first; a zero population size has already
    /// been replaced by its default at that point, so the population is
    /// never empty.
    #[must_use]
    pub fn new<R: Rng>(config: NeatConfig, rng: &mut R) -> Self {
        let config = config.sanitize();
        let entities: Vec<Entity> = (0..config.population.size)
            .map(|_| Entity::initial(&config, rng))
            .collect();
        let best = match entities.first() {
            Some(first) => first.clone(),
            None => Entity::initial(&config, rng),
        };

        log::debug!(
            "created population of {} entities ({} inputs, {} outputs)",
            entities.len(),
            config.network.inputs,
            config.network.outputs
        );

        Self {
            entities,
            best,
            highest_fitness: 0.0,
            generation: 0,
            config,
        }
    }

    /// Sum of all (non-negative) fitness values.
    #[must_use]
    pub fn total_fitness(&self) -> f32 {
        self.entities.iter().map(|e| e.fitness.max(0.0)).sum()
    }

    /// Roulette-wheel lookup for a given draw.
    ///
    /// Returns the index of the first entity whose cumulative fitness, in
    /// population order, exceeds `choice`. Entities with zero fitness are
    /// never chosen. Returns `None` if no entity qualifies.
    #[must_use]
    pub fn select_with(&self, choice: f32) -> Option<usize> {
        let mut cumulative = 0.0;
        for (i, entity) in self.entities.iter().enumerate() {
            cumulative += entity.fitness.max(0.0);
            if cumulative > choice {
                return Some(i);
            }
        }
        None
    }

    /// Pick a parent index with probability proportional to fitness.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::SelectionFailed`] if the total fitness is
    /// not positive or not finite.
    pub fn natural_select<R: Rng>(&self, rng: &mut R) -> Result<usize, PopulationError> {
        let total_fitness = self.total_fitness();
        if !(total_fitness.is_finite() && total_fitness > 0.0) {
            return Err(PopulationError::SelectionFailed { total_fitness });
        }

        let choice = rng.random::<f32>() * total_fitness;
        let index = self.select_with(choice).or_else(|| {
            // rounding can leave the draw at the very top of the wheel
            self.entities.iter().rposition(|e| e.fitness > 0.0)
        });
        index.ok_or(PopulationError::SelectionFailed { total_fitness })
    }

    /// Replace the generation with mutated children of selected parents.
    ///
    /// Records the best entity first (strictly better than any seen so far),
    /// then builds the next generation. If selection fails the error is
    /// returned and the current entities are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::SelectionFailed`] if the total fitness is
    /// not positive or not finite.
    pub fn advance_generation<R: Rng>(&mut self, rng: &mut R) -> Result<(), PopulationError> {
        self.update_best();

        let mean = self.total_fitness() / self.entities.len().max(1) as f32;
        let mut next = Vec::with_capacity(self.entities.len());
        for _ in 0..self.entities.len() {
            let parent = self.natural_select(rng)?;
            next.push(self.entities[parent].create_child(&self.config, rng));
        }

        log::info!(
            "generation {}: best fitness {:.4}, mean fitness {:.4}, best genome {} nodes / {} enabled connections",
            self.generation,
            self.highest_fitness,
            mean,
            self.best.genome.nodes.len(),
            self.best.genome.num_enabled_connections()
        );

        self.entities = next;
        self.generation += 1;
        Ok(())
    }

    fn update_best(&mut self) {
        for entity in &self.entities {
            if entity.fitness > self.highest_fitness {
                self.highest_fitness = entity.fitness;
                self.best = entity.clone();
                log::debug!("new best fitness {}", self.highest_fitness);
            }
        }
    }

    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Mutable access for the evaluator to drive brains and write fitness.
    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Clone of the best entity seen across all generations.
    #[must_use]
    pub fn best(&self) -> &Entity {
        &self.best
    }

    #[must_use]
    pub fn highest_fitness(&self) -> f32 {
        self.highest_fitness
    }

    /// Number of completed generations.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The sanitized configuration.
    #[must_use]
    pub fn config(&self) -> &NeatConfig {
        &self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
