//! XOR example.
//!
//! Evolves a network for the XOR problem, the classic benchmark for
//! neuroevolution. Fitness is `(4 - squared error)^2`, so a perfect network
//! scores 16.
//!
//! Run with: `RUST_LOG=info cargo run --example xor`

use neat_evolver::{Entity, NeatConfig, Population};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const CASES: [([f32; 2], f32); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// Score an entity and report whether every case rounds correctly.
fn evaluate(entity: &mut Entity) -> (f32, bool) {
    let mut error = 0.0;
    let mut solved = true;

    for (inputs, expected) in &CASES {
        let output = match entity.evaluate(inputs) {
            Ok(values) => values.first().copied().unwrap_or(0.0),
            Err(_) => return (0.0, false),
        };
        error += (output - expected).powi(2);
        let rounded = if output > 0.5 { 1.0 } else { 0.0 };
        solved &= (rounded - expected).abs() < 0.1;
    }

    ((4.0 - error).powi(2), solved)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("NEAT XOR Example");
    println!("================\n");

    let mut config = NeatConfig::minimal(2, 1);
    config.population.size = 150;
    config.mutation.node.probability = 0.05;
    config.mutation.connection.probability = 0.1;

    let generations = 300;
    let seed = 42;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut population = Population::new(config, &mut rng);

    println!("Population: {}", population.len());
    println!("Generations: {generations}");
    println!();

    let mut solution = None;
    for gen in 0..generations {
        let mut best = 0.0_f32;
        let mut sum = 0.0_f32;
        for entity in population.entities_mut() {
            let (fitness, solved) = evaluate(entity);
            entity.fitness = fitness;
            best = best.max(fitness);
            sum += fitness;
            if solved && solution.is_none() {
                solution = Some((gen, entity.clone()));
            }
        }

        if gen % 10 == 0 || solution.is_some() {
            let avg = sum / population.len() as f32;
            println!("Gen {gen:3}: best={best:.4}, avg={avg:.4}");
        }
        if solution.is_some() {
            break;
        }

        if let Err(err) = population.advance_generation(&mut rng) {
            eprintln!("evolution stopped: {err}");
            return;
        }
    }

    println!();
    let (champion, found_at) = match solution {
        Some((gen, entity)) => (entity, Some(gen)),
        None => (population.best().clone(), None),
    };

    println!("Evolution Complete!");
    println!("==================");
    match found_at {
        Some(gen) => println!("Solution found at generation: {gen}"),
        None => println!("No solution within {generations} generations"),
    }
    println!("Nodes: {}", champion.genome().nodes.len());
    println!("Connections: {}", champion.genome().num_enabled_connections());
    println!("Hidden nodes: {}", champion.genome().hidden_ids().len());
    match champion.genome().to_json() {
        Ok(json) => println!("Genome: {json}"),
        Err(err) => eprintln!("could not export genome: {err}"),
    }

    println!("\nChampion XOR outputs:");
    let mut champion = champion;
    for (inputs, expected) in &CASES {
        let output = champion
            .evaluate(inputs)
            .ok()
            .and_then(|v| v.first().copied())
            .unwrap_or(f32::NAN);
        let rounded = if output > 0.5 { 1.0 } else { 0.0 };
        let status = if (rounded - expected).abs() < 0.1 {
            "✓"
        } else {
            "✗"
        };
        println!(
            "  {} XOR {} = {:.4} (expected {}) {}",
            inputs[0] as i32, inputs[1] as i32, output, *expected as i32, status
        );
    }
}
