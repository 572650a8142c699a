//! Selection, crossover and mutation operators

use crate::{Fitness, Individual};
use rand::Rng;

/// Tournament selection: sample `k` indices uniformly (with replacement)
/// and keep the fittest. Ties keep the first one drawn.
///
/// `fitnesses` must not be empty.
pub fn tournament<R: Rng + ?Sized>(fitnesses: &[Fitness], k: usize, rng: &mut R) -> usize {
    let mut best = rng.gen_range(0..fitnesses.len());
    for _ in 1..k.max(1) {
        let candidate = rng.gen_range(0..fitnesses.len());
        if fitnesses[candidate].beats(&fitnesses[best]) {
            best = candidate;
        }
    }
    best
}

/// Single-point crossover: `p1[0..c] ++ p2[c..len]` with `c ∈ [1, len-1]`.
///
/// Masks shorter than two genes have no valid cut and copy `p1`.
pub fn crossover<R: Rng + ?Sized>(p1: &Individual, p2: &Individual, rng: &mut R) -> Individual {
    let len = p1.len().min(p2.len());
    if len < 2 {
        return p1.clone();
    }
    let cut = rng.gen_range(1..len);
    let genes = p1.genes()[..cut]
        .iter()
        .chain(p2.genes()[cut..len].iter())
        .copied()
        .collect();
    Individual::new(genes)
}

/// With probability `rate`, flip exactly one uniformly chosen bit.
/// Returns whether a mutation happened.
pub fn mutate<R: Rng + ?Sized>(individual: &mut Individual, rate: f64, rng: &mut R) -> bool {
    if individual.is_empty() || rng.gen::<f64>() >= rate {
        return false;
    }
    let index = rng.gen_range(0..individual.len());
    individual.flip(index);
    true
}

/// Index of the highest score, first one on ties
pub fn argmax(fitnesses: &[Fitness]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, fitness) in fitnesses.iter().enumerate() {
        match best {
            Some(b) if !fitness.beats(&fitnesses[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn scores(values: &[f64]) -> Vec<Fitness> {
        values.iter().map(|&s| Fitness::new(s, [s, 0.0, 0.0])).collect()
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let fitnesses = scores(&[0.1, 0.9, 0.2, 0.3]);
        let wins = (0..1000)
            .filter(|_| tournament(&fitnesses, 5, &mut rng) == 1)
            .count();
        // P(index 1 drawn at least once in 5 draws) = 1 - (3/4)^5 ≈ 0.76
        assert!(wins > 680 && wins < 840, "wins {}", wins);
    }

    #[test]
    fn test_tournament_of_one_is_uniform_draw() {
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        let fitnesses = scores(&[0.5; 3]);
        for _ in 0..100 {
            assert!(tournament(&fitnesses, 1, &mut rng) < 3);
        }
    }

    #[test]
    fn test_crossover_cut_is_interior() {
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let ones = Individual::new(vec![true; 8]);
        let zeros = Individual::new(vec![false; 8]);
        for _ in 0..200 {
            let child = crossover(&ones, &zeros, &mut rng);
            let genes = child.genes();
            assert_eq!(genes.len(), 8);
            // Head from p1, tail from p2, both non-empty
            assert!(genes[0]);
            assert!(!genes[7]);
            let cut = genes.iter().position(|g| !g).unwrap();
            assert!(genes[cut..].iter().all(|g| !g));
        }
    }

    #[test]
    fn test_crossover_short_masks_copy_first_parent() {
        let mut rng = Pcg64Mcg::seed_from_u64(4);
        let a = Individual::new(vec![true]);
        let b = Individual::new(vec![false]);
        assert_eq!(crossover(&a, &b, &mut rng), a);
        assert_eq!(crossover(&Individual::empty(0), &b, &mut rng).len(), 0);
    }

    #[test]
    fn test_mutation_flips_exactly_one_bit() {
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let mut individual = Individual::empty(16);
        assert!(mutate(&mut individual, 1.0, &mut rng));
        assert_eq!(individual.count_ones(), 1);

        let before = individual.clone();
        assert!(!mutate(&mut individual, 0.0, &mut rng));
        assert_eq!(individual, before);
    }

    #[test]
    fn test_argmax_first_seen_on_ties() {
        assert_eq!(argmax(&scores(&[0.2, 0.7, 0.7, 0.1])), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
