//! Random edits of a working quartet set.

use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::quartet::Quartet;
use crate::{Error, Result};

/// Append `count` quartets on four distinct taxa drawn uniformly from
/// `0..taxon_count`.
pub fn add_random_quartets<R: Rng + ?Sized>(
    quartets: &mut Vec<Quartet>,
    taxon_count: usize,
    count: usize,
    rng: &mut R,
) -> Result<()> {
    if taxon_count < 4 {
        return Err(Error::TooFewTaxa { taxon_count });
    }
    quartets.reserve(count);
    for _ in 0..count {
        let taxa = index::sample(rng, taxon_count, 4);
        quartets.push(Quartet::new(
            taxa.index(0),
            taxa.index(1),
            taxa.index(2),
            taxa.index(3),
        ));
    }
    Ok(())
}

/// Remove up to `count` quartets chosen uniformly at random, returning them
/// in removal order.
pub fn remove_random_quartets<R: Rng + ?Sized>(
    quartets: &mut Vec<Quartet>,
    count: usize,
    rng: &mut R,
) -> Vec<Quartet> {
    let count = count.min(quartets.len());
    (0..count)
        .map(|_| {
            let k = rng.gen_range(0..quartets.len());
            quartets.remove(k)
        })
        .collect()
}

pub fn shuffle_quartets<R: Rng + ?Sized>(quartets: &mut [Quartet], rng: &mut R) {
    quartets.shuffle(rng);
}

/// Keep each quartet independently with probability `fraction`, clamped to
/// `[0, 1]`.
pub fn keep_fraction<R: Rng + ?Sized>(quartets: &mut Vec<Quartet>, fraction: f64, rng: &mut R) {
    let p = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    quartets.retain(|_| rng.gen_bool(p));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_quartets_are_valid() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut quartets = Vec::new();
        add_random_quartets(&mut quartets, 6, 200, &mut rng).unwrap();
        assert_eq!(quartets.len(), 200);
        assert!(quartets.iter().all(|q| q.is_valid() && q.max_taxon() < 6));
        assert!(matches!(
            add_random_quartets(&mut quartets, 3, 1, &mut rng),
            Err(Error::TooFewTaxa { taxon_count: 3 })
        ));
    }

    #[test]
    fn test_remove_is_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut quartets = Vec::new();
        add_random_quartets(&mut quartets, 8, 10, &mut rng).unwrap();
        let before = quartets.clone();
        let removed = remove_random_quartets(&mut quartets, 4, &mut rng);
        assert_eq!(removed.len(), 4);
        assert_eq!(quartets.len(), 6);
        assert!(removed.iter().all(|q| before.contains(q)));

        let rest = remove_random_quartets(&mut quartets, 100, &mut rng);
        assert_eq!(rest.len(), 6);
        assert!(quartets.is_empty());
    }

    #[test]
    fn test_shuffle_keeps_the_multiset() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut quartets = Vec::new();
        add_random_quartets(&mut quartets, 10, 50, &mut rng).unwrap();
        let mut shuffled = quartets.clone();
        shuffle_quartets(&mut shuffled, &mut rng);
        let key = |q: &Quartet| q.canonical().taxa();
        let mut a: Vec<_> = quartets.iter().map(key).collect();
        let mut b: Vec<_> = shuffled.iter().map(key).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn test_keep_fraction_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut quartets = Vec::new();
        add_random_quartets(&mut quartets, 7, 30, &mut rng).unwrap();
        let mut all = quartets.clone();
        keep_fraction(&mut all, 1.5, &mut rng);
        assert_eq!(all.len(), 30);
        keep_fraction(&mut quartets, 0.0, &mut rng);
        assert!(quartets.is_empty());
    }
}
