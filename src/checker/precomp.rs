//! Graph-based precomputation.
//!
//! Both algorithms only look at the support of each choice. The quantifier
//! over a state's choices follows its direction: a maximising state needs
//! *some* choice to qualify, a minimising one needs *all* of them. States
//! without a direction have at most one choice and behave existentially.

use log::debug;

use crate::bitset::BitSet;
use crate::checker::numeric::Choices;
use crate::property::Opt;

fn is_existential(dir: Option<Opt>) -> bool {
    !matches!(dir, Some(Opt::Min))
}

fn support(choice: &[(usize, f64)]) -> impl Iterator<Item = usize> + '_ {
    choice.iter().filter(|&&(_, w)| w > 0.0).map(|&(t, _)| t)
}

/// States for which the optimal probability of `left U right` is 0.
pub fn prob0(choices: &Choices, dirs: &[Option<Opt>], left: &BitSet, right: &BitSet) -> BitSet {
    let n = choices.num_states();

    // Least fixed point: states reaching `right` with positive probability
    let mut reach = right.clone();
    let mut rounds = 0;
    loop {
        rounds += 1;
        let mut changed = false;
        for s in 0..n {
            if reach.contains(s) || !left.contains(s) {
                continue;
            }
            let cs = choices.choices(s);
            let hits = |c: &Vec<(usize, f64)>| support(c).any(|t| reach.contains(t));
            let ok = if is_existential(dirs[s]) {
                cs.iter().any(hits)
            } else {
                !cs.is_empty() && cs.iter().all(hits)
            };
            if ok {
                reach.insert(s);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let no = reach.complement(n);
    debug!("prob0: {} states after {} rounds", no.len(), rounds);
    no
}

/// States for which the optimal probability of `left U right` is 1.
///
/// Also returns a witness choice per existential state: following the
/// witnesses from any returned state reaches `right` almost surely.
pub fn prob1(choices: &Choices, dirs: &[Option<Opt>], left: &BitSet, right: &BitSet) -> (BitSet, Vec<usize>) {
    let n = choices.num_states();
    let mut witness = vec![0; n];

    // Greatest fixed point over u of the least fixed point over v
    let mut u = BitSet::full(n);
    let mut rounds = 0;
    loop {
        rounds += 1;
        let mut v = right.clone();
        loop {
            let mut changed = false;
            for s in 0..n {
                if v.contains(s) || !left.contains(s) || !u.contains(s) {
                    continue;
                }
                let cs = choices.choices(s);
                let good = |c: &Vec<(usize, f64)>| {
                    support(c).all(|t| u.contains(t)) && support(c).any(|t| v.contains(t))
                };
                let ok = if is_existential(dirs[s]) {
                    match cs.iter().position(good) {
                        Some(c) => {
                            witness[s] = c;
                            true
                        }
                        None => false,
                    }
                } else {
                    !cs.is_empty() && cs.iter().all(good)
                };
                if ok {
                    v.insert(s);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        if v == u {
            break;
        }
        u = v;
    }

    debug!("prob1: {} states after {} rounds", u.len(), rounds);
    (u, witness)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::distribution::Distribution;
    use crate::model::ExplicitModel;
    use crate::types::ModelType;

    // 0: a -> self, b -> 1 (goal); 2: -> {1, 3}; 3: absorbing
    fn mdp() -> Choices {
        let mut m = ExplicitModel::new(ModelType::Mdp, 4);
        m.add_choice(0, Distribution::point(0));
        m.add_choice(0, Distribution::point(1));
        m.add_choice(1, Distribution::point(1));
        m.add_choice(2, [(1, 0.5), (3, 0.5)].into_iter().collect());
        m.add_choice(3, Distribution::point(3));
        Choices::from_model(&m)
    }

    #[test]
    fn test_prob0() {
        let choices = mdp();
        let all = BitSet::full(4);
        let goal: BitSet = [1].into_iter().collect();

        let no_max = prob0(&choices, &[Some(Opt::Max); 4], &all, &goal);
        assert_eq!(no_max, [3].into_iter().collect());
        let no_min = prob0(&choices, &[Some(Opt::Min); 4], &all, &goal);
        assert_eq!(no_min, [0, 3].into_iter().collect());
    }

    #[test]
    fn test_prob1() {
        let choices = mdp();
        let all = BitSet::full(4);
        let goal: BitSet = [1].into_iter().collect();

        let (yes_max, witness) = prob1(&choices, &[Some(Opt::Max); 4], &all, &goal);
        assert_eq!(yes_max, [0, 1].into_iter().collect());
        assert_eq!(witness[0], 1);
        let (yes_min, _) = prob1(&choices, &[Some(Opt::Min); 4], &all, &goal);
        assert_eq!(yes_min, [1].into_iter().collect());
    }

    #[test]
    fn test_left_restricts_paths() {
        let choices = mdp();
        let goal: BitSet = [1].into_iter().collect();
        let left: BitSet = [1, 2, 3].into_iter().collect();
        let no = prob0(&choices, &[Some(Opt::Max); 4], &left, &goal);
        assert!(no.contains(0));
        assert!(!no.contains(2));
    }
}
