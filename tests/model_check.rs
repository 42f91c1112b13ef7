//! End-to-end checks through the dispatcher.

use pmc_rs::config::Settings;
use pmc_rs::dispatch::Dispatcher;
use pmc_rs::distribution::Distribution;
use pmc_rs::error::CheckError;
use pmc_rs::labels::Labels;
use pmc_rs::model::{ExplicitModel, Model, RewardStructure};
use pmc_rs::property::{CmpOp, Opt, Property, PropertySet, RewardPath, StateFormula};
use pmc_rs::result::{ResultValue, StateVector};
use pmc_rs::sparse::SparseModel;
use pmc_rs::strategy::Strategy;
use pmc_rs::types::{ModelType, Player};

fn check(dispatcher: &Dispatcher, model: &dyn Model, property: &Property) -> Result<pmc_rs::result::CheckResult, CheckError> {
    dispatcher.model_check(model, &Labels::from_model(model), &PropertySet::new(), property)
}

fn goal() -> StateFormula {
    StateFormula::label("goal")
}

// ─── DTMC ──────────────────────────────────────────────────────────────────────

// Two dice-like coin rounds: 0 -> {1, 2}, 1 -> {goal, 0}, 2 -> {fail, 0}
fn coins() -> ExplicitModel {
    let mut m = ExplicitModel::new(ModelType::Dtmc, 5);
    m.add_choice(0, [(1, 0.5), (2, 0.5)].into_iter().collect());
    m.add_choice(1, [(3, 0.5), (0, 0.5)].into_iter().collect());
    m.add_choice(2, [(4, 0.5), (0, 0.5)].into_iter().collect());
    m.add_choice(3, Distribution::point(3));
    m.add_choice(4, Distribution::point(4));
    m.add_initial_state(0);
    m.add_label("goal", [3].into_iter().collect());
    m.add_label("fail", [4].into_iter().collect());
    m.add_reward_structure(RewardStructure::new("flips", vec![1.0, 1.0, 1.0, 0.0, 0.0]));
    m
}

#[test]
fn dtmc_reachability_and_thresholds() {
    let m = coins();
    let dispatcher = Dispatcher::new(Settings::default().with_term_crit_param(1e-10));

    let r = check(&dispatcher, &m, &Property::prob(None, goal().eventually())).unwrap();
    assert!((r.value_f64().unwrap() - 0.5).abs() < 1e-8);
    assert_eq!(r.model_type, ModelType::Dtmc);
    assert!(r.stats.num_yes >= 1);

    let r = check(
        &dispatcher,
        &m,
        &Property::prob(None, goal().eventually()).with_threshold(CmpOp::Ge, 0.4),
    )
    .unwrap();
    assert_eq!(r.value, ResultValue::Bool(true));
    let holds = r.states.as_bools().unwrap();
    assert!(holds.contains(3));
    assert!(!holds.contains(4));

    // Expected number of flips: x0 = 1 + (x1 + x2) / 2, x1 = x2 = 1 + x0 / 2
    let r = check(&dispatcher, &m, &Property::reward(None, RewardPath::Reach(goal().or(StateFormula::label("fail"))))).unwrap();
    assert!((r.value_f64().unwrap() - 4.0).abs() < 1e-7);

    let r = check(&dispatcher, &m, &Property::reward(None, RewardPath::Cumulative(2.0))).unwrap();
    assert_eq!(r.value_f64(), Some(2.0));
}

#[test]
fn dtmc_globally_and_several_initial_states() {
    let mut m = coins();
    let dispatcher = Dispatcher::new(Settings::default().with_term_crit_param(1e-10));
    let safe = StateFormula::label("fail").not();

    let r = check(&dispatcher, &m, &Property::prob(None, safe.clone().globally(None))).unwrap();
    assert!((r.value_f64().unwrap() - 0.5).abs() < 1e-8);

    m.add_initial_state(3);
    let r = check(&dispatcher, &m, &Property::prob(None, safe.globally(Some(1.0)))).unwrap();
    match r.value {
        ResultValue::Vector(v) => {
            assert_eq!(v.len(), 5);
            assert_eq!(v[0], 1.0);
            assert_eq!(v[2], 0.5);
            assert_eq!(v[3], 1.0);
        }
        other => panic!("expected a vector, got {:?}", other),
    }
}

// ─── MDP ───────────────────────────────────────────────────────────────────────

// 0: safe -> {1: 0.9, 2: 0.1}, risky -> {1: 0.5, 3: 0.5}
// 1: retry -> 0, give up -> 2
// 2: fail, 3: goal
fn retry() -> ExplicitModel {
    let mut m = ExplicitModel::new(ModelType::Mdp, 4);
    m.add_choice(0, [(1, 0.9), (2, 0.1)].into_iter().collect());
    m.add_choice(0, [(1, 0.5), (3, 0.5)].into_iter().collect());
    m.add_choice(1, Distribution::point(0));
    m.add_choice(1, Distribution::point(2));
    m.add_choice(2, Distribution::point(2));
    m.add_choice(3, Distribution::point(3));
    m.add_initial_state(0);
    m.add_label("goal", [3].into_iter().collect());
    m
}

#[test]
fn mdp_methods_through_dispatcher() {
    let m = retry();
    for method in ["Value iteration", "Gauss-Seidel", "Policy iteration", "Modified policy iteration", "Unknown"] {
        let dispatcher = Dispatcher::new(
            Settings::default()
                .with_mdp_soln_method(method)
                .with_term_crit("Absolute")
                .with_term_crit_param(1e-10),
        );
        let r = check(&dispatcher, &m, &Property::prob(Some(Opt::Max), goal().eventually())).unwrap();
        assert!((r.value_f64().unwrap() - 1.0).abs() < 1e-8, "{}", method);
        let r = check(&dispatcher, &m, &Property::prob(Some(Opt::Min), goal().eventually())).unwrap();
        assert!(r.value_f64().unwrap().abs() < 1e-8, "{}", method);
    }
}

#[test]
fn mdp_generated_strategy_is_exported() {
    let m = retry();
    let dispatcher = Dispatcher::new(Settings::default().with_generate_strategy(true));
    let r = check(&dispatcher, &m, &Property::prob(Some(Opt::Max), goal().eventually_within(3.0))).unwrap();
    assert_eq!(r.value_f64(), Some(0.75));

    let strategy = r.strategy.expect("strategy requested");
    assert_eq!(strategy.memory_size(), 3);
    let mut out = Vec::new();
    strategy.write_to(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "// Strategy for step-bounded properties");
    assert_eq!(lines[5], "Strategy:");
    assert_eq!(lines.len(), 6 + 4);
    assert!(lines[6].starts_with("0, 3, "));
}

#[test]
fn min_reward_with_free_cycle() {
    // 0: idle -> self (free), go -> goal (cost 1)
    let mut m = ExplicitModel::new(ModelType::Mdp, 2);
    m.add_choice(0, Distribution::point(0));
    m.add_choice(0, Distribution::point(1));
    m.add_choice(1, Distribution::point(1));
    m.add_initial_state(0);
    m.add_label("goal", [1].into_iter().collect());
    m.add_reward_structure(RewardStructure::new("cost", vec![0.0; 2]).with_choice_rewards(vec![vec![0.0, 1.0], vec![0.0]]));

    let r = check(&Dispatcher::default(), &m, &Property::reward(Some(Opt::Min), RewardPath::Reach(goal()))).unwrap();
    assert_eq!(r.value_f64(), Some(1.0));
}

#[test]
fn nondeterministic_query_needs_direction() {
    let m = retry();
    let err = check(&Dispatcher::default(), &m, &Property::prob(None, goal().eventually())).unwrap_err();
    assert!(matches!(err, CheckError::PropertyModelMismatch { model_type: ModelType::Mdp, .. }));
}

#[test]
fn sparse_and_explicit_agree() {
    let explicit = retry();
    let sparse = SparseModel::from(&explicit);
    let dispatcher = Dispatcher::default();
    let property = Property::prob(Some(Opt::Max), goal().eventually_within(5.0));
    let a = check(&dispatcher, &explicit, &property).unwrap();
    let b = check(&dispatcher, &sparse, &property).unwrap();
    assert_eq!(a.states, b.states);
}

// ─── Continuous time ───────────────────────────────────────────────────────────

#[test]
fn ctmc_time_bounded() {
    let mut m = ExplicitModel::new(ModelType::Ctmc, 2);
    m.add_choice(0, [(1, 3.0)].into_iter().collect());
    m.add_initial_state(0);
    m.add_label("goal", [1].into_iter().collect());
    let dispatcher = Dispatcher::new(Settings::default().with_term_crit_param(1e-10));

    let r = check(&dispatcher, &m, &Property::prob(None, goal().eventually_within(0.5))).unwrap();
    let exact = 1.0 - (-1.5f64).exp();
    assert!((r.value_f64().unwrap() - exact).abs() < 1e-8);
    assert_eq!(r.stats.method, "Uniformisation");

    // Time bounds need not be integers, but must not be negative
    let err = check(&dispatcher, &m, &Property::prob(None, goal().eventually_within(-1.0))).unwrap_err();
    assert!(matches!(err, CheckError::PropertyModelMismatch { .. }));
}

#[test]
fn ctmdp_rejects_next() {
    let mut m = ExplicitModel::new(ModelType::Ctmdp, 2);
    m.add_choice(0, [(1, 1.0)].into_iter().collect());
    m.add_choice(1, [(1, 1.0)].into_iter().collect());
    m.add_initial_state(0);
    m.add_label("goal", [1].into_iter().collect());
    let err = check(&Dispatcher::default(), &m, &Property::prob(Some(Opt::Max), goal().next())).unwrap_err();
    assert!(matches!(err, CheckError::PropertyModelMismatch { model_type: ModelType::Ctmdp, .. }));

    let r = check(&Dispatcher::default(), &m, &Property::prob(Some(Opt::Max), goal().eventually())).unwrap();
    assert_eq!(r.value_f64(), Some(1.0));
}

// ─── Games ─────────────────────────────────────────────────────────────────────

#[test]
fn stpg_players_oppose() {
    let mut m = ExplicitModel::new(ModelType::Stpg, 4);
    m.add_choice(0, [(2, 0.5), (3, 0.5)].into_iter().collect());
    m.add_choice(0, Distribution::point(1));
    m.add_choice(1, Distribution::point(2));
    m.add_choice(1, Distribution::point(3));
    m.add_choice(2, Distribution::point(2));
    m.add_choice(3, Distribution::point(3));
    m.add_initial_state(0);
    m.set_players(vec![Player::One, Player::Two, Player::One, Player::One]);
    m.add_label("goal", [2].into_iter().collect());

    let r = check(&Dispatcher::default(), &m, &Property::prob(Some(Opt::Max), goal().eventually())).unwrap();
    assert_eq!(r.value_f64(), Some(0.5));
    match r.states {
        StateVector::Doubles(v) => assert_eq!(v[1], 0.0),
        other => panic!("expected values, got {:?}", other),
    }
}
