use std::path::PathBuf;

use clap::Parser;
use log::info;

use pmc_rs::config::Settings;
use pmc_rs::dispatch::Dispatcher;
use pmc_rs::distribution::Distribution;
use pmc_rs::labels::Labels;
use pmc_rs::model::{ExplicitModel, Model, RewardStructure};
use pmc_rs::property::{Opt, Property, PropertySet, RewardPath, StateFormula};
use pmc_rs::strategy::Strategy;
use pmc_rs::types::ModelType;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Target capital (the model has `n + 1` states).
    #[arg(value_name = "INT", default_value = "20")]
    n: usize,

    /// Probability of winning a bet.
    #[clap(long, value_name = "FLOAT", default_value = "0.45")]
    p: f64,

    /// Step bound for the bounded query and the synthesised strategy.
    #[clap(long, value_name = "INT", default_value = "30")]
    bound: usize,

    /// MDP solution method.
    #[clap(long, value_name = "STR", default_value = "Value iteration")]
    method: String,

    /// Termination criterion ("Absolute" or "Relative").
    #[clap(long, value_name = "STR", default_value = "Relative")]
    term_crit: String,

    /// Termination epsilon.
    #[clap(long, value_name = "FLOAT", default_value = "1e-6")]
    epsilon: f64,

    /// Disable graph-based precomputation.
    #[clap(long)]
    no_precomputation: bool,

    /// Export the synthesised strategy to this file.
    #[clap(long, value_name = "FILE")]
    export: Option<PathBuf>,
}

/// Gambler's ruin: bet (win with probability `p`) or play safe (move up
/// with probability 0.4 at cost 2, otherwise stay).
fn gamblers_ruin(n: usize, p: f64) -> ExplicitModel {
    let mut m = ExplicitModel::new(ModelType::Mdp, n + 1);
    let mut costs = vec![vec![0.0]; n + 1];
    m.add_choice(0, Distribution::point(0));
    for s in 1..n {
        m.add_choice(s, [(s + 1, p), (s - 1, 1.0 - p)].into_iter().collect());
        m.add_choice(s, [(s + 1, 0.4), (s, 0.6)].into_iter().collect());
        costs[s] = vec![1.0, 2.0];
    }
    m.add_choice(n, Distribution::point(n));
    m.add_initial_state(n / 2);
    m.add_label("goal", [n].into_iter().collect());
    m.add_label("ruin", [0].into_iter().collect());
    m.add_reward_structure(RewardStructure::new("cost", vec![0.0; n + 1]).with_choice_rewards(costs));
    m
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let model = gamblers_ruin(args.n, args.p);
    println!("model: {}", model.info_string());
    let labels = Labels::from_model(&model);
    let props = PropertySet::new();

    let dispatcher = Dispatcher::new(
        Settings::default()
            .with_mdp_soln_method(args.method.clone())
            .with_term_crit(args.term_crit.clone())
            .with_term_crit_param(args.epsilon)
            .with_precomputation(!args.no_precomputation)
            .with_generate_strategy(true),
    );

    let goal = StateFormula::label("goal");
    let queries = [
        Property::prob(Some(Opt::Max), goal.clone().eventually()),
        Property::prob(Some(Opt::Min), goal.clone().eventually()),
        Property::prob(Some(Opt::Max), StateFormula::label("ruin").not().globally(None)),
        Property::reward(Some(Opt::Min), RewardPath::Reach(goal.clone())),
    ];
    for property in &queries {
        let result = dispatcher.model_check(&model, &labels, &props, property)?;
        println!(
            "{} = {} ({}, {} iterations, {:?})",
            property, result.value, result.stats.method, result.stats.iterations, result.stats.elapsed
        );
    }

    // Bounded query with strategy synthesis
    let bounded = Property::prob(Some(Opt::Max), goal.eventually_within(args.bound as f64));
    let result = dispatcher.model_check(&model, &labels, &props, &bounded)?;
    println!("{} = {}", bounded, result.value);

    let Some(mut strategy) = result.strategy else {
        println!("No strategy generated");
        return Ok(());
    };
    println!("strategy: {}", strategy.state_description());
    if let Some(path) = &args.export {
        strategy.export_to_file(path)?;
        info!("Strategy exported to {}", path.display());
    }

    // The product with the strategy reproduces the optimal bounded value
    let product = strategy.build_product(&model)?;
    println!("product: {}", product.info_string());
    let product_labels = Labels::from_model(&*product);
    let induced = dispatcher.model_check(&*product, &product_labels, &props, &bounded)?;
    println!("{} under the strategy = {}", bounded, induced.value);

    println!("Total time: {:?}", time_total.elapsed());
    Ok(())
}
