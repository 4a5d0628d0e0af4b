use mcts_planner::config::SearchConfig;
use mcts_planner::environments::synthetic::SyntheticTree;
use mcts_planner::error::Result;
use mcts_planner::mcts::MonteCarloTreeSearch;
use mcts_planner::random::SeededRandomGenerator;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut mcts = MonteCarloTreeSearch::builder(SyntheticTree::new(2024)?)
        .with_random_generator(SeededRandomGenerator::new(2024))
        .with_config(SearchConfig::for_benchmark())
        .build()?;
    let outcome = mcts.run_once(10_000)?;

    // Depths of the terminal nodes the search reached
    let depths: Vec<u32> = mcts
        .get_tree()
        .live_nodes()
        .filter(|node| node.is_terminal)
        .map(|node| node.state.depth())
        .collect();
    let deepest = depths.iter().max().copied().unwrap_or(0);

    println!(
        "best reward {:.2} after {} moves ({:?}), {} terminal nodes, deepest at {}",
        outcome.reward,
        outcome.actions.len(),
        outcome.source,
        depths.len(),
        deepest
    );

    Ok(())
}
