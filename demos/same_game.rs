use mcts_planner::config::SearchConfig;
use mcts_planner::environment::Environment;
use mcts_planner::environments::same_game::SameGame;
use mcts_planner::error::Result;
use mcts_planner::mcts::{MonteCarloTreeSearch, ReplanMode};
use mcts_planner::random::SeededRandomGenerator;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // A 7x7 board with 5 colors
    let board = SameGame::new(7, 7, 5, 32)?;
    println!("{}", board);

    // Single-shot search with rollouts that steer around the most common color
    let config = SearchConfig::default().with_biased_rollouts(true);
    let mut mcts = MonteCarloTreeSearch::builder(board.clone())
        .with_random_generator(SeededRandomGenerator::new(1))
        .with_config(config.clone())
        .build()?;
    let outcome = mcts.run_once(20_000)?;

    println!(
        "single shot: {} moves, reward {} ({:?}, {} nodes)",
        outcome.actions.len(),
        outcome.reward,
        outcome.source,
        outcome.nodes_created
    );

    // Replay the sequence to check the score
    let mut replay = board.clone();
    for (i, action) in outcome.actions.iter().enumerate() {
        replay.step(action)?;
        println!("{:>3}: remove {:?} -> {}", i + 1, action, replay.cumulative_reward());
    }
    println!("{}", replay);

    // Replanning with a fresh tree after every move
    let mut mcts = MonteCarloTreeSearch::builder(board)
        .with_random_generator(SeededRandomGenerator::new(1))
        .with_config(config)
        .build()?;
    let outcome = mcts.run_replanning(2_000, ReplanMode::Reset)?;

    println!(
        "replanning: {} moves, reward {} ({:?})",
        outcome.actions.len(),
        outcome.reward,
        outcome.source
    );

    Ok(())
}
