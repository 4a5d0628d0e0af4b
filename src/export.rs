use crate::environment::Environment;
use crate::error::Result;
use crate::tree::SearchTree;
use std::fmt::Write;

/// Renders the tree below the current root as an undirected Graphviz graph.
///
/// Every node is labelled with the action that produced it, its visit count, its reward
/// sum and the variance of its rewards. The output is meant for offline inspection and has
/// no stable format.
pub fn to_graphviz<E: Environment>(tree: &SearchTree<E>) -> Result<String> {
    let mut out = String::from("graph {\n");
    let mut stack = vec![tree.root()?];

    while let Some(node) = stack.pop() {
        let data = node.value();
        let action = match &data.action {
            Some(action) => format!("{:?}", action),
            None => "root".to_string(),
        };
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "  {} [label=\"{}\\nn: {} q: {} var: {:.2}\"]",
            data.id,
            escape(&action),
            data.visits,
            data.reward_sum,
            data.reward_variance()
        );

        for child in node.children() {
            let _ = writeln!(out, "  {} -- {}", data.id, child.value().id);
        }
        stack.extend(node.children().rev());
    }

    out.push_str("}\n");
    Ok(out)
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
