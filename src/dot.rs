//! Cube index to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - **Decision nodes** are circles labeled with their register, `r<var>`
//! - **Bucket lists** are records listing their cubes, head first; garbage cubes are struck
//!   out with a `~` prefix
//! - **Edges**: dashed for the 0-branch, solid for the 1-branch, dotted for the `-` branch
//!
//! ```text
//! let dot = index.to_dot(&arena)?;
//! // Write to file and render with: dot -Tpng index.dot -o index.png
//! ```

use std::fmt::Write as _;

use crate::arena::{Arena, BRANCH_DASH, BRANCH_ONE, BRANCH_ZERO};
use crate::handle::Handle;
use crate::index::CubeIndex;

#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for decision nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for bucket lists (default: "record")
    pub list_shape: &'static str,
    pub zero_edge_style: &'static str,
    pub one_edge_style: &'static str,
    pub dash_edge_style: &'static str,
    /// Whether garbage cubes are listed (default: false)
    pub show_garbage: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            list_shape: "record",
            zero_edge_style: "dashed",
            one_edge_style: "solid",
            dash_edge_style: "dotted",
            show_garbage: false,
        }
    }
}

impl CubeIndex {
    pub fn to_dot(&self, arena: &Arena) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(arena, &DotConfig::default())
    }

    pub fn to_dot_with_config(&self, arena: &Arena, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;
        if self.is_tree() {
            write_node(&mut dot, arena, self.root(), config)?;
        } else {
            write_list(&mut dot, arena, "root", self.root(), config)?;
        }
        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

fn write_node(dot: &mut String, arena: &Arena, node: Handle, config: &DotConfig) -> std::fmt::Result {
    let id = format!("n{}", node.id());
    let n = *arena.node(node);
    writeln!(dot, "{} [label=\"r{}\"];", id, n.var)?;
    for (k, style) in [
        (BRANCH_ZERO, config.zero_edge_style),
        (BRANCH_ONE, config.one_edge_style),
        (BRANCH_DASH, config.dash_edge_style),
    ] {
        let child = if n.has_subtree(k) {
            write_node(dot, arena, n.branches[k], config)?;
            format!("n{}", n.branches[k].id())
        } else {
            let name = format!("{}_{}", id, k);
            write_list(dot, arena, &name, n.branches[k], config)?;
            name
        };
        writeln!(dot, "{} -> {} [style={}];", id, child, style)?;
    }
    Ok(())
}

fn write_list(dot: &mut String, arena: &Arena, name: &str, head: Handle, config: &DotConfig) -> std::fmt::Result {
    let cubes: Vec<String> = arena
        .list(head)
        .filter(|&c| config.show_garbage || !arena.is_garbage(c))
        .map(|c| {
            let mark = if arena.is_garbage(c) { "~" } else { "" };
            format!("{}{}", mark, arena.to_cube(c))
        })
        .collect();
    let label = if cubes.is_empty() {
        "(empty)".to_string()
    } else {
        cubes.join("|")
    };
    writeln!(dot, "{} [shape={}, label=\"{{{}}}\"];", name, config.list_shape, label)
}
