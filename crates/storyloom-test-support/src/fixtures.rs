//! Story fixtures.

use storyloom_core::node::{Choice, Node};

/// Story id used by the forest fixture.
pub const FOREST_STORY: &str = "forest";

/// The four-node forest graph: `A` branches to `B` and `C`, both of which
/// lead to the ending `D`.
#[must_use]
pub fn forest_nodes() -> Vec<Node> {
    vec![
        Node::new("A")
            .with_line("Narrator", "The path **forks** beneath the pines.")
            .with_choice(Choice::to("Take the left path", "B"))
            .with_choice(Choice::to("Take the right path", "C")),
        Node::new("B")
            .with_line("Narrator", "A quiet stream.")
            .with_next("D"),
        Node::new("C")
            .with_line("Narrator", "An old watchtower.")
            .with_next("D"),
        Node::new("D")
            .with_line("Narrator", "The forest opens onto the sea.")
            .with_choice(Choice::exit("The End")),
    ]
}
