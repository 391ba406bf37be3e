use std::collections::VecDeque;

use ahash::AHashMap;

mod parse;
mod error;

pub use error::TreeError;

/// A node of a rooted phylogeny.
#[derive(Debug, Clone, PartialEq)]
pub struct Clade {
    pub name: Option<String>,
    pub branch_length: f64,
    pub children: Vec<Clade>,
}

impl Clade {
    #[must_use]
    pub fn leaf(name: &str, branch_length: f64) -> Self {
        Self { name: Some(name.to_string()), branch_length, children: Vec::new() }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A rooted phylogenetic tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub root: Clade,
}

impl Tree {
    /// Parse a newick-formatted tree.
    pub fn from_newick(text: &str) -> Result<Self, TreeError> {
        parse::newick(text).map(|root| Self { root })
    }

    /// Star topology: `n` leaves hanging directly off the root, each with
    /// branch length `depth`.
    #[must_use]
    pub fn star(n: usize, depth: f64) -> Self {
        let children = (0..n)
            .map(|i| Clade::leaf(&format!("C{i}"), depth))
            .collect();
        Self { root: Clade { name: Some("root".to_string()), branch_length: 0.0, children } }
    }

    /// Balanced binary topology reaching at least `n` leaves, total depth
    /// `depth` spread evenly over the levels.
    #[must_use]
    pub fn binary(n: usize, depth: f64) -> Self {
        let splits = (n as f64).log2().ceil().max(0.0) as usize;
        let per_level = if splits == 0 { 0.0 } else { depth / splits as f64 };

        fn fill(parent: &mut Clade, splits: usize, per_level: f64) {
            if splits == 0 {
                return;
            }
            let stem = parent.name.clone().unwrap_or_default();
            let mut left = Clade { name: Some(format!("{stem}A")), branch_length: per_level, children: Vec::new() };
            let mut right = Clade { name: Some(format!("{stem}B")), branch_length: per_level, children: Vec::new() };
            fill(&mut left, splits - 1, per_level);
            fill(&mut right, splits - 1, per_level);
            parent.children = vec![left, right];
        }

        let mut root = Clade { name: Some("root".to_string()), branch_length: 0.0, children: Vec::new() };
        fill(&mut root, splits, per_level);
        Self { root }
    }

    /// Reroot so that the clades named in `id0` become direct children of a
    /// synthetic root, each with branch length zero.
    pub fn reroot(&self, id0: &[String]) -> Result<Self, TreeError> {
        let mut by_name: AHashMap<&str, &Clade> = AHashMap::new();
        let mut queue = VecDeque::from([&self.root]);
        while let Some(clade) = queue.pop_front() {
            if let Some(name) = &clade.name {
                by_name.insert(name.as_str(), clade);
            }
            queue.extend(clade.children.iter());
        }

        let mut children = Vec::with_capacity(id0.len());
        for id in id0 {
            let mut clade = (*by_name
                .get(id.as_str())
                .ok_or_else(|| TreeError::UnknownCladeId(id.clone()))?)
            .clone();
            clade.branch_length = 0.0;
            children.push(clade);
        }

        Ok(Self { root: Clade { name: Some("root".to_string()), branch_length: 0.0, children } })
    }

    /// Flatten to breadth-first vertex arrays.
    #[must_use]
    pub fn flatten_bfs(&self) -> FlatTree {
        let mut n_children = Vec::new();
        let mut branch_lengths = Vec::new();
        let mut leaf_ids = Vec::new();

        let mut queue = VecDeque::from([&self.root]);
        while let Some(clade) = queue.pop_front() {
            n_children.push(clade.children.len());
            branch_lengths.push(clade.branch_length);
            if clade.is_leaf() {
                leaf_ids.push(clade.name.clone().unwrap_or_default());
            }
            queue.extend(clade.children.iter());
        }
        // The root never evolves away from the ancestral sequence.
        branch_lengths[0] = 0.0;

        FlatTree { n_children, branch_lengths, leaf_ids }
    }

    /// Minimum and maximum root-to-leaf depth.
    #[must_use]
    pub fn child_depth_range(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        let mut level = vec![(0.0, &self.root)];
        while !level.is_empty() {
            let mut next = Vec::new();
            for (depth, clade) in level {
                let depth = depth + clade.branch_length;
                if clade.is_leaf() {
                    min = min.min(depth);
                    max = max.max(depth);
                } else {
                    next.extend(clade.children.iter().map(|c| (depth, c)));
                }
            }
            level = next;
        }
        (min, max)
    }
}

/// A tree flattened in breadth-first order.
///
/// Children of vertex `v` occupy a contiguous index range; vertex 0 is the
/// root. This is the only representation the sampler consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTree {
    n_children: Vec<usize>,
    branch_lengths: Vec<f64>,
    leaf_ids: Vec<String>,
}

impl FlatTree {
    #[must_use] pub fn n_vertices(&self) -> usize { self.n_children.len() }
    #[must_use] pub fn n_leaves(&self) -> usize { self.leaf_ids.len() }
    #[must_use] pub fn n_children(&self, vertex: usize) -> usize { self.n_children[vertex] }
    #[must_use] pub fn branch_length(&self, vertex: usize) -> f64 { self.branch_lengths[vertex] }
    #[must_use] pub fn leaf_ids(&self) -> &[String] { &self.leaf_ids }

    /// Mean branch length over the non-root vertices.
    #[must_use]
    pub fn mean_branch_length(&self) -> f64 {
        if self.n_vertices() < 2 {
            return 0.0;
        }
        self.branch_lengths[1..].iter().sum::<f64>() / (self.n_vertices() - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn star_tree_shape() {
        let flat = Tree::star(5, 0.3).flatten_bfs();
        assert_eq!(flat.n_vertices(), 6);
        assert_eq!(flat.n_leaves(), 5);
        assert_eq!(flat.n_children(0), 5);
        assert_approx_eq!(f64, flat.branch_length(1), 0.3);
        assert_eq!(flat.leaf_ids()[0], "C0");
    }

    #[test]
    fn binary_tree_has_power_of_two_leaves() {
        let flat = Tree::binary(6, 1.0).flatten_bfs();
        assert_eq!(flat.n_leaves(), 8);
        // 3 levels of splits: 1 + 2 + 4 + 8 vertices.
        assert_eq!(flat.n_vertices(), 15);
        assert_approx_eq!(f64, flat.branch_length(1), 1.0 / 3.0);
    }

    #[test]
    fn bfs_children_are_contiguous() {
        let tree = Tree::from_newick("((A:0.1,B:0.2):0.3,(C:0.4):0.5):0.0;").unwrap();
        let flat = tree.flatten_bfs();
        // BFS: root, inner1, inner2, A, B, C.
        assert_eq!(flat.n_vertices(), 6);
        assert_eq!(flat.n_children(0), 2);
        assert_eq!(flat.n_children(1), 2);
        assert_eq!(flat.n_children(2), 1);
        assert_approx_eq!(f64, flat.branch_length(3), 0.1);
        assert_approx_eq!(f64, flat.branch_length(5), 0.4);
        assert_eq!(flat.leaf_ids(), &["A".to_string(), "B".to_string(), "C".to_string()]);
    }

    #[test]
    fn reroot_zeroes_the_selected_branches() {
        let tree = Tree::from_newick("((A:0.1,B:0.2)ab:0.3,C:0.4)root:0.0;").unwrap();
        let rerooted = tree.reroot(&["ab".to_string(), "C".to_string()]).unwrap();
        let flat = rerooted.flatten_bfs();
        assert_eq!(flat.n_children(0), 2);
        assert_approx_eq!(f64, flat.branch_length(1), 0.0);
        assert_approx_eq!(f64, flat.branch_length(2), 0.0);
        // The A/B subtree keeps its internal branch lengths.
        assert_approx_eq!(f64, flat.branch_length(3), 0.1);
        assert_eq!(flat.n_leaves(), 3);
    }

    #[test]
    fn reroot_on_unknown_id_fails() {
        let tree = Tree::star(3, 1.0);
        let err = tree.reroot(&["missing".to_string()]).unwrap_err();
        assert!(matches!(err, TreeError::UnknownCladeId(id) if id == "missing"));
    }

    #[test]
    fn depth_range() {
        let tree = Tree::from_newick("((A:0.1,B:0.2):0.3,C:0.4);").unwrap();
        let (min, max) = tree.child_depth_range();
        assert_approx_eq!(f64, min, 0.4);
        assert_approx_eq!(f64, max, 0.5);
    }
}
