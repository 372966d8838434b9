//! Sparse adjacency over the weighted edges of a scope.

use crate::common::*;

use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// A directed spatial edge between two cells of the same scope
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedEdge {
    pub src: usize,
    pub tgt: usize,
    /// raw edge length the weight was derived from
    pub distance: f32,
    pub weight: f32,
}

#[derive(Clone, Debug)]
pub struct SpatialGraph {
    /// CSR adjacency matrix (n_nodes x n_nodes); row = source cell
    pub adjacency: CsrMatrix<f32>,
    /// Number of nodes
    pub n_nodes: usize,
    /// Number of duplicate `(src, tgt)` entries replaced by a later edge
    pub n_overwritten: usize,
}

impl SpatialGraph {
    /// Build a sparse adjacency matrix from a weighted edge list.
    ///
    /// Duplicate `(src, tgt)` pairs follow last-write-wins: the last
    /// occurrence in `edges` supplies the stored weight. Runs in time
    /// linear in the number of edges.
    ///
    /// * `edges` - weighted edges with endpoints in `0..n_nodes`
    /// * `n_nodes` - number of cells in scope
    pub fn from_edges(edges: &[WeightedEdge], n_nodes: usize) -> anyhow::Result<SpatialGraph> {
        let mut pair_weight: HashMap<(usize, usize), f32> = HashMap::default();
        pair_weight.reserve(edges.len());

        let mut n_overwritten = 0;

        for e in edges {
            if e.src >= n_nodes || e.tgt >= n_nodes {
                return Err(anyhow::anyhow!(
                    "edge ({}, {}) out of range for {} cells",
                    e.src,
                    e.tgt,
                    n_nodes
                ));
            }
            if pair_weight.insert((e.src, e.tgt), e.weight).is_some() {
                n_overwritten += 1;
            }
        }

        if n_overwritten > 0 {
            warn!(
                "{} duplicate edge(s) overwritten by a later occurrence",
                n_overwritten
            );
        }

        let mut coo = CooMatrix::new(n_nodes, n_nodes);
        for (&(i, j), &w) in pair_weight.iter() {
            coo.push(i, j, w);
        }

        let adjacency = CsrMatrix::from(&coo);

        debug!(
            "spatial graph: {} nodes, {} stored edges",
            n_nodes,
            adjacency.nnz()
        );

        Ok(SpatialGraph {
            adjacency,
            n_nodes,
            n_overwritten,
        })
    }

    /// Outgoing neighbours of a node and the corresponding weights
    pub fn out_neighbors(&self, node: usize) -> (&[usize], &[f32]) {
        let offsets = self.adjacency.row_offsets();
        let start = offsets[node];
        let end = offsets[node + 1];
        (
            &self.adjacency.col_indices()[start..end],
            &self.adjacency.values()[start..end],
        )
    }

    /// Neighbour lists treating every stored edge as undirected.
    /// Self loops are dropped and each list is sorted and unique.
    pub fn undirected_neighbors(&self) -> Vec<Vec<usize>> {
        let mut nbrs = vec![vec![]; self.n_nodes];
        for i in 0..self.n_nodes {
            let (targets, _) = self.out_neighbors(i);
            for &j in targets {
                if i != j {
                    nbrs[i].push(j);
                    nbrs[j].push(i);
                }
            }
        }
        for nb in nbrs.iter_mut() {
            nb.sort_unstable();
            nb.dedup();
        }
        nbrs
    }

    /// Sum of all stored edge weights (`S0`)
    pub fn total_weight(&self) -> f32 {
        self.adjacency.values().iter().sum()
    }

    pub fn nnz(&self) -> usize {
        self.adjacency.nnz()
    }

    pub fn num_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn num_overwritten(&self) -> usize {
        self.n_overwritten
    }

    /// Stored weight of `(src, tgt)`, if any
    pub fn weight(&self, src: usize, tgt: usize) -> Option<f32> {
        let (targets, weights) = self.out_neighbors(src);
        targets
            .binary_search(&tgt)
            .ok()
            .map(|pos| weights[pos])
    }
}
