use crate::spatial_graph::SpatialGraph;

use serde::Serialize;

/// Boundary abnormality (PAS): cells that disagree with their neighbourhood
#[derive(Clone, Debug, Serialize)]
pub struct PasResult {
    /// fraction of cells flagged
    pub global: f32,
    pub n_abnormal: usize,
    /// fraction of each cell's neighbours with another topic
    #[serde(skip)]
    pub disagreement: Vec<f32>,
    #[serde(skip)]
    pub abnormal: Vec<bool>,
}

/// PAS score of a hard topic assignment.
///
/// Neighbours are taken from the graph with edge direction ignored. A
/// cell is abnormal when the fraction of neighbours assigned to another
/// topic is strictly greater than `threshold`. Isolated cells are never
/// abnormal.
///
/// * `assignment` - topic index per cell
/// * `graph` - spatial adjacency over the same cells
/// * `threshold` - disagreement fraction in `(0, 1]`
pub fn pas_score(
    assignment: &[usize],
    graph: &SpatialGraph,
    threshold: f32,
) -> anyhow::Result<PasResult> {
    let nn = assignment.len();

    if graph.num_nodes() != nn {
        return Err(anyhow::anyhow!(
            "{} assignments for a graph of {} cells",
            nn,
            graph.num_nodes()
        ));
    }

    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(anyhow::anyhow!(
            "abnormality threshold must be in (0, 1], got {}",
            threshold
        ));
    }

    let disagreement: Vec<f32> = graph
        .undirected_neighbors()
        .iter()
        .enumerate()
        .map(|(i, nbrs)| {
            if nbrs.is_empty() {
                return 0.0;
            }
            let n_diff = nbrs
                .iter()
                .filter(|&&j| assignment[j] != assignment[i])
                .count();
            n_diff as f32 / nbrs.len() as f32
        })
        .collect();

    let abnormal: Vec<bool> = disagreement.iter().map(|&f| f > threshold).collect();
    let n_abnormal = abnormal.iter().filter(|&&a| a).count();

    let global = if nn > 0 {
        n_abnormal as f32 / nn as f32
    } else {
        0.0
    };

    Ok(PasResult {
        global,
        n_abnormal,
        disagreement,
        abnormal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial_graph::WeightedEdge;

    /// rows x cols lattice with 4-neighbour edges stored once (i < j)
    fn lattice(rows: usize, cols: usize) -> SpatialGraph {
        let mut edges = vec![];
        let mut push = |src: usize, tgt: usize| {
            edges.push(WeightedEdge {
                src,
                tgt,
                distance: 1.0,
                weight: 1.0,
            })
        };
        for r in 0..rows {
            for c in 0..cols {
                let i = r * cols + c;
                if c + 1 < cols {
                    push(i, i + 1);
                }
                if r + 1 < rows {
                    push(i, i + cols);
                }
            }
        }
        SpatialGraph::from_edges(&edges, rows * cols).unwrap()
    }

    #[test]
    fn checkerboard_is_fully_abnormal() {
        let graph = lattice(5, 6);
        let checker: Vec<usize> = (0..30).map(|i| (i % 6 + i / 6) % 2).collect();
        let res = pas_score(&checker, &graph, 0.5).unwrap();
        assert_eq!(res.global, 1.0);
        assert_eq!(res.n_abnormal, 30);
        assert!(res.disagreement.iter().all(|&f| f == 1.0));
    }

    #[test]
    fn uniform_assignment_is_never_abnormal() {
        let graph = lattice(5, 6);
        let res = pas_score(&[2; 30], &graph, 0.5).unwrap();
        assert_eq!(res.global, 0.0);
        assert!(res.abnormal.iter().all(|a| !a));
    }

    #[test]
    fn isolated_cells_are_not_abnormal() {
        let graph = SpatialGraph::from_edges(&[], 3).unwrap();
        let res = pas_score(&[0, 1, 0], &graph, 0.5).unwrap();
        assert_eq!(res.global, 0.0);
        assert_eq!(res.disagreement, vec![0.0; 3]);
    }

    #[test]
    fn threshold_is_strict() {
        // 0 - 1 - 2: the middle cell disagrees with exactly half
        let graph = lattice(1, 3);
        let res = pas_score(&[0, 0, 1], &graph, 0.5).unwrap();
        assert_eq!(res.disagreement[1], 0.5);
        assert!(!res.abnormal[1]);
        assert!(res.abnormal[2]);
        assert!(!res.abnormal[0]);
    }

    #[test]
    fn invalid_inputs() {
        let graph = lattice(2, 2);
        assert!(pas_score(&[0, 0, 0], &graph, 0.5).is_err());
        assert!(pas_score(&[0; 4], &graph, 0.0).is_err());
        assert!(pas_score(&[0; 4], &graph, 1.5).is_err());
    }
}
