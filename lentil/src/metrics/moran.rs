use crate::common::*;
use crate::spatial_graph::SpatialGraph;

use serde::Serialize;

/// Variance below this is treated as a constant signal
const ZERO_VARIANCE: f64 = 1e-12;

/// Moran's I of every topic column of a loading matrix
#[derive(Clone, Debug, Serialize)]
pub struct MoranResult {
    /// mean of `per_topic`
    pub global: f32,
    /// global Moran's I of each loading column
    pub per_topic: Vec<f32>,
    /// per-cell local I, averaged over topics
    #[serde(skip)]
    pub local: Vec<f32>,
}

/// Global and local Moran's I of one value per cell.
///
/// With `z` the centred values, `m2 = Σ z² / n` and `S0 = Σ w_ij`:
///
/// ```text
/// I_i = z_i Σ_j w_ij z_j / m2
/// I   = Σ_i I_i / S0
/// ```
///
/// Constant values or a graph without edges give 0 everywhere.
pub fn moran_scores(values: &[f32], graph: &SpatialGraph) -> anyhow::Result<(f32, Vec<f32>)> {
    let nn = values.len();

    if graph.num_nodes() != nn {
        return Err(anyhow::anyhow!(
            "{} values for a graph of {} cells",
            nn,
            graph.num_nodes()
        ));
    }

    if nn == 0 {
        return Ok((0.0, vec![]));
    }

    let mean = values.iter().map(|&x| x as f64).sum::<f64>() / nn as f64;
    let z: Vec<f64> = values.iter().map(|&x| x as f64 - mean).collect();
    let m2 = z.iter().map(|x| x * x).sum::<f64>() / nn as f64;
    let s0 = graph.total_weight() as f64;

    if m2 <= ZERO_VARIANCE || s0 <= 0.0 {
        return Ok((0.0, vec![0.0; nn]));
    }

    let local: Vec<f64> = (0..nn)
        .map(|i| {
            let (nbrs, weights) = graph.out_neighbors(i);
            let lag: f64 = nbrs
                .iter()
                .zip(weights)
                .map(|(&j, &w)| w as f64 * z[j])
                .sum();
            z[i] * lag / m2
        })
        .collect();

    let global = local.iter().sum::<f64>() / s0;

    Ok((global as f32, local.into_iter().map(|x| x as f32).collect()))
}

/// Moran's I for each column of an `n x K` loading matrix
pub fn topic_moran(loading: &Mat, graph: &SpatialGraph) -> anyhow::Result<MoranResult> {
    let nn = loading.nrows();
    let kk = loading.ncols();

    let mut per_topic = Vec::with_capacity(kk);
    let mut local = vec![0.0f32; nn];

    for col in loading.column_iter() {
        let values: Vec<f32> = col.iter().copied().collect();
        let (global_k, local_k) = moran_scores(&values, graph)?;
        per_topic.push(global_k);
        for (acc, x) in local.iter_mut().zip(local_k) {
            *acc += x;
        }
    }

    if kk > 0 {
        local.iter_mut().for_each(|x| *x /= kk as f32);
    }

    let global = if kk > 0 {
        per_topic.iter().sum::<f32>() / kk as f32
    } else {
        0.0
    };

    Ok(MoranResult {
        global,
        per_topic,
        local,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial_graph::WeightedEdge;
    use approx::assert_abs_diff_eq;

    /// path 0 - 1 - 2 - ... - (n-1), both directions, unit weights
    fn path_graph(nn: usize) -> SpatialGraph {
        let mut edges = vec![];
        for i in 1..nn {
            for (src, tgt) in [(i - 1, i), (i, i - 1)] {
                edges.push(WeightedEdge {
                    src,
                    tgt,
                    distance: 1.0,
                    weight: 1.0,
                });
            }
        }
        SpatialGraph::from_edges(&edges, nn).unwrap()
    }

    #[test]
    fn constant_values_give_zero() {
        let graph = path_graph(5);
        let (global, local) = moran_scores(&[0.3; 5], &graph).unwrap();
        assert_eq!(global, 0.0);
        assert!(local.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn smooth_signal_is_positive_alternating_is_negative() {
        let graph = path_graph(6);

        let (smooth, _) = moran_scores(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0], &graph).unwrap();
        assert!(smooth > 0.5);

        let (alternating, _) = moran_scores(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0], &graph).unwrap();
        assert_abs_diff_eq!(alternating, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn local_values_sum_to_global_times_total_weight() {
        let graph = path_graph(5);
        let values = [0.1, 0.7, 0.2, 0.9, 0.4];
        let (global, local) = moran_scores(&values, &graph).unwrap();
        let total: f32 = local.iter().sum();
        assert_abs_diff_eq!(total / graph.total_weight(), global, epsilon = 1e-5);
    }

    #[test]
    fn no_edges_gives_zero() {
        let graph = SpatialGraph::from_edges(&[], 3).unwrap();
        let (global, local) = moran_scores(&[0.0, 1.0, 2.0], &graph).unwrap();
        assert_eq!(global, 0.0);
        assert_eq!(local, vec![0.0; 3]);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let graph = path_graph(3);
        assert!(moran_scores(&[0.0, 1.0], &graph).is_err());
    }

    #[test]
    fn topic_moran_averages_columns() {
        let graph = path_graph(4);
        let loading = Mat::from_row_slice(
            4,
            2,
            &[
                1.0, 0.5, //
                1.0, 0.5, //
                0.0, 0.5, //
                0.0, 0.5,
            ],
        );
        let res = topic_moran(&loading, &graph).unwrap();
        assert_eq!(res.per_topic.len(), 2);
        assert_eq!(res.per_topic[1], 0.0);
        assert_abs_diff_eq!(res.global, res.per_topic[0] / 2.0, epsilon = 1e-6);
        assert_eq!(res.local.len(), 4);
    }
}
