use crate::common::*;

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;
use serde::Serialize;

/// Spatial fragmentation of topic domains (CHAOS); lower is more compact
#[derive(Clone, Debug, Serialize)]
pub struct ChaosResult {
    /// `Σ_i d_i / n`
    pub global: f32,
    /// each topic's share of the global score
    pub per_topic: Vec<f32>,
    /// distance from each cell to the nearest other cell of its topic
    #[serde(skip)]
    pub local: Vec<f32>,
}

/// CHAOS score of a hard topic assignment.
///
/// For every topic with at least two cells, each member contributes the
/// Euclidean distance to its nearest other member. Members of topics
/// with fewer than two cells contribute 0. All cells sharing one topic
/// gives the smallest attainable score for the given coordinates.
///
/// * `assignment` - topic index per cell
/// * `coordinates` - `n x 2` normalized coordinates
/// * `n_topics` - number of topics `K`
pub fn chaos_score(
    assignment: &[usize],
    coordinates: &Mat,
    n_topics: usize,
) -> anyhow::Result<ChaosResult> {
    let nn = assignment.len();

    if coordinates.nrows() != nn || coordinates.ncols() != 2 {
        return Err(anyhow::anyhow!(
            "{} assignments for a {} x {} coordinate matrix",
            nn,
            coordinates.nrows(),
            coordinates.ncols()
        ));
    }

    let mut members: Vec<Vec<usize>> = vec![vec![]; n_topics];
    for (i, &k) in assignment.iter().enumerate() {
        if k >= n_topics {
            return Err(anyhow::anyhow!(
                "cell {} assigned to topic {} but K = {}",
                i,
                k,
                n_topics
            ));
        }
        members[k].push(i);
    }

    let mut local = vec![0.0f32; nn];
    let mut per_topic = vec![0.0f32; n_topics];

    for (k, cells) in members.iter().enumerate() {
        if cells.len() < 2 {
            continue;
        }

        let points: Vec<[f32; 2]> = cells
            .iter()
            .map(|&i| [coordinates[(i, 0)], coordinates[(i, 1)]])
            .collect();

        for (&i, d) in cells.iter().zip(nearest_member_distances(&points)) {
            local[i] = d;
            per_topic[k] += d;
        }
    }

    if nn == 0 {
        return Ok(ChaosResult {
            global: 0.0,
            per_topic,
            local,
        });
    }

    per_topic.iter_mut().for_each(|x| *x /= nn as f32);
    let global = per_topic.iter().sum();

    Ok(ChaosResult {
        global,
        per_topic,
        local,
    })
}

/// Exact distance from each point to its nearest other point, via an
/// immutable k-d tree built over the members of one topic.
///
/// Coincident points are at distance 0 from each other.
fn nearest_member_distances(points: &[[f32; 2]]) -> Vec<f32> {
    if points.len() < 2 {
        return vec![0.0; points.len()];
    }

    let tree: ImmutableKdTree<f32, u32, 2, 32> = ImmutableKdTree::new_from_slice(points);

    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            tree.nearest_n::<SquaredEuclidean>(p, 2)
                .into_iter()
                .find(|nn| nn.item as usize != i)
                .map(|nn| nn.distance.sqrt())
                .unwrap_or(0.0)
        })
        .collect()
}
