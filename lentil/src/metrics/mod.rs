//! Spatial coherence diagnostics of a topic loading matrix.
//!
//! All three scores read the same [`Scope`]: loading rows, graph nodes
//! and coordinate rows must share its cell ordering.

pub mod chaos;
pub mod moran;
pub mod pas;

pub use chaos::{chaos_score, ChaosResult};
pub use moran::{moran_scores, topic_moran, MoranResult};
pub use pas::{pas_score, PasResult};

use crate::common::*;
use crate::scope::Scope;

use serde::Serialize;

/// Default disagreement fraction above which a cell is abnormal
pub const DEFAULT_PAS_THRESHOLD: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct MetricArgs {
    pub n_topics: usize,
    pub pas_threshold: f32,
}

/// All diagnostics of one loading matrix
#[derive(Clone, Debug, Serialize)]
pub struct SpatialMetricBundle {
    pub moran: MoranResult,
    pub chaos: ChaosResult,
    pub pas: PasResult,
    /// arg-max topic per cell
    #[serde(skip)]
    pub assignment: Vec<usize>,
}

/// Check that an `n x K` loading matrix fits the scope
pub fn validate_loading(scope: &Scope, loading: &Mat, n_topics: usize) -> anyhow::Result<()> {
    if loading.nrows() != scope.num_cells() {
        return Err(anyhow::anyhow!(
            "loading matrix has {} rows, scope has {} cells",
            loading.nrows(),
            scope.num_cells()
        ));
    }
    if loading.ncols() != n_topics {
        return Err(anyhow::anyhow!(
            "loading matrix has {} columns, expected K = {}",
            loading.ncols(),
            n_topics
        ));
    }
    if loading.iter().any(|x| !x.is_finite()) {
        return Err(anyhow::anyhow!("loading matrix has non-finite entries"));
    }
    Ok(())
}

/// Compute Moran's I, CHAOS and PAS for one loading matrix.
///
/// * `scope` - cells, coordinates and graph the loading rows refer to
/// * `loading` - `n x K` topic membership weights
/// * `args` - topic count and abnormality threshold
pub fn evaluate_loading(
    scope: &Scope,
    loading: &Mat,
    args: &MetricArgs,
) -> anyhow::Result<SpatialMetricBundle> {
    validate_loading(scope, loading, args.n_topics)?;

    let assignment = loading.argmax_rows();

    let moran = topic_moran(loading, scope.graph())?;
    let chaos = chaos_score(&assignment, scope.coordinates(), args.n_topics)?;
    let pas = pas_score(&assignment, scope.graph(), args.pas_threshold)?;

    debug!(
        "moran {:.4}, chaos {:.6}, pas {:.4}",
        moran.global, chaos.global, pas.global
    );

    Ok(SpatialMetricBundle {
        moran,
        chaos,
        pas,
        assignment,
    })
}
