//! Scope construction, model evaluation and output writers.

use crate::common::*;
use crate::coordinates::CoordinateScaling;
use crate::edge_weight::DistanceSource;
use crate::features::FeatureMatrix;
use crate::input::SampleTables;
use crate::metrics::{evaluate_loading, MetricArgs, SpatialMetricBundle};
use crate::scope::{Rectangle, Scope, ScopeArgs};
use crate::topic_model::{TopicFit, TopicModel, TopicModelInput};

use matrix_util::common_io::{mkdir, write_lines};
use serde::Serialize;
use std::time::Instant;

#[derive(Clone, Debug)]
pub struct PipelineParams {
    /// kernel bandwidth φ > 0
    pub phi: f32,
    /// number of topics K ≥ 1
    pub n_topics: usize,
    pub region: Rectangle,
    pub scaling: CoordinateScaling,
    pub distance_source: DistanceSource,
    pub pas_threshold: f32,
}

impl PipelineParams {
    /// Reject invalid parameters before anything is computed
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.phi.is_finite() && self.phi > 0.0) {
            return Err(anyhow::anyhow!("φ must be positive, got {}", self.phi));
        }
        if self.n_topics < 1 {
            return Err(anyhow::anyhow!("K must be at least 1"));
        }
        if !(self.pas_threshold > 0.0 && self.pas_threshold <= 1.0) {
            return Err(anyhow::anyhow!(
                "abnormality threshold must be in (0, 1], got {}",
                self.pas_threshold
            ));
        }
        self.region.validate()
    }

    pub fn scope_args(&self) -> ScopeArgs {
        ScopeArgs {
            phi: self.phi,
            scaling: self.scaling,
            distance_source: self.distance_source,
        }
    }

    pub fn metric_args(&self) -> MetricArgs {
        MetricArgs {
            n_topics: self.n_topics,
            pas_threshold: self.pas_threshold,
        }
    }
}

/// One topic model's output and diagnostics
pub struct ModelEvaluation {
    pub name: Box<str>,
    /// reported by the model if available, otherwise measured
    pub fit_seconds: f64,
    pub fit: TopicFit,
    pub metrics: SpatialMetricBundle,
}

pub struct PipelineOutput {
    pub scope: Scope,
    pub features: FeatureMatrix,
    pub evaluations: Vec<ModelEvaluation>,
}

/// Build the full scope of a sample and restrict it to the region
pub fn prepare_scope(tables: &SampleTables, params: &PipelineParams) -> anyhow::Result<Scope> {
    params.validate()?;
    let full = Scope::from_sample(tables, &params.scope_args())?;
    full.subset(&params.region)
}

/// Fit (or load) every model on one scope and score its loadings.
///
/// * `tables` - raw tables of one sample
/// * `params` - validated before any work is done
/// * `models` - back ends evaluated in order on the same input
pub fn run_pipeline(
    tables: &SampleTables,
    params: &PipelineParams,
    models: &[&dyn TopicModel],
) -> anyhow::Result<PipelineOutput> {
    let scope = prepare_scope(tables, params)?;
    let features = scope.normalized_features();

    if scope.is_empty() {
        warn!("empty scope: skipping {} model(s)", models.len());
        return Ok(PipelineOutput {
            scope,
            features,
            evaluations: vec![],
        });
    }

    info!(
        "scope: {} cells, {} edges, {} features",
        scope.num_cells(),
        scope.edges().len(),
        scope.num_features()
    );

    let input = TopicModelInput {
        scope: &scope,
        features: &features,
        n_topics: params.n_topics,
    };

    let metric_args = params.metric_args();
    let mut evaluations = Vec::with_capacity(models.len());

    for model in models {
        info!("[{}] fitting with K = {}", model.name(), params.n_topics);

        let timer = Instant::now();
        let fit = model.fit(&input)?;
        let measured = timer.elapsed().as_secs_f64();
        let fit_seconds = model.reported_fit_seconds().unwrap_or(measured);

        if let Some(dict) = fit.dictionary.as_ref() {
            if dict.nrows() != scope.num_features() {
                return Err(anyhow::anyhow!(
                    "[{}] dictionary has {} rows for {} features",
                    model.name(),
                    dict.nrows(),
                    scope.num_features()
                ));
            }
        }

        let metrics = evaluate_loading(&scope, &fit.loading, &metric_args)
            .map_err(|e| anyhow::anyhow!("[{}] {}", model.name(), e))?;

        info!(
            "[{}] Moran's I {:.4}, CHAOS {:.6}, PAS {:.4} ({:.2}s)",
            model.name(),
            metrics.moran.global,
            metrics.chaos.global,
            metrics.pas.global,
            fit_seconds
        );

        evaluations.push(ModelEvaluation {
            name: model.name().into(),
            fit_seconds,
            fit,
            metrics,
        });
    }

    Ok(PipelineOutput {
        scope,
        features,
        evaluations,
    })
}

#[derive(Serialize)]
struct ModelSummary<'a> {
    name: &'a str,
    fit_seconds: f64,
    #[serde(flatten)]
    metrics: &'a SpatialMetricBundle,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    sample: &'a str,
    n_cells: usize,
    n_edges: usize,
    n_features: usize,
    n_zero_rows: usize,
    n_topics: usize,
    phi: f32,
    region: [f32; 4],
    models: Vec<ModelSummary<'a>>,
}

/// Topic column names `topic_0 ... topic_{K-1}`
pub fn topic_names(n_topics: usize) -> Vec<Box<str>> {
    (0..n_topics)
        .map(|k| format!("topic_{}", k).into_boxed_str())
        .collect()
}

/// Write the active scope for external fitters
///
/// * `{out}.scope.coord.tsv.gz` - cell, normalized x, y
/// * `{out}.scope.edges.tsv.gz` - src, tgt, distance, weight
/// * `{out}.scope.features.tsv.gz` - row-normalized features
pub fn write_scope(scope: &Scope, features: &FeatureMatrix, out: &str) -> anyhow::Result<()> {
    mkdir(out)?;

    let coord_file = format!("{}.scope.coord.tsv.gz", out);
    let xy: Vec<Box<str>> = vec!["x".into(), "y".into()];
    scope
        .coordinates()
        .write_named(&coord_file, scope.cells(), &xy, "cell")?;

    let edge_file = format!("{}.scope.edges.tsv.gz", out);
    let cells = scope.cells();
    let lines = std::iter::once("src\ttgt\tdistance\tweight".to_string())
        .chain(scope.edges().iter().map(|e| {
            format!(
                "{}\t{}\t{}\t{}",
                cells[e.src], cells[e.tgt], e.distance, e.weight
            )
        }))
        .collect::<Vec<_>>();
    write_lines(&lines, &edge_file)?;

    let feature_file = format!("{}.scope.features.tsv.gz", out);
    features
        .data
        .write_named(&feature_file, scope.cells(), scope.feature_names(), "cell")?;

    info!("wrote {}, {}, {}", coord_file, edge_file, feature_file);
    Ok(())
}

/// Write the per-cell diagnostics of one model
fn write_local(scope: &Scope, eval: &ModelEvaluation, file: &str) -> anyhow::Result<()> {
    let metrics = &eval.metrics;
    let xy = scope.coordinates();

    let header = "cell\tx\ty\ttopic\tmoran_local\tchaos_local\tpas_disagreement\tpas_flag";
    let lines = std::iter::once(header.to_string())
        .chain(scope.cells().iter().enumerate().map(|(i, cell)| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                cell,
                xy[(i, 0)],
                xy[(i, 1)],
                metrics.assignment[i],
                metrics.moran.local[i],
                metrics.chaos.local[i],
                metrics.pas.disagreement[i],
                metrics.pas.abnormal[i] as u8
            )
        }))
        .collect::<Vec<_>>();

    write_lines(&lines, file)
}

/// Write everything a run produced under the `out` prefix
pub fn write_outputs(
    output: &PipelineOutput,
    params: &PipelineParams,
    out: &str,
) -> anyhow::Result<()> {
    mkdir(out)?;

    let scope = &output.scope;
    write_scope(scope, &output.features, out)?;

    let topics = topic_names(params.n_topics);

    for eval in output.evaluations.iter() {
        let name = &eval.name;

        let loading_file = format!("{}.{}.loading.tsv.gz", out, name);
        eval.fit
            .loading
            .write_named(&loading_file, scope.cells(), &topics, "cell")?;

        if let Some(dict) = eval.fit.dictionary.as_ref() {
            let dict_file = format!("{}.{}.dictionary.tsv.gz", out, name);
            dict.write_named(&dict_file, scope.feature_names(), &topics, "feature")?;
        }

        write_local(scope, eval, &format!("{}.{}.local.tsv.gz", out, name))?;
    }

    let region = &params.region;
    let summary = RunSummary {
        sample: scope.sample(),
        n_cells: scope.num_cells(),
        n_edges: scope.edges().len(),
        n_features: scope.num_features(),
        n_zero_rows: output.features.zero_rows.len(),
        n_topics: params.n_topics,
        phi: params.phi,
        region: [region.min_x, region.max_x, region.min_y, region.max_y],
        models: output
            .evaluations
            .iter()
            .map(|eval| ModelSummary {
                name: &eval.name,
                fit_seconds: eval.fit_seconds,
                metrics: &eval.metrics,
            })
            .collect(),
    };

    let summary_file = format!("{}.summary.json", out);
    std::fs::write(&summary_file, serde_json::to_string_pretty(&summary)?)?;
    info!("wrote {}", summary_file);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PipelineParams {
        PipelineParams {
            phi: 1.0,
            n_topics: 2,
            region: Rectangle::unit(),
            scaling: CoordinateScaling::default(),
            distance_source: DistanceSource::default(),
            pas_threshold: 0.5,
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(params().validate().is_ok());

        let mut p = params();
        p.phi = 0.0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.phi = f32::NAN;
        assert!(p.validate().is_err());

        let mut p = params();
        p.n_topics = 0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.region = Rectangle::new(0.8, 0.2, 0.0, 1.0);
        assert!(p.validate().is_err());

        let mut p = params();
        p.pas_threshold = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn topic_column_names() {
        let names = topic_names(3);
        assert_eq!(names.len(), 3);
        assert_eq!(names[2].as_ref(), "topic_2");
    }
}
