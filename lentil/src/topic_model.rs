//! Boundary to external topic-model back ends.
//!
//! Fitting happens elsewhere. A back end only has to produce an
//! `n x K` loading matrix in the scope's cell order and, optionally, a
//! feature dictionary. [`TopicFit::canonical`] converts either
//! dictionary layout into one feature-by-topic shape so the rest of
//! the pipeline never branches on the back end.

use crate::common::*;
use crate::features::FeatureMatrix;
use crate::scope::Scope;
use crate::spatial_graph::{SpatialGraph, WeightedEdge};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a back end receives
pub struct TopicModelInput<'a> {
    pub scope: &'a Scope,
    pub features: &'a FeatureMatrix,
    pub n_topics: usize,
}

impl TopicModelInput<'_> {
    pub fn edges(&self) -> &[WeightedEdge] {
        self.scope.edges()
    }

    pub fn graph(&self) -> &SpatialGraph {
        self.scope.graph()
    }
}

pub trait TopicModel {
    fn name(&self) -> &str;

    /// Blocking fit; returns loadings aligned to `input.scope`
    fn fit(&self, input: &TopicModelInput) -> anyhow::Result<TopicFit>;

    /// Fit time measured by whoever ran the model, if known
    fn reported_fit_seconds(&self) -> Option<f64> {
        None
    }
}

/// Orientation of a topic dictionary as a back end emits it
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryLayout {
    /// m x K, topics in columns
    #[default]
    FeatureByTopic,
    /// K x m, topics in rows
    TopicByFeature,
}

/// Canonical model output
#[derive(Clone, Debug)]
pub struct TopicFit {
    /// n x K
    pub loading: Mat,
    /// m x K, each column sums to one (all-zero columns stay zero)
    pub dictionary: Option<Mat>,
}

impl TopicFit {
    pub fn canonical(
        loading: Mat,
        dictionary: Option<Mat>,
        layout: DictionaryLayout,
    ) -> anyhow::Result<Self> {
        let dictionary = match dictionary {
            None => None,
            Some(dict) => {
                let mut dict_mk = match layout {
                    DictionaryLayout::FeatureByTopic => dict,
                    DictionaryLayout::TopicByFeature => dict.transpose(),
                };

                if dict_mk.ncols() != loading.ncols() {
                    return Err(anyhow::anyhow!(
                        "dictionary has {} topics, loading has {}",
                        dict_mk.ncols(),
                        loading.ncols()
                    ));
                }

                for mut col in dict_mk.column_iter_mut() {
                    let denom = col.sum();
                    if denom > 0.0 {
                        col /= denom;
                    }
                }
                Some(dict_mk)
            }
        };

        Ok(Self {
            loading,
            dictionary,
        })
    }
}

/// Output of an external fitter stored as tables on disk
#[derive(Clone, Debug)]
pub struct PrecomputedTopicModel {
    pub name: Box<str>,
    /// `cell  topic_1 ... topic_K`
    pub loading_file: Box<str>,
    /// features x topics or topics x features, with names
    pub dictionary_file: Option<Box<str>>,
    pub layout: DictionaryLayout,
    pub fit_seconds: Option<f64>,
}

impl TopicModel for PrecomputedTopicModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&self, input: &TopicModelInput) -> anyhow::Result<TopicFit> {
        let scope = input.scope;

        info!("[{}] reading loadings: {}", self.name, self.loading_file);
        let named = Mat::from_tsv_named(&self.loading_file)?;

        if named.mat.ncols() != input.n_topics {
            return Err(anyhow::anyhow!(
                "{} has {} topic columns, expected K = {}",
                self.loading_file,
                named.mat.ncols(),
                input.n_topics
            ));
        }

        let loading = align_rows(&named.rows, &named.mat, scope.cells(), &self.loading_file)?;

        let dictionary = match &self.dictionary_file {
            Some(file) => {
                info!("[{}] reading dictionary: {}", self.name, file);
                let named = Mat::from_tsv_named(file)?;
                let dict = match self.layout {
                    DictionaryLayout::FeatureByTopic => {
                        align_rows(&named.rows, &named.mat, scope.feature_names(), file)?
                    }
                    DictionaryLayout::TopicByFeature => align_rows(
                        &named.cols,
                        &named.mat.transpose(),
                        scope.feature_names(),
                        file,
                    )?
                    .transpose(),
                };
                Some(dict)
            }
            None => None,
        };

        TopicFit::canonical(loading, dictionary, self.layout)
    }

    fn reported_fit_seconds(&self) -> Option<f64> {
        self.fit_seconds
    }
}

/// Re-order (and subset) named rows to follow `target`.
/// Every target name must be present, and no name may repeat.
fn align_rows(
    names: &[Box<str>],
    mat: &Mat,
    target: &[Box<str>],
    file: &str,
) -> anyhow::Result<Mat> {
    let mut position: HashMap<&str, usize> = HashMap::default();
    for (i, name) in names.iter().enumerate() {
        if position.insert(name.as_ref(), i).is_some() {
            return Err(anyhow::anyhow!("'{}' appears more than once in {}", name, file));
        }
    }

    let rows = target
        .iter()
        .map(|name| {
            position
                .get(name.as_ref())
                .copied()
                .ok_or_else(|| anyhow::anyhow!("'{}' not found in {}", name, file))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if rows.len() < names.len() {
        debug!(
            "{}: kept {} of {} rows for the current scope",
            file,
            rows.len(),
            names.len()
        );
    }

    Ok(select_rows(mat, &rows))
}

/// One entry of a model manifest
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub loading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<String>,
    #[serde(default)]
    pub dictionary_layout: DictionaryLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_seconds: Option<f64>,
}

/// JSON list of precomputed model outputs
///
/// ```json
/// {"models": [{"name": "splsi", "loading": "splsi.loading.tsv.gz",
///              "dictionary": "splsi.dict.tsv.gz",
///              "dictionary_layout": "topic_by_feature", "fit_seconds": 12.5}]}
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelManifest {
    pub models: Vec<ModelEntry>,
}

impl ModelManifest {
    pub fn from_json_file(file: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(file)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", file, e))?;
        let manifest: ModelManifest = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", file, e))?;

        if manifest.models.is_empty() {
            return Err(anyhow::anyhow!("no models listed in {}", file));
        }

        let mut names = manifest.models.iter().map(|m| &m.name).collect::<Vec<_>>();
        names.sort();
        names.dedup();
        if names.len() != manifest.models.len() {
            return Err(anyhow::anyhow!("duplicate model names in {}", file));
        }

        Ok(manifest)
    }

    pub fn to_json_file(&self, file: &str) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(file, text)?;
        Ok(())
    }

    /// Back ends for every entry; relative paths resolve against `base_dir`
    pub fn precomputed_models(&self, base_dir: Option<&Path>) -> Vec<PrecomputedTopicModel> {
        let resolve = |file: &str| -> Box<str> {
            match base_dir {
                Some(dir) if Path::new(file).is_relative() => {
                    dir.join(file).to_string_lossy().into()
                }
                _ => file.into(),
            }
        };

        self.models
            .iter()
            .map(|m| PrecomputedTopicModel {
                name: m.name.as_str().into(),
                loading_file: resolve(&m.loading),
                dictionary_file: m.dictionary.as_deref().map(resolve),
                layout: m.dictionary_layout,
                fit_seconds: m.fit_seconds,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn both_layouts_give_the_same_dictionary() {
        let loading = Mat::from_element(3, 2, 0.5);
        let dict_mk = Mat::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 2.0, 2.0, 2.0]);

        let a = TopicFit::canonical(
            loading.clone(),
            Some(dict_mk.clone()),
            DictionaryLayout::FeatureByTopic,
        )
        .unwrap();
        let b = TopicFit::canonical(
            loading,
            Some(dict_mk.transpose()),
            DictionaryLayout::TopicByFeature,
        )
        .unwrap();

        let da = a.dictionary.unwrap();
        let db = b.dictionary.unwrap();
        assert_abs_diff_eq!(da, db, epsilon = 1e-6);
        assert_abs_diff_eq!(da.column(0).sum(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(da[(2, 1)], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn topic_count_mismatch_is_an_error() {
        let loading = Mat::zeros(3, 2);
        let dict = Mat::zeros(4, 3);
        assert!(TopicFit::canonical(loading, Some(dict), DictionaryLayout::FeatureByTopic).is_err());
    }

    #[test]
    fn align_rows_follows_target_order() {
        let names: Vec<Box<str>> = vec!["a".into(), "b".into(), "c".into()];
        let mat = Mat::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let target: Vec<Box<str>> = vec!["c".into(), "a".into()];
        let out = align_rows(&names, &mat, &target, "test").unwrap();
        assert_eq!(out.as_slice(), &[3.0, 1.0]);

        let missing: Vec<Box<str>> = vec!["d".into()];
        assert!(align_rows(&names, &mat, &missing, "test").is_err());

        let repeated: Vec<Box<str>> = vec!["a".into(), "b".into(), "a".into()];
        assert!(align_rows(&repeated, &mat, &target, "test").is_err());
    }

    #[test]
    fn manifest_defaults() {
        let manifest: ModelManifest =
            serde_json::from_str(r#"{"models": [{"name": "m", "loading": "w.tsv"}]}"#).unwrap();
        let models = manifest.precomputed_models(Some(Path::new("/data")));
        assert_eq!(models[0].layout, DictionaryLayout::FeatureByTopic);
        assert_eq!(models[0].loading_file.as_ref(), "/data/w.tsv");
        assert!(models[0].dictionary_file.is_none());
        assert!(models[0].fit_seconds.is_none());
    }
}
