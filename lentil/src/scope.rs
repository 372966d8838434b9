//! The active set of cells and everything derived from it.
//!
//! A [`Scope`] owns the mapping between cell keys and dense row
//! positions. Coordinates, edges, the adjacency graph and the count
//! matrix are all stored in that one ordering, and external matrices
//! are re-aligned through [`Scope::index_of`].

use crate::common::*;
use crate::coordinates::{normalize_coordinates, CoordinateScaling};
use crate::edge_weight::{coordinate_distances, exp_kernel_weights, DistanceSource};
use crate::features::{normalize_features, FeatureMatrix};
use crate::input::SampleTables;
use crate::spatial_graph::{SpatialGraph, WeightedEdge};

/// How a sample is turned into a weighted scope
#[derive(Clone, Debug)]
pub struct ScopeArgs {
    /// exponential kernel bandwidth φ
    pub phi: f32,
    pub scaling: CoordinateScaling,
    pub distance_source: DistanceSource,
}

/// Axis-aligned rectangle in normalized coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rectangle {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for Rectangle {
    fn default() -> Self {
        Self::unit()
    }
}

impl Rectangle {
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// `[0, 1] x [0, 1]`
    pub fn unit() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let bounds = [self.min_x, self.max_x, self.min_y, self.max_y];
        if bounds.iter().any(|b| b.is_nan()) {
            return Err(anyhow::anyhow!("rectangle bounds must not be NaN"));
        }
        if self.min_x > self.max_x {
            return Err(anyhow::anyhow!(
                "min_x {} > max_x {}",
                self.min_x,
                self.max_x
            ));
        }
        if self.min_y > self.max_y {
            return Err(anyhow::anyhow!(
                "min_y {} > max_y {}",
                self.min_y,
                self.max_y
            ));
        }
        Ok(())
    }

    /// Whether every normalized coordinate falls inside
    pub fn covers_unit_square(&self) -> bool {
        self.min_x <= 0.0 && self.min_y <= 0.0 && self.max_x >= 1.0 && self.max_y >= 1.0
    }

    /// Strictly inside all four bounds
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.min_x && x < self.max_x && y > self.min_y && y < self.max_y
    }
}

#[derive(Clone, Debug)]
pub struct Scope {
    sample: Box<str>,
    cells: Vec<Box<str>>,
    /// position of each cell in the full sample
    parent_index: Vec<usize>,
    index: HashMap<Box<str>, usize>,
    /// n x 2 normalized coordinates
    coordinates: Mat,
    edges: Vec<WeightedEdge>,
    graph: SpatialGraph,
    /// n x m raw counts
    counts: Mat,
    feature_names: Vec<Box<str>>,
}

impl Scope {
    /// Build the full-sample scope: normalize coordinates, weight
    /// edges, and construct the adjacency graph.
    ///
    /// * `tables` - raw tables of one sample
    /// * `args` - bandwidth, scaling and distance policy
    pub fn from_sample(tables: &SampleTables, args: &ScopeArgs) -> anyhow::Result<Scope> {
        let coordinates = normalize_coordinates(&tables.coordinates, args.scaling)?;

        let distances = match args.distance_source {
            DistanceSource::Recorded => tables.edges.iter().map(|e| e.distance).collect(),
            DistanceSource::Coordinates => {
                let pairs = tables
                    .edges
                    .iter()
                    .map(|e| (e.src, e.tgt))
                    .collect::<Vec<_>>();
                coordinate_distances(&pairs, &coordinates)?
            }
        };

        let weights = exp_kernel_weights(&distances, args.phi)?;

        let edges = tables
            .edges
            .iter()
            .zip(distances.into_iter().zip(weights))
            .map(|(e, (distance, weight))| WeightedEdge {
                src: e.src,
                tgt: e.tgt,
                distance,
                weight,
            })
            .collect::<Vec<_>>();

        info!(
            "weighted {} edges with φ = {} ({:?} distances)",
            edges.len(),
            args.phi,
            args.distance_source
        );

        Self::assemble(
            tables.sample.clone(),
            tables.cells.clone(),
            (0..tables.num_cells()).collect(),
            coordinates,
            edges,
            tables.counts.clone(),
            tables.feature_names.clone(),
        )
    }

    fn assemble(
        sample: Box<str>,
        cells: Vec<Box<str>>,
        parent_index: Vec<usize>,
        coordinates: Mat,
        edges: Vec<WeightedEdge>,
        counts: Mat,
        feature_names: Vec<Box<str>>,
    ) -> anyhow::Result<Scope> {
        let nn = cells.len();

        if parent_index.len() != nn || coordinates.nrows() != nn || counts.nrows() != nn {
            return Err(anyhow::anyhow!(
                "scope shape mismatch: {} cells, {} parent indices, {} coordinates, {} count rows",
                nn,
                parent_index.len(),
                coordinates.nrows(),
                counts.nrows()
            ));
        }

        let mut index: HashMap<Box<str>, usize> = HashMap::default();
        for (i, c) in cells.iter().enumerate() {
            if index.insert(c.clone(), i).is_some() {
                return Err(anyhow::anyhow!("duplicate cell key '{}'", c));
            }
        }

        let graph = SpatialGraph::from_edges(&edges, nn)?;

        Ok(Scope {
            sample,
            cells,
            parent_index,
            index,
            coordinates,
            edges,
            graph,
            counts,
            feature_names,
        })
    }

    /// Restrict to cells strictly inside `region`, re-indexed densely
    /// in their original relative order. Edges survive only when both
    /// endpoints do. A region covering the unit square returns the
    /// scope unchanged; an empty result is valid.
    pub fn subset(&self, region: &Rectangle) -> anyhow::Result<Scope> {
        region.validate()?;

        if region.covers_unit_square() {
            info!("region covers the unit square; keeping all {} cells", self.num_cells());
            return Ok(self.clone());
        }

        let keep: Vec<usize> = (0..self.num_cells())
            .filter(|&i| region.contains(self.coordinates[(i, 0)], self.coordinates[(i, 1)]))
            .collect();

        let mut new_index: Vec<Option<usize>> = vec![None; self.num_cells()];
        for (new, &old) in keep.iter().enumerate() {
            new_index[old] = Some(new);
        }

        let edges = self
            .edges
            .iter()
            .filter_map(|e| match (new_index[e.src], new_index[e.tgt]) {
                (Some(src), Some(tgt)) => Some(WeightedEdge {
                    src,
                    tgt,
                    distance: e.distance,
                    weight: e.weight,
                }),
                _ => None,
            })
            .collect::<Vec<_>>();

        info!(
            "subsetting cells: {} of {} cells, {} of {} edges inside {:?}",
            keep.len(),
            self.num_cells(),
            edges.len(),
            self.edges.len(),
            region
        );

        if keep.is_empty() {
            warn!("no cell falls inside the requested region");
        }

        Self::assemble(
            self.sample.clone(),
            keep.iter().map(|&i| self.cells[i].clone()).collect(),
            keep.iter().map(|&i| self.parent_index[i]).collect(),
            select_rows(&self.coordinates, &keep),
            edges,
            select_rows(&self.counts, &keep),
            self.feature_names.clone(),
        )
    }

    /// Row-normalized features for this scope
    pub fn normalized_features(&self) -> FeatureMatrix {
        normalize_features(&self.counts)
    }

    /// Dense position of a cell key
    pub fn index_of(&self, cell: &str) -> Option<usize> {
        self.index.get(cell).copied()
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn cells(&self) -> &[Box<str>] {
        &self.cells
    }

    pub fn parent_index(&self) -> &[usize] {
        &self.parent_index
    }

    pub fn coordinates(&self) -> &Mat {
        &self.coordinates
    }

    pub fn edges(&self) -> &[WeightedEdge] {
        &self.edges
    }

    pub fn graph(&self) -> &SpatialGraph {
        &self.graph
    }

    pub fn counts(&self) -> &Mat {
        &self.counts
    }

    pub fn feature_names(&self) -> &[Box<str>] {
        &self.feature_names
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::RawEdge;

    /// 3 x 3 lattice, 4-neighbour edges in both directions
    fn lattice() -> SampleTables {
        let mut cells = vec![];
        let mut xy = vec![];
        for r in 0..3 {
            for c in 0..3 {
                cells.push(format!("c{}", r * 3 + c).into_boxed_str());
                xy.extend([c as f32, r as f32]);
            }
        }
        let mut edges = vec![];
        for r in 0..3 {
            for c in 0..3 {
                let i = r * 3 + c;
                if c + 1 < 3 {
                    edges.push(RawEdge { src: i, tgt: i + 1, distance: 1.0 });
                    edges.push(RawEdge { src: i + 1, tgt: i, distance: 1.0 });
                }
                if r + 1 < 3 {
                    edges.push(RawEdge { src: i, tgt: i + 3, distance: 1.0 });
                    edges.push(RawEdge { src: i + 3, tgt: i, distance: 1.0 });
                }
            }
        }
        let counts = Mat::from_fn(9, 2, |i, j| (i + j) as f32);
        SampleTables::new(
            "s1".into(),
            cells,
            Mat::from_row_slice(9, 2, &xy),
            edges,
            counts,
            vec!["f0".into(), "f1".into()],
        )
        .unwrap()
    }

    fn args() -> ScopeArgs {
        ScopeArgs {
            phi: 1.0,
            scaling: CoordinateScaling::PerAxis,
            distance_source: DistanceSource::Recorded,
        }
    }

    #[test]
    fn full_scope_structures() {
        let scope = Scope::from_sample(&lattice(), &args()).unwrap();
        assert_eq!(scope.num_cells(), 9);
        assert_eq!(scope.edges().len(), 24);
        assert_eq!(scope.graph().nnz(), 24);
        assert_eq!(scope.index_of("c4"), Some(4));
        assert_eq!(scope.coordinates()[(8, 0)], 1.0);
        let w = (-1.0f32).exp();
        assert!(scope.edges().iter().all(|e| (e.weight - w).abs() < 1e-6));
    }

    #[test]
    fn unit_region_is_a_no_op() {
        let scope = Scope::from_sample(&lattice(), &args()).unwrap();
        let sub = scope.subset(&Rectangle::unit()).unwrap();
        assert_eq!(sub.num_cells(), scope.num_cells());
        assert_eq!(sub.edges(), scope.edges());
        assert_eq!(sub.graph().nnz(), scope.graph().nnz());

        let wide = scope.subset(&Rectangle::new(-0.5, 1.5, -0.5, 1.5)).unwrap();
        assert_eq!(wide.num_cells(), 9);
        assert_eq!(wide.graph().nnz(), 24);
    }

    #[test]
    fn subset_reindexes_cells_and_edges() {
        let scope = Scope::from_sample(&lattice(), &args()).unwrap();
        // keep the two right columns of the top two rows: c1, c2, c4, c5
        let sub = scope.subset(&Rectangle::new(0.25, 1.1, -0.1, 0.75)).unwrap();

        let names: Vec<&str> = sub.cells().iter().map(|c| c.as_ref()).collect();
        assert_eq!(names, vec!["c1", "c2", "c4", "c5"]);
        assert_eq!(sub.parent_index(), &[1, 2, 4, 5]);
        assert_eq!(sub.index_of("c4"), Some(2));
        assert_eq!(sub.index_of("c0"), None);

        // a 2 x 2 block has 4 undirected = 8 directed edges
        assert_eq!(sub.edges().len(), 8);
        assert_eq!(sub.graph().num_nodes(), 4);
        assert!(sub.edges().iter().all(|e| e.src < 4 && e.tgt < 4));
        assert_eq!(sub.counts().row(2), scope.counts().row(4));
    }

    #[test]
    fn empty_region_gives_empty_scope() {
        let scope = Scope::from_sample(&lattice(), &args()).unwrap();
        let sub = scope.subset(&Rectangle::new(0.1, 0.2, 0.1, 0.2)).unwrap();
        assert!(sub.is_empty());
        assert!(sub.edges().is_empty());
        assert_eq!(sub.graph().num_nodes(), 0);
        assert_eq!(sub.normalized_features().num_rows(), 0);
    }

    #[test]
    fn malformed_region_is_rejected() {
        let scope = Scope::from_sample(&lattice(), &args()).unwrap();
        assert!(scope.subset(&Rectangle::new(0.6, 0.4, 0.0, 1.0)).is_err());
        assert!(scope.subset(&Rectangle::new(0.0, 1.0, 0.9, 0.1)).is_err());
    }
}
