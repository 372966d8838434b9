pub type Mat = nalgebra::DMatrix<f32>;

pub use fnv::FnvHashMap as HashMap;
pub use log::{debug, info, warn};

pub use matrix_util::dmatrix_util::{column_ranges, select_rows};
pub use matrix_util::traits::*;
