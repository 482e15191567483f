//! Assembly of the sparse stiffness operator
use crate::layout::{Layout, NodeLayout};
use sprs::{CsMat, TriMat};

/// Graph laplacian of the layout with edge weights `stiffness / d^2`.
///
/// Symmetric and positive semi-definite, rows sum to zero.
pub fn assemble_stiffness(layout: &Layout, stiffness: f64) -> CsMat<f64> {
    let n = layout.num_nodes();
    let mut tri = TriMat::new((n, n));
    for p in 0..n {
        let mut diag = 0.;
        for (q, dist) in layout.neighbours(p) {
            let w = stiffness / (dist * dist);
            tri.add_triplet(p, q, -w);
            diag += w;
        }
        tri.add_triplet(p, p, diag);
    }
    tri.to_csr()
}

/// Gershgorin bound of the largest eigenvalue, max_i sum_j |a_ij|
pub fn gershgorin_bound(mat: &CsMat<f64>) -> f64 {
    mat.outer_iterator()
        .map(|row| row.iter().map(|(_, v)| v.abs()).sum::<f64>())
        .fold(0., f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{GridLayout, TreeLayout};

    #[test]
    fn test_laplacian_grid() {
        let layout: Layout = GridLayout::new([3, 1, 1]).unwrap().into();
        let k = assemble_stiffness(&layout, 0.5);
        // spacing 1/2 -> weight 0.5 * 4 = 2
        let dense = k.to_dense();
        assert_eq!(dense.row(0).to_vec(), vec![2., -2., 0.]);
        assert_eq!(dense.row(1).to_vec(), vec![-2., 4., -2.]);
        assert_eq!(dense.row(2).to_vec(), vec![0., -2., 2.]);
        assert!((gershgorin_bound(&k) - 8.).abs() < 1e-14);
    }

    #[test]
    fn test_symmetric_zero_row_sum() {
        let layouts: Vec<Layout> = vec![
            GridLayout::new([3, 4, 2]).unwrap().into(),
            TreeLayout::uniform(1, 3).unwrap().into(),
        ];
        for layout in layouts.iter() {
            let dense = assemble_stiffness(layout, 0.1).to_dense();
            for i in 0..dense.nrows() {
                assert!(dense.row(i).sum().abs() < 1e-12);
                for j in 0..dense.ncols() {
                    assert!((dense[[i, j]] - dense[[j, i]]).abs() < 1e-14);
                }
            }
        }
    }
}
