//! Self-organizing map smoothing: the grid vertices act as map nodes whose
//! heights are pulled toward nearby samples with a shrinking learning rate.

use crate::grid::Grid;
use crate::interpolate::SurfaceSample;
use crate::Dimensions;
use log::{debug, warn};

/// Learning rate of epoch `t` (counting from 0)
pub fn learning_rate(epoch: usize) -> f64 {
    4.0 / (epoch as f64 + 4.0)
}

/// Train a height grid on `samples`. Nodes start at the mean sample height,
/// each sample pulls the nodes within `radius` cells of it, weighted by a
/// linear falloff. Samples are presented in input order every epoch.
pub fn som_smooth(
    samples: &[SurfaceSample],
    dims: &Dimensions,
    epochs: usize,
    radius: f64,
) -> Grid<f64> {
    let (x_cells, z_cells) = (dims.x_cells(), dims.z_cells());
    let samples: Vec<&SurfaceSample> = samples.iter().filter(|s| s.height.is_finite()).collect();
    if samples.is_empty() {
        warn!("surface has no samples; using a flat surface");
        return Grid::new(x_cells, z_cells, 0.0);
    }

    let mean = samples.iter().map(|s| s.height).sum::<f64>() / samples.len() as f64;
    let mut nodes = Grid::new(x_cells, z_cells, mean);
    let radius = radius.max(1.0);
    let reach = radius.ceil() as isize;

    for epoch in 0..epochs {
        let rate = learning_rate(epoch);
        for s in &samples {
            let cx = s.x * dims.x_res as f64;
            let cz = s.z * dims.z_res as f64;
            let (ni, nk) = (cx.round() as isize, cz.round() as isize);

            for i in (ni - reach).max(0)..=(ni + reach).min(x_cells as isize - 1) {
                for k in (nk - reach).max(0)..=(nk + reach).min(z_cells as isize - 1) {
                    let d = ((i as f64 - cx).powi(2) + (k as f64 - cz).powi(2)).sqrt();
                    let influence = 1.0 - d / radius;
                    if influence <= 0.0 {
                        continue;
                    }
                    let node = &mut nodes[(i as usize, k as usize)];
                    *node += rate * influence * (s.height - *node);
                }
            }
        }
    }

    debug!(
        "trained {}x{} map for {} epochs on {} samples",
        x_cells,
        z_cells,
        epochs,
        samples.len()
    );
    nodes
}
