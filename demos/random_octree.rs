//! Build an octree over random points and print a summary of each level.
use std::time::Instant;

use dp_octree::{
    octree::{Octree, OctreeOptions},
    tools::{generate_random_points, seeded_rng},
};

pub fn main() -> dp_octree::Result<()> {
    env_logger::init();

    let npoints = 1_000_000;
    let depth = 8;

    let mut rng = seeded_rng(0);
    let points = generate_random_points(npoints, &mut rng);

    let start = Instant::now();
    let octree = Octree::with_options(&points, &OctreeOptions::new(depth).with_seed(1))?;
    let elapsed = start.elapsed();

    println!(
        "Built octree of depth {} for {} points in {} ms.",
        octree.depth(),
        octree.npoints(),
        elapsed.as_millis()
    );
    println!("Root box: {}", octree.root_box());

    for nodes in octree.levels() {
        println!(
            "Level {:>2}: {:>9} nodes, {:>9} occupied",
            nodes.level(),
            nodes.len(),
            nodes.noccupied()
        );
    }
    println!("Maximum number of points in a leaf: {}", octree.max_points_in_leaf());

    Ok(())
}
