use std::path::Path;

use anyhow::Result;
use gridgeo_algo::build_neighbor_graph;
use gridgeo_core::{Diagnostics, TopologyProvider};

use crate::commands::{parse_countries, AppContext};

pub fn handle(ctx: &AppContext, network: Option<&Path>, countries: &[String]) -> Result<()> {
    let network = ctx.network(network)?;
    let countries = parse_countries(countries)?;
    let scope = network.substations(&countries);

    let mut diagnostics = Diagnostics::new();
    let graph = build_neighbor_graph(&network, &scope, &mut diagnostics);
    let stats = graph.stats();

    println!("Neighbor graph:");
    println!("  Substations   : {}", stats.substation_count);
    println!("  Edges         : {}", stats.edge_count);
    println!("  Components    : {}", stats.components);
    println!("  Isolated      : {}", stats.isolated_count);
    println!(
        "  Degree [avg/max]: {:.2}/{}",
        stats.avg_degree, stats.max_degree
    );
    if diagnostics.has_issues() {
        print!("{diagnostics}");
    }
    Ok(())
}
