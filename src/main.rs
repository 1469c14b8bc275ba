//! pipeflow - headless demo driver
//!
//! Builds a small graph, edits a few inputs and logs how the changes
//! propagate. Pass an image path to also run it through the image nodes.

use anyhow::Context;
use pipeflow::{
    config::EngineConfig,
    logging,
    pipeline::{
        nodes::{ImageEffect, ImageSourceNode},
        Graph, GraphEvent, NodeKind, PortId,
    },
    NodeFactory,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = EngineConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    let _guard = logging::init(&config.logging)?;
    if let Err(e) = &loaded {
        tracing::warn!("Failed to load config, using defaults: {}", e);
    }

    tracing::info!("Starting pipeflow demo");

    let mut graph = Graph::new();
    let events = graph.subscribe(config.events.capacity);
    let factory = NodeFactory::new(&config.scripting);

    let add = graph.add_boxed_node(factory.create(NodeKind::Add)).await?;
    graph.set_value(PortId::inlet(add, 0), 3.0, false, None).await?;
    graph.set_value(PortId::inlet(add, 1), 4.0, true, None).await?;
    tracing::info!("3 + 4 = {:?}", graph.value(PortId::outlet(add, 0)));

    let expr = graph
        .add_boxed_node(factory.create_expression("x * x - y"))
        .await?;
    graph
        .connect(PortId::outlet(add, 0), PortId::inlet(expr, 0))
        .await?;
    graph.set_value(PortId::inlet(expr, 1), 1.0, true, None).await?;

    graph.set_value(PortId::inlet(add, 0), 10.0, true, None).await?;
    tracing::info!(
        "10 + 4 = {:?}, squared minus one = {:?}",
        graph.value(PortId::outlet(add, 0)),
        graph.value(PortId::outlet(expr, 0))
    );

    if let Some(path) = std::env::args().nth(1) {
        let image = ImageSourceNode::decode_file(&path)
            .await
            .with_context(|| format!("Failed to load {}", path))?;
        let source = graph.add_node(ImageSourceNode::with_image(image)).await?;
        let invert = graph
            .add_boxed_node(factory.create(NodeKind::Effect(ImageEffect::Invert)))
            .await?;
        let info = graph
            .add_boxed_node(factory.create(NodeKind::ImageInfo))
            .await?;
        graph
            .connect(PortId::outlet(source, 0), PortId::inlet(invert, 0))
            .await?;
        graph
            .connect(PortId::outlet(invert, 0), PortId::inlet(info, 0))
            .await?;
        tracing::info!(
            "{}: {:?} x {:?}",
            path,
            graph.value(PortId::outlet(info, 0)),
            graph.value(PortId::outlet(info, 1))
        );
    }

    for event in events.try_iter() {
        match event {
            GraphEvent::NodeFailed { node, error } => {
                tracing::warn!("{} failed: {}", node, error)
            }
            GraphEvent::PortRefreshed { .. } => {}
            other => tracing::debug!("{:?}", other),
        }
    }

    let topology = graph.topology();
    for node in &topology.nodes {
        tracing::info!(
            "{} {} ({} in, {} out)",
            node.id,
            node.name,
            node.inlets.len(),
            node.outlets.len()
        );
    }
    tracing::info!(
        "{} links, {:?}",
        topology.links.len(),
        graph.stats()
    );

    Ok(())
}
