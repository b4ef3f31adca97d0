pub mod alpha_mask;
pub mod background;
pub mod classifier;
pub mod cleanup;
pub mod color;
pub mod editor;
pub mod edges;
pub mod morphology;
pub mod optimizers;
pub mod pipeline;
pub mod safety_net;
pub mod segment;
