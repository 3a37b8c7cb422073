// Medtag: multi-label topic classification for medical articles
//
// This is the library root. Each module corresponds to a stage of the
// train → evaluate → predict → retrain loop.

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod evaluation;
pub mod labels;
pub mod output;
pub mod predictor;
pub mod retrain;
pub mod status;
pub mod training;
