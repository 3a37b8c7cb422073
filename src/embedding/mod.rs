// Text embedding — pretrained sentence embeddings behind a swappable trait.
//
// The TextEmbedder trait is all the trainer and predictor see. The default
// implementation runs all-MiniLM-L6-v2 locally through ONNX Runtime.

pub mod download;
pub mod onnx;
pub mod traits;
