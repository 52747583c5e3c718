//! ONNX-backed frame and spectrogram classifiers.
//!
//! Inference runs with automatic execution provider selection:
//! - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms
//!
//! Sessions are wrapped in a `Mutex` because `Session::run` takes `&mut self`;
//! callers bound concurrency above this layer.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Scores a single video frame for manipulation likelihood.
pub trait ImageClassifier: Send + Sync {
    /// Probability in [0, 1] that the frame is manipulated.
    fn score_image(&self, image: &DynamicImage) -> MediaResult<f32>;
}

/// Scores an MFCC matrix for synthetic-speech likelihood.
pub trait SpectrogramClassifier: Send + Sync {
    /// Probability in [0, 1] that the audio is synthetic.
    fn score_spectrogram(&self, features: &Array2<f32>) -> MediaResult<f32>;
}

/// Configuration for the visual frame classifier.
#[derive(Debug, Clone)]
pub struct ImageClassifierConfig {
    /// Path to ONNX model file
    pub model_path: String,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for ImageClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: "models/deepfake_visual.onnx".to_string(),
            input_size: 224,
        }
    }
}

/// ImageNet channel statistics the visual backbone was trained with.
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Visual deepfake classifier backed by an ONNX model.
#[derive(Debug)]
pub struct OnnxImageClassifier {
    session: Mutex<Session>,
    output_name: String,
    config: ImageClassifierConfig,
}

impl OnnxImageClassifier {
    /// Load the model and prepare a session.
    ///
    /// Returns an error if the model file doesn't exist or cannot be loaded.
    pub fn new(config: ImageClassifierConfig) -> MediaResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let session = create_session(model_path)?;
        let output_name = first_output_name(&session)?;
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Visual classifier initialized"
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            config,
        })
    }

    pub fn config(&self) -> &ImageClassifierConfig {
        &self.config
    }
}

impl ImageClassifier for OnnxImageClassifier {
    fn score_image(&self, image: &DynamicImage) -> MediaResult<f32> {
        let size = self.config.input_size;
        let data = image_to_nchw(image, size);

        let shape = vec![1usize, 3, size as usize, size as usize];
        let input = Tensor::from_array((shape, data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::inference(format!("Failed to create tensor: {e}")))?;

        let output = run_session(&self.session, &self.output_name, input)?;
        probability_from_output(&output)
    }
}

/// Audio deepfake classifier backed by an ONNX model over MFCC features.
pub struct OnnxSpectrogramClassifier {
    session: Mutex<Session>,
    output_name: String,
    model_path: String,
}

impl OnnxSpectrogramClassifier {
    /// Load the model and prepare a session.
    pub fn new(model_path: impl Into<String>) -> MediaResult<Self> {
        let model_path = model_path.into();
        let path = Path::new(&model_path);
        if !path.exists() {
            return Err(MediaError::model_not_found(&model_path));
        }

        let session = create_session(path)?;
        let output_name = first_output_name(&session)?;
        info!(model_path = %model_path, "Audio classifier initialized");

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            model_path,
        })
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }
}

impl SpectrogramClassifier for OnnxSpectrogramClassifier {
    fn score_spectrogram(&self, features: &Array2<f32>) -> MediaResult<f32> {
        let (rows, cols) = features.dim();

        // NCHW with a single channel: [1, 1, n_mfcc, frames].
        let data: Vec<f32> = features.iter().copied().collect();
        let shape = vec![1usize, 1, rows, cols];
        let input = Tensor::from_array((shape, data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::inference(format!("Failed to create tensor: {e}")))?;

        let output = run_session(&self.session, &self.output_name, input)?;
        probability_from_output(&output)
    }
}

/// Resize and normalize an image into NCHW `[1, 3, size, size]` data with
/// ImageNet channel statistics.
fn image_to_nchw(image: &DynamicImage, size: u32) -> Vec<f32> {
    let resized = image.resize_exact(size, size, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let (w, h) = (size as usize, size as usize);

    let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);

    // HWC -> CHW, scaled to [0, 1] then standardized per channel
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                let value = pixel[c] as f32 / 255.0;
                chw_data.push((value - IMAGENET_MEAN[c]) / IMAGENET_STD[c]);
            }
        }
    }

    chw_data
}

/// Run inference and collect the flattened output tensor.
fn run_session(
    session: &Mutex<Session>,
    output_name: &str,
    input: Value,
) -> MediaResult<Vec<f32>> {
    let mut session = session
        .lock()
        .map_err(|_| MediaError::internal("Session lock poisoned"))?;

    let outputs = session
        .run(ort::inputs![input])
        .map_err(|e| MediaError::inference(format!("ONNX inference failed: {e}")))?;

    let output = outputs
        .get(output_name)
        .ok_or_else(|| MediaError::inference(format!("Missing output tensor '{output_name}'")))?;

    let tensor = output
        .try_extract_tensor::<f32>()
        .map_err(|e| MediaError::inference(format!("Failed to extract tensor: {e}")))?;

    Ok(tensor.1.to_vec())
}

/// Interpret a model output as a fake probability.
///
/// Supports the two head shapes these detectors ship with: a single raw
/// logit (sigmoid applied here) and a two-class `[real, fake]` logit pair.
fn probability_from_output(values: &[f32]) -> MediaResult<f32> {
    match values.len() {
        1 => Ok(sigmoid(values[0])),
        2 => Ok(softmax2(values[0], values[1])),
        n => Err(MediaError::inference(format!(
            "Unexpected classifier output size: {n}"
        ))),
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Softmax probability of the second (fake) class.
fn softmax2(real: f32, fake: f32) -> f32 {
    let max = real.max(fake);
    let e_real = (real - max).exp();
    let e_fake = (fake - max).exp();
    e_fake / (e_real + e_fake)
}

/// Name of the model's first output tensor.
fn first_output_name(session: &Session) -> MediaResult<String> {
    session
        .outputs
        .first()
        .map(|o| o.name.clone())
        .ok_or_else(|| MediaError::inference("Model has no outputs"))
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::internal(format!("Failed to read model file: {e}")))?;

    let builder = Session::builder()
        .map_err(|e| MediaError::internal(format!("Failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("Failed to set optimization level: {e}")))?;

    // Try CUDA on Linux with cuda feature
    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    // Try CoreML on macOS
    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    debug!("Using CPU execution provider");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("Failed to load ONNX model: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_sigmoid_on_logit() {
        let p = probability_from_output(&[0.0]).unwrap();
        assert!((p - 0.5).abs() < 1e-6);

        let p = probability_from_output(&[4.0]).unwrap();
        assert!(p > 0.9 && p < 1.0);

        let p = probability_from_output(&[-4.0]).unwrap();
        assert!(p > 0.0 && p < 0.1);
    }

    #[test]
    fn test_probability_two_class_softmax() {
        // Strong fake logit dominates.
        let p = probability_from_output(&[-2.0, 2.0]).unwrap();
        assert!(p > 0.9);

        // Symmetric logits give 0.5.
        let p = probability_from_output(&[1.0, 1.0]).unwrap();
        assert!((p - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_probability_rejects_unknown_shapes() {
        assert!(probability_from_output(&[]).is_err());
        assert!(probability_from_output(&[0.1, 0.2, 0.7]).is_err());
    }

    #[test]
    fn test_image_to_nchw_layout() {
        // A black image standardizes each channel to -mean/std.
        let img = DynamicImage::new_rgb8(64, 48);
        let data = image_to_nchw(&img, 32);
        assert_eq!(data.len(), 3 * 32 * 32);

        let expected_r = -IMAGENET_MEAN[0] / IMAGENET_STD[0];
        assert!((data[0] - expected_r).abs() < 1e-6);
        let expected_b = -IMAGENET_MEAN[2] / IMAGENET_STD[2];
        assert!((data[2 * 32 * 32] - expected_b).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model_file() {
        let config = ImageClassifierConfig {
            model_path: "/nonexistent/model.onnx".to_string(),
            input_size: 224,
        };
        let err = OnnxImageClassifier::new(config).unwrap_err();
        assert!(matches!(err, MediaError::ModelNotFound(_)));
    }

    #[test]
    fn test_config_default() {
        let config = ImageClassifierConfig::default();
        assert_eq!(config.input_size, 224);
    }
}
